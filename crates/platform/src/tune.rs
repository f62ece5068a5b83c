//! Microarchitecture-derived tuning hints.
//!
//! [`Tune`] answers: "what should I *prefer* on this machine?" Unlike
//! [`crate::Caps`] (which describes what's *possible*), `Tune` describes
//! what's *optimal*: the SIMD threshold below which kernel setup costs
//! outweigh the win, and which per-microarchitecture dispatch table to use.

/// Identifies which microarchitecture tuning preset is in use.
///
/// This discriminant selects a dispatch table and enables O(1) `name()`
/// lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TuneKind {
  Custom = 0,
  Default,
  Portable,
  // x86_64
  Zen4,
  Zen5,
  IntelSpr,
  IntelIcl,
  // Apple Silicon
  AppleM1M3,
  // AWS Graviton / ARM Neoverse
  Graviton3,
  NeoverseN2,
}

impl TuneKind {
  /// Returns the human-readable name for this tuning preset.
  #[must_use]
  pub const fn name(self) -> &'static str {
    match self {
      Self::Custom => "Custom",
      Self::Default => "Default",
      Self::Portable => "Portable",
      Self::Zen4 => "Zen4",
      Self::Zen5 => "Zen5",
      Self::IntelSpr => "Intel SPR",
      Self::IntelIcl => "Intel ICL",
      Self::AppleM1M3 => "Apple M1-M3",
      Self::Graviton3 => "Graviton 3",
      Self::NeoverseN2 => "Neoverse N2",
    }
  }
}

/// Microarchitecture-derived tuning hints.
///
/// These hints guide kernel selection and threshold decisions. They are
/// derived from the detected CPU microarchitecture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tune {
  /// Which preset this tuning came from.
  pub kind: TuneKind,
  /// Minimum buffer size (bytes) where SIMD becomes faster than scalar.
  ///
  /// Below this threshold, scalar code is often faster due to SIMD setup
  /// overhead. AMD Zen 4/5 have very low vector warmup (~64 bytes is enough);
  /// Intel server cores pay a larger ZMM warmup latency.
  pub simd_threshold: usize,
}

impl Tune {
  /// Conservative defaults for unknown CPUs.
  pub const DEFAULT: Self = Self {
    kind: TuneKind::Default,
    simd_threshold: 256,
  };

  /// Scalar-only tuning (also used under Miri).
  pub const PORTABLE: Self = Self {
    kind: TuneKind::Portable,
    simd_threshold: usize::MAX,
  };

  /// Tuning for AMD Zen 4.
  pub const ZEN4: Self = Self {
    kind: TuneKind::Zen4,
    simd_threshold: 64,
  };

  /// Tuning for AMD Zen 5.
  pub const ZEN5: Self = Self {
    kind: TuneKind::Zen5,
    simd_threshold: 64,
  };

  /// Tuning for Intel Sapphire Rapids / Emerald Rapids / Granite Rapids.
  pub const INTEL_SPR: Self = Self {
    kind: TuneKind::IntelSpr,
    simd_threshold: 256,
  };

  /// Tuning for Intel Ice Lake.
  pub const INTEL_ICL: Self = Self {
    kind: TuneKind::IntelIcl,
    simd_threshold: 256,
  };

  /// Tuning for Apple M1 through M3.
  pub const APPLE_M1M3: Self = Self {
    kind: TuneKind::AppleM1M3,
    simd_threshold: 128,
  };

  /// Tuning for AWS Graviton 3.
  pub const GRAVITON3: Self = Self {
    kind: TuneKind::Graviton3,
    simd_threshold: 128,
  };

  /// Tuning for ARM Neoverse N2.
  pub const NEOVERSE_N2: Self = Self {
    kind: TuneKind::NeoverseN2,
    simd_threshold: 128,
  };
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn preset_names_are_distinct() {
    let kinds = [
      TuneKind::Custom,
      TuneKind::Default,
      TuneKind::Portable,
      TuneKind::Zen4,
      TuneKind::Zen5,
      TuneKind::IntelSpr,
      TuneKind::IntelIcl,
      TuneKind::AppleM1M3,
      TuneKind::Graviton3,
      TuneKind::NeoverseN2,
    ];
    for (i, a) in kinds.iter().enumerate() {
      for b in &kinds[i + 1..] {
        assert_ne!(a.name(), b.name());
      }
    }
  }

  #[test]
  fn portable_never_prefers_simd() {
    assert_eq!(Tune::PORTABLE.simd_threshold, usize::MAX);
  }
}
