//! Runtime CPU feature detection with process-wide caching.
//!
//! Detection runs once and is cached. Under Miri we always report
//! portable-only capabilities to avoid interpreting SIMD intrinsics. Without
//! `std`, detection falls back to compile-time target features.

use crate::{Caps, Tune};

#[cfg(feature = "std")]
static OVERRIDE: std::sync::OnceLock<(Caps, Tune)> = std::sync::OnceLock::new();

#[cfg(feature = "std")]
pub(crate) fn set_caps_override(value: (Caps, Tune)) {
  let _ = OVERRIDE.set(value);
}

#[inline]
pub(crate) fn get() -> (Caps, Tune) {
  #[cfg(feature = "std")]
  {
    static CACHED: std::sync::OnceLock<(Caps, Tune)> = std::sync::OnceLock::new();
    *CACHED.get_or_init(|| match OVERRIDE.get() {
      Some(&forced) => forced,
      None => detect(),
    })
  }

  #[cfg(not(feature = "std"))]
  {
    detect()
  }
}

fn detect() -> (Caps, Tune) {
  if cfg!(miri) {
    return (Caps::NONE, Tune::PORTABLE);
  }

  #[cfg(target_arch = "x86_64")]
  {
    detect_x86_64()
  }

  #[cfg(target_arch = "aarch64")]
  {
    detect_aarch64()
  }

  #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
  {
    (Caps::NONE, Tune::PORTABLE)
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// x86_64
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(target_arch = "x86_64")]
fn detect_x86_64() -> (Caps, Tune) {
  use crate::caps::x86;

  let mut caps = Caps::NONE;

  #[cfg(feature = "std")]
  {
    if std::arch::is_x86_feature_detected!("sse2") {
      caps |= x86::SSE2;
    }
    if std::arch::is_x86_feature_detected!("ssse3") {
      caps |= x86::SSSE3;
    }
    if std::arch::is_x86_feature_detected!("sse4.1") {
      caps |= x86::SSE41;
    }
    if std::arch::is_x86_feature_detected!("sse4.2") {
      caps |= x86::SSE42;
    }
    if std::arch::is_x86_feature_detected!("avx") {
      caps |= x86::AVX;
    }
    if std::arch::is_x86_feature_detected!("avx2") {
      caps |= x86::AVX2;
    }
    if std::arch::is_x86_feature_detected!("avx512f") {
      caps |= x86::AVX512F;
    }
    if std::arch::is_x86_feature_detected!("avx512vl") {
      caps |= x86::AVX512VL;
    }
    if std::arch::is_x86_feature_detected!("avx512bw") {
      caps |= x86::AVX512BW;
    }
    if std::arch::is_x86_feature_detected!("avx512dq") {
      caps |= x86::AVX512DQ;
    }
  }

  #[cfg(not(feature = "std"))]
  {
    // Compile-time baseline only: without std there is no safe runtime CPUID
    // caching story, so trust what the target guarantees.
    if cfg!(target_feature = "sse2") {
      caps |= x86::SSE2;
    }
    if cfg!(target_feature = "ssse3") {
      caps |= x86::SSSE3;
    }
    if cfg!(target_feature = "sse4.1") {
      caps |= x86::SSE41;
    }
    if cfg!(target_feature = "avx2") {
      caps |= x86::AVX2;
    }
    if cfg!(target_feature = "avx512f") {
      caps |= x86::AVX512F;
    }
    if cfg!(target_feature = "avx512vl") {
      caps |= x86::AVX512VL;
    }
    if cfg!(target_feature = "avx512bw") {
      caps |= x86::AVX512BW;
    }
    if cfg!(target_feature = "avx512dq") {
      caps |= x86::AVX512DQ;
    }
  }

  let tune = if caps.is_empty() { Tune::PORTABLE } else { tune_x86_64() };
  (caps, tune)
}

/// Pick a tuning preset from the CPUID vendor/family/model.
#[cfg(target_arch = "x86_64")]
fn tune_x86_64() -> Tune {
  #[cfg(feature = "std")]
  {
    // SAFETY: CPUID is available on every x86_64 processor.
    let leaf0 = unsafe { core::arch::x86_64::__cpuid(0) };
    let mut vendor = [0u8; 12];
    vendor[0..4].copy_from_slice(&leaf0.ebx.to_le_bytes());
    vendor[4..8].copy_from_slice(&leaf0.edx.to_le_bytes());
    vendor[8..12].copy_from_slice(&leaf0.ecx.to_le_bytes());

    // SAFETY: leaf 1 is valid whenever leaf 0 reports max leaf >= 1, which
    // holds on every CPU new enough to run this code.
    let leaf1 = unsafe { core::arch::x86_64::__cpuid(1) };
    let base_family = (leaf1.eax >> 8) & 0xF;
    let family = if base_family == 0xF {
      base_family + ((leaf1.eax >> 20) & 0xFF)
    } else {
      base_family
    };
    let model = ((leaf1.eax >> 4) & 0xF) | ((leaf1.eax >> 12) & 0xF0);

    return match &vendor {
      b"AuthenticAMD" => match family {
        0x19 => Tune::ZEN4,
        0x1A => Tune::ZEN5,
        _ => Tune::DEFAULT,
      },
      b"GenuineIntel" if family == 6 => match model {
        // Sapphire/Emerald/Granite Rapids
        0x8F | 0xCF | 0xAD | 0xAE => Tune::INTEL_SPR,
        // Ice Lake client/server
        0x6A | 0x6C | 0x7D | 0x7E => Tune::INTEL_ICL,
        _ => Tune::DEFAULT,
      },
      _ => Tune::DEFAULT,
    };
  }

  #[cfg(not(feature = "std"))]
  {
    Tune::DEFAULT
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// aarch64
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(target_arch = "aarch64")]
fn detect_aarch64() -> (Caps, Tune) {
  use crate::caps::aarch64;

  let mut caps = Caps::NONE;

  #[cfg(feature = "std")]
  {
    if std::arch::is_aarch64_feature_detected!("neon") {
      caps |= aarch64::NEON;
    }
    if std::arch::is_aarch64_feature_detected!("aes") {
      caps |= aarch64::AES;
    }
    if std::arch::is_aarch64_feature_detected!("sha2") {
      caps |= aarch64::SHA2;
    }
    if std::arch::is_aarch64_feature_detected!("sha3") {
      caps |= aarch64::SHA3;
    }
  }

  #[cfg(not(feature = "std"))]
  {
    // NEON is baseline on aarch64.
    if cfg!(target_feature = "neon") {
      caps |= aarch64::NEON;
    }
  }

  let tune = if caps.is_empty() {
    Tune::PORTABLE
  } else if cfg!(target_os = "macos") {
    Tune::APPLE_M1M3
  } else {
    Tune::DEFAULT
  };
  (caps, tune)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn get_is_stable_across_calls() {
    assert_eq!(get(), get());
  }

  #[cfg(all(target_arch = "x86_64", feature = "std", not(miri)))]
  #[test]
  fn x86_64_baseline_features_present() {
    let (caps, _) = get();
    // SSE2 is part of the x86_64 baseline.
    assert!(caps.has(crate::caps::x86::SSE2));
  }

  #[cfg(miri)]
  #[test]
  fn miri_reports_portable_only() {
    let (caps, tune) = get();
    assert!(caps.is_empty());
    assert_eq!(tune, Tune::PORTABLE);
  }
}
