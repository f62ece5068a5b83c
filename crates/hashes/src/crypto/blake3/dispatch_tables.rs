//! Tuned dispatch tables.
//!
//! One table per [`TuneKind`], mapping the four input size classes to kernel
//! preferences. The runtime dispatcher still validates CPU feature
//! availability and degrades when a preferred kernel cannot run. The exact
//! boundaries and per-class choices are tuning parameters, not correctness
//! requirements.

use platform::TuneKind;

pub use super::kernels::KernelId;

pub const DEFAULT_BOUNDARIES: [usize; 3] = [64, 256, 4096];

// A conservative "best available" SIMD kernel per target architecture.
#[cfg(target_arch = "x86_64")]
const SIMD_KERNEL: KernelId = KernelId::X86Avx2;
#[cfg(target_arch = "aarch64")]
const SIMD_KERNEL: KernelId = KernelId::Aarch64Neon;
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
const SIMD_KERNEL: KernelId = KernelId::Portable;

// AVX-512 is not always the best default on x86_64 (notably on some AMD
// parts), so only tune kinds where it is known to win opt into it.
#[cfg(target_arch = "x86_64")]
const AVX512_KERNEL: KernelId = KernelId::X86Avx512;
#[cfg(not(target_arch = "x86_64"))]
const AVX512_KERNEL: KernelId = SIMD_KERNEL;

#[derive(Clone, Copy, Debug)]
pub struct DispatchTable {
  pub boundaries: [usize; 3],
  pub xs: KernelId,
  pub s: KernelId,
  pub m: KernelId,
  pub l: KernelId,
}

impl DispatchTable {
  #[inline]
  #[must_use]
  pub const fn kernel_for_len(&self, len: usize) -> KernelId {
    let [xs_max, s_max, m_max] = self.boundaries;
    if len <= xs_max {
      self.xs
    } else if len <= s_max {
      self.s
    } else if len <= m_max {
      self.m
    } else {
      self.l
    }
  }
}

const fn kind_table(m: KernelId, l: KernelId) -> DispatchTable {
  DispatchTable {
    boundaries: DEFAULT_BOUNDARIES,
    xs: KernelId::Portable,
    s: KernelId::Portable,
    m,
    l,
  }
}

pub static PORTABLE_TABLE: DispatchTable = kind_table(KernelId::Portable, KernelId::Portable);
pub static CUSTOM_TABLE: DispatchTable = kind_table(KernelId::Portable, KernelId::Portable);
pub static DEFAULT_TABLE: DispatchTable = kind_table(SIMD_KERNEL, SIMD_KERNEL);
// Zen4 can be slower with AVX-512 (frequency effects). Keep AVX2 until
// per-runner tuning proves otherwise.
pub static ZEN4_TABLE: DispatchTable = kind_table(SIMD_KERNEL, SIMD_KERNEL);
pub static ZEN5_TABLE: DispatchTable = kind_table(SIMD_KERNEL, AVX512_KERNEL);
pub static INTELSPR_TABLE: DispatchTable = kind_table(AVX512_KERNEL, AVX512_KERNEL);
pub static INTELICL_TABLE: DispatchTable = kind_table(SIMD_KERNEL, SIMD_KERNEL);
pub static APPLEM1M3_TABLE: DispatchTable = kind_table(SIMD_KERNEL, SIMD_KERNEL);
pub static GRAVITON3_TABLE: DispatchTable = kind_table(SIMD_KERNEL, SIMD_KERNEL);
pub static NEOVERSEN2_TABLE: DispatchTable = kind_table(SIMD_KERNEL, SIMD_KERNEL);

#[inline]
#[must_use]
pub fn select_table(kind: TuneKind) -> &'static DispatchTable {
  match kind {
    TuneKind::Custom => &CUSTOM_TABLE,
    TuneKind::Default => &DEFAULT_TABLE,
    TuneKind::Portable => &PORTABLE_TABLE,
    TuneKind::Zen4 => &ZEN4_TABLE,
    TuneKind::Zen5 => &ZEN5_TABLE,
    TuneKind::IntelSpr => &INTELSPR_TABLE,
    TuneKind::IntelIcl => &INTELICL_TABLE,
    TuneKind::AppleM1M3 => &APPLEM1M3_TABLE,
    TuneKind::Graviton3 => &GRAVITON3_TABLE,
    TuneKind::NeoverseN2 => &NEOVERSEN2_TABLE,
  }
}
