//! Kernel selection.
//!
//! The tuned tables express *preferences* per size class; this module enforces
//! correctness (required CPU features) on top, degrading tier-by-tier rather
//! than cliffing to the portable kernel when only the top tier is missing.
//! The resolved dispatch is computed once per process and cached.

use platform::{Caps, Lazy};

use super::{
  dispatch_tables::{DispatchTable, select_table},
  kernels::{Kernel, KernelId, kernel, required_caps},
};
use crate::crypto::dispatch_util::SizeClassDispatch;

#[derive(Clone, Copy)]
struct ActiveDispatch {
  boundaries: [usize; 3],
  xs: Kernel,
  s: Kernel,
  m: Kernel,
  l: Kernel,
}

static ACTIVE: Lazy<ActiveDispatch> = Lazy::new();

#[inline]
#[must_use]
fn resolve(id: KernelId, caps: Caps) -> KernelId {
  match id {
    KernelId::Portable => KernelId::Portable,
    #[cfg(target_arch = "x86_64")]
    KernelId::X86Avx512 => {
      if caps.has(required_caps(KernelId::X86Avx512)) {
        KernelId::X86Avx512
      } else if caps.has(required_caps(KernelId::X86Avx2)) {
        KernelId::X86Avx2
      } else if caps.has(required_caps(KernelId::X86Sse41)) {
        KernelId::X86Sse41
      } else {
        KernelId::Portable
      }
    }
    #[cfg(target_arch = "x86_64")]
    KernelId::X86Avx2 => {
      if caps.has(required_caps(KernelId::X86Avx2)) {
        KernelId::X86Avx2
      } else if caps.has(required_caps(KernelId::X86Sse41)) {
        KernelId::X86Sse41
      } else {
        KernelId::Portable
      }
    }
    #[cfg(target_arch = "x86_64")]
    KernelId::X86Sse41 => {
      if caps.has(required_caps(KernelId::X86Sse41)) {
        KernelId::X86Sse41
      } else {
        KernelId::Portable
      }
    }
    #[cfg(target_arch = "aarch64")]
    KernelId::Aarch64Neon => {
      if caps.has(required_caps(KernelId::Aarch64Neon)) {
        KernelId::Aarch64Neon
      } else {
        KernelId::Portable
      }
    }
  }
}

#[inline]
#[must_use]
fn active() -> ActiveDispatch {
  ACTIVE.get_or_init(|| {
    let (caps, tune) = platform::get();
    let table: &'static DispatchTable = select_table(tune.kind);

    // Below the microarch's SIMD threshold, kernel setup costs dominate any
    // lane win; widen the scalar size class to at least that point.
    let mut boundaries = table.boundaries;
    boundaries[0] = boundaries[0].max(tune.simd_threshold.saturating_sub(1));

    ActiveDispatch {
      boundaries,
      xs: kernel(resolve(table.xs, caps)),
      s: kernel(resolve(table.s, caps)),
      m: kernel(resolve(table.m, caps)),
      l: kernel(resolve(table.l, caps)),
    }
  })
}

#[inline]
#[must_use]
fn select(d: &ActiveDispatch, len: usize) -> Kernel {
  let [xs_max, s_max, m_max] = d.boundaries;
  if len <= xs_max {
    d.xs
  } else if len <= s_max {
    d.s
  } else if len <= m_max {
    d.m
  } else {
    d.l
  }
}

/// Kernel name a given input length would dispatch to (introspection).
#[inline]
#[must_use]
pub fn kernel_name_for_len(len: usize) -> &'static str {
  let d = active();
  select(&d, len).name
}

/// The kernel streaming hashers pin at construction: the widest resolved one.
#[inline]
#[must_use]
pub(crate) fn streaming_kernel() -> Kernel {
  active().l
}

#[inline]
#[must_use]
pub fn digest(data: &[u8]) -> [u8; 32] {
  let d = active();
  super::digest_oneshot(select(&d, data.len()), super::IV, 0, data)
}

#[inline]
#[must_use]
pub fn xof(data: &[u8]) -> super::Blake3Xof {
  let d = active();
  let output = super::root_output_oneshot(select(&d, data.len()), super::IV, 0, data);
  super::Blake3Xof::new(output)
}

#[inline]
#[must_use]
pub(crate) fn kernel_dispatch() -> SizeClassDispatch<Kernel> {
  let d = active();
  SizeClassDispatch {
    boundaries: d.boundaries,
    xs: d.xs,
    s: d.s,
    m: d.m,
    l: d.l,
  }
}
