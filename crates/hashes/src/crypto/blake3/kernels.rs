//! BLAKE3 kernel table.
//!
//! A [`Kernel`] is a tagged dispatch table of function pointers: single-block
//! compression, parent-node compression, and the multi-chunk engine. The tree
//! hasher and streaming driver depend only on these operations; the back-end
//! choice does not leak further up.

use platform::Caps;
#[cfg(target_arch = "aarch64")]
use platform::caps::aarch64;
#[cfg(target_arch = "x86_64")]
use platform::caps::x86;

use super::{
  BLOCK_LEN, CHUNK_LEN, CHUNK_START, OUT_LEN, PARENT, first_8_words, words16_from_le_bytes_64, words8_to_le_bytes,
};

// ─────────────────────────────────────────────────────────────────────────────
// Kernel function types
// ─────────────────────────────────────────────────────────────────────────────

/// Core compression function (single block).
pub(crate) type CompressFn = fn(&[u32; 8], &[u32; 16], u64, u32, u32) -> [u32; 16];

/// Parent CV computation from two child CVs.
pub(crate) type ParentCvFn = fn([u32; 8], [u32; 8], [u32; 8], u32) -> [u32; 8];

/// Multi-chunk hashing for contiguous input (hot path for large inputs).
///
/// Hashes `num_chunks` contiguous `CHUNK_LEN`-byte chunks from `input`,
/// writing `OUT_LEN * num_chunks` bytes of chaining values to `out`.
///
/// # Safety
///
/// - `input` must point to at least `CHUNK_LEN * num_chunks` readable bytes.
/// - `out` must point to at least `OUT_LEN * num_chunks` writable bytes.
/// - The kernel's [`required_caps`] must be present on the running CPU.
pub(crate) type HashManyContiguousFn =
  unsafe fn(input: *const u8, num_chunks: usize, key: &[u32; 8], counter: u64, flags: u32, out: *mut u8);

// ─────────────────────────────────────────────────────────────────────────────
// Kernel struct and IDs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
pub(crate) struct Kernel {
  pub(crate) id: KernelId,
  /// Compress a single block (streaming, parents, XOF blocks).
  pub(crate) compress: CompressFn,
  /// Compute a parent CV from two child CVs.
  pub(crate) parent_cv: ParentCvFn,
  /// Hash many contiguous whole chunks.
  pub(crate) hash_many_contiguous: HashManyContiguousFn,
  /// SIMD degree: 1 scalar, 4 for SSE4.1/NEON, 8 for AVX2, 16 for AVX-512.
  pub(crate) simd_degree: usize,
  /// Kernel name for debugging/introspection.
  pub(crate) name: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum KernelId {
  Portable = 0,
  #[cfg(target_arch = "x86_64")]
  X86Sse41 = 1,
  #[cfg(target_arch = "x86_64")]
  X86Avx2 = 2,
  #[cfg(target_arch = "x86_64")]
  X86Avx512 = 3,
  #[cfg(target_arch = "aarch64")]
  Aarch64Neon = 4,
}

pub const ALL: &[KernelId] = &[
  KernelId::Portable,
  #[cfg(target_arch = "x86_64")]
  KernelId::X86Sse41,
  #[cfg(target_arch = "x86_64")]
  KernelId::X86Avx2,
  #[cfg(target_arch = "x86_64")]
  KernelId::X86Avx512,
  #[cfg(target_arch = "aarch64")]
  KernelId::Aarch64Neon,
];

impl KernelId {
  #[inline]
  #[must_use]
  pub const fn as_str(self) -> &'static str {
    match self {
      Self::Portable => "portable",
      #[cfg(target_arch = "x86_64")]
      Self::X86Sse41 => "x86_64/sse4.1",
      #[cfg(target_arch = "x86_64")]
      Self::X86Avx2 => "x86_64/avx2",
      #[cfg(target_arch = "x86_64")]
      Self::X86Avx512 => "x86_64/avx512",
      #[cfg(target_arch = "aarch64")]
      Self::Aarch64Neon => "aarch64/neon",
    }
  }

  /// Chunks hashed per engine pass.
  #[inline]
  #[must_use]
  pub const fn simd_degree(self) -> usize {
    match self {
      Self::Portable => 1,
      #[cfg(target_arch = "x86_64")]
      Self::X86Sse41 => 4,
      #[cfg(target_arch = "x86_64")]
      Self::X86Avx2 => 8,
      #[cfg(target_arch = "x86_64")]
      Self::X86Avx512 => 16,
      #[cfg(target_arch = "aarch64")]
      Self::Aarch64Neon => 4,
    }
  }
}

#[must_use]
pub(crate) fn kernel(id: KernelId) -> Kernel {
  // Per-block compression is the scalar core for every kernel: single-block
  // work is dominated by message permutation, where the scalar compressor is
  // competitive, and keeping one implementation keeps the position/flag logic
  // in one place. The wide engines carry the multi-chunk and multi-block-XOF
  // paths.
  match id {
    KernelId::Portable => Kernel {
      id,
      compress: super::compress,
      parent_cv: parent_cv_portable,
      hash_many_contiguous: hash_many_contiguous_portable,
      simd_degree: 1,
      name: id.as_str(),
    },
    #[cfg(target_arch = "x86_64")]
    KernelId::X86Sse41 => Kernel {
      id,
      compress: super::compress,
      parent_cv: parent_cv_portable,
      hash_many_contiguous: hash_many_contiguous_sse41,
      simd_degree: 4,
      name: id.as_str(),
    },
    #[cfg(target_arch = "x86_64")]
    KernelId::X86Avx2 => Kernel {
      id,
      compress: super::compress,
      parent_cv: parent_cv_portable,
      hash_many_contiguous: hash_many_contiguous_avx2,
      simd_degree: 8,
      name: id.as_str(),
    },
    #[cfg(target_arch = "x86_64")]
    KernelId::X86Avx512 => Kernel {
      id,
      compress: super::compress,
      parent_cv: parent_cv_portable,
      hash_many_contiguous: hash_many_contiguous_avx512,
      simd_degree: 16,
      name: id.as_str(),
    },
    #[cfg(target_arch = "aarch64")]
    KernelId::Aarch64Neon => Kernel {
      id,
      compress: super::compress,
      parent_cv: parent_cv_portable,
      hash_many_contiguous: hash_many_contiguous_neon,
      simd_degree: 4,
      name: id.as_str(),
    },
  }
}

/// CPU features a kernel needs before dispatch may select it.
#[inline]
#[must_use]
pub const fn required_caps(id: KernelId) -> Caps {
  match id {
    KernelId::Portable => Caps::NONE,
    #[cfg(target_arch = "x86_64")]
    // SSSE3 supplies the byte-shuffle rotations the 4-way engine uses.
    KernelId::X86Sse41 => x86::SSE41.union(x86::SSSE3),
    #[cfg(target_arch = "x86_64")]
    KernelId::X86Avx2 => x86::AVX2.union(x86::SSE41).union(x86::SSSE3),
    #[cfg(target_arch = "x86_64")]
    KernelId::X86Avx512 => x86::AVX512F
      .union(x86::AVX512VL)
      .union(x86::AVX2)
      .union(x86::SSE41)
      .union(x86::SSSE3),
    #[cfg(target_arch = "aarch64")]
    KernelId::Aarch64Neon => aarch64::NEON,
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Portable implementations
// ─────────────────────────────────────────────────────────────────────────────

fn parent_cv_portable(left_child_cv: [u32; 8], right_child_cv: [u32; 8], key_words: [u32; 8], flags: u32) -> [u32; 8] {
  let mut block_words = [0u32; 16];
  block_words[..8].copy_from_slice(&left_child_cv);
  block_words[8..].copy_from_slice(&right_child_cv);
  first_8_words(super::compress(&key_words, &block_words, 0, BLOCK_LEN as u32, PARENT | flags))
}

unsafe fn hash_many_contiguous_portable(
  input: *const u8,
  num_chunks: usize,
  key: &[u32; 8],
  counter: u64,
  flags: u32,
  out: *mut u8,
) {
  const BLOCKS_PER_CHUNK: usize = CHUNK_LEN / BLOCK_LEN;
  debug_assert!(num_chunks != 0);

  for chunk_idx in 0..num_chunks {
    let chunk_counter = counter.wrapping_add(chunk_idx as u64);
    let mut cv = *key;

    for block_idx in 0..BLOCKS_PER_CHUNK {
      let mut block = [0u8; BLOCK_LEN];
      // SAFETY: the caller guarantees `input` covers `num_chunks` whole
      // chunks, and this offset stays below `num_chunks * CHUNK_LEN`.
      unsafe {
        core::ptr::copy_nonoverlapping(
          input.add(chunk_idx * CHUNK_LEN + block_idx * BLOCK_LEN),
          block.as_mut_ptr(),
          BLOCK_LEN,
        );
      }

      let mut block_flags = flags;
      if block_idx == 0 {
        block_flags |= CHUNK_START;
      }
      if block_idx + 1 == BLOCKS_PER_CHUNK {
        block_flags |= super::CHUNK_END;
      }
      cv = first_8_words(super::compress(
        &cv,
        &words16_from_le_bytes_64(&block),
        chunk_counter,
        BLOCK_LEN as u32,
        block_flags,
      ));
    }

    let cv_bytes = words8_to_le_bytes(&cv);
    // SAFETY: the caller guarantees `out` covers `num_chunks * OUT_LEN` bytes.
    unsafe { core::ptr::copy_nonoverlapping(cv_bytes.as_ptr(), out.add(chunk_idx * OUT_LEN), OUT_LEN) };
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// x86_64 engine wrappers (16 → 8 → 4 fall-through)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(target_arch = "x86_64")]
unsafe fn hash_many_contiguous_sse41(
  mut input: *const u8,
  mut num_chunks: usize,
  key: &[u32; 8],
  mut counter: u64,
  flags: u32,
  mut out: *mut u8,
) {
  use super::x86_64::sse41;

  while num_chunks >= sse41::DEGREE {
    // SAFETY: `num_chunks >= DEGREE` whole chunks remain, so every offset
    // below stays inside the caller's buffer.
    let ptrs = unsafe {
      [
        input,
        input.add(CHUNK_LEN),
        input.add(2 * CHUNK_LEN),
        input.add(3 * CHUNK_LEN),
      ]
    };
    // SAFETY: dispatch selects this kernel only when SSE4.1+SSSE3 are
    // available; `ptrs` cover whole chunks and `out` covers DEGREE CVs.
    unsafe {
      sse41::hash4(
        &ptrs,
        CHUNK_LEN / BLOCK_LEN,
        key,
        counter,
        true,
        flags,
        CHUNK_START,
        super::CHUNK_END,
        out,
      );
      input = input.add(sse41::DEGREE * CHUNK_LEN);
      out = out.add(sse41::DEGREE * OUT_LEN);
    }
    counter = counter.wrapping_add(sse41::DEGREE as u64);
    num_chunks -= sse41::DEGREE;
  }

  if num_chunks != 0 {
    // Sub-degree tail (1-3 chunks): duplicate the final chunk pointer into
    // the unused lanes and copy only the needed outputs.
    // SAFETY: `num_chunks` whole chunks remain in the caller's buffer.
    let last = unsafe { input.add((num_chunks - 1) * CHUNK_LEN) };
    // SAFETY: every offset is within the remaining `num_chunks` chunks.
    let ptrs = unsafe {
      [
        input,
        if num_chunks > 1 { input.add(CHUNK_LEN) } else { last },
        if num_chunks > 2 { input.add(2 * CHUNK_LEN) } else { last },
        last,
      ]
    };

    let mut tmp = [0u8; sse41::DEGREE * OUT_LEN];
    // SAFETY: SSE4.1+SSSE3 are available per dispatch; `ptrs` cover whole
    // chunks; `tmp` holds DEGREE CVs and `out` holds `num_chunks` CVs.
    unsafe {
      sse41::hash4(
        &ptrs,
        CHUNK_LEN / BLOCK_LEN,
        key,
        counter,
        true,
        flags,
        CHUNK_START,
        super::CHUNK_END,
        tmp.as_mut_ptr(),
      );
      core::ptr::copy_nonoverlapping(tmp.as_ptr(), out, num_chunks * OUT_LEN);
    }
  }
}

#[cfg(target_arch = "x86_64")]
unsafe fn hash_many_contiguous_avx2(
  mut input: *const u8,
  mut num_chunks: usize,
  key: &[u32; 8],
  mut counter: u64,
  flags: u32,
  mut out: *mut u8,
) {
  use super::x86_64::avx2;

  while num_chunks >= avx2::DEGREE {
    // SAFETY: `num_chunks >= DEGREE` whole chunks remain, so every offset
    // below stays inside the caller's buffer.
    let ptrs = unsafe {
      [
        input,
        input.add(CHUNK_LEN),
        input.add(2 * CHUNK_LEN),
        input.add(3 * CHUNK_LEN),
        input.add(4 * CHUNK_LEN),
        input.add(5 * CHUNK_LEN),
        input.add(6 * CHUNK_LEN),
        input.add(7 * CHUNK_LEN),
      ]
    };
    // SAFETY: dispatch selects this kernel only when AVX2 is available;
    // `ptrs` cover whole chunks and `out` covers DEGREE CVs.
    unsafe {
      avx2::hash8(
        &ptrs,
        CHUNK_LEN / BLOCK_LEN,
        key,
        counter,
        true,
        flags,
        CHUNK_START,
        super::CHUNK_END,
        out,
      );
      input = input.add(avx2::DEGREE * CHUNK_LEN);
      out = out.add(avx2::DEGREE * OUT_LEN);
    }
    counter = counter.wrapping_add(avx2::DEGREE as u64);
    num_chunks -= avx2::DEGREE;
  }

  if num_chunks != 0 {
    // 1-7 chunk tail: cede to the 4-way engine (AVX2 implies SSE4.1+SSSE3
    // per required_caps).
    // SAFETY: forwarded with the same buffer guarantees.
    unsafe { hash_many_contiguous_sse41(input, num_chunks, key, counter, flags, out) };
  }
}

#[cfg(target_arch = "x86_64")]
unsafe fn hash_many_contiguous_avx512(
  mut input: *const u8,
  mut num_chunks: usize,
  key: &[u32; 8],
  mut counter: u64,
  flags: u32,
  mut out: *mut u8,
) {
  use super::x86_64::avx512;

  while num_chunks >= avx512::DEGREE {
    // SAFETY: dispatch selects this kernel only when AVX-512 F/VL (and AVX2)
    // are available; `input` covers DEGREE whole chunks and `out` DEGREE CVs.
    unsafe {
      avx512::hash16_contiguous(input, key, counter, flags, out);
      input = input.add(avx512::DEGREE * CHUNK_LEN);
      out = out.add(avx512::DEGREE * OUT_LEN);
    }
    counter = counter.wrapping_add(avx512::DEGREE as u64);
    num_chunks -= avx512::DEGREE;
  }

  if num_chunks != 0 {
    // 1-15 chunk tail: cede to the 8-way engine, which in turn cedes to the
    // 4-way engine below its own degree.
    // SAFETY: forwarded with the same buffer guarantees.
    unsafe { hash_many_contiguous_avx2(input, num_chunks, key, counter, flags, out) };
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// aarch64 engine wrapper
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(target_arch = "aarch64")]
unsafe fn hash_many_contiguous_neon(
  mut input: *const u8,
  mut num_chunks: usize,
  key: &[u32; 8],
  mut counter: u64,
  flags: u32,
  mut out: *mut u8,
) {
  use super::aarch64 as neon;

  while num_chunks >= neon::DEGREE {
    // SAFETY: `num_chunks >= DEGREE` whole chunks remain, so every offset
    // below stays inside the caller's buffer.
    let ptrs = unsafe {
      [
        input,
        input.add(CHUNK_LEN),
        input.add(2 * CHUNK_LEN),
        input.add(3 * CHUNK_LEN),
      ]
    };
    // SAFETY: dispatch selects this kernel only when NEON is available;
    // `ptrs` cover whole chunks and `out` covers DEGREE CVs.
    unsafe {
      neon::hash4(
        &ptrs,
        CHUNK_LEN / BLOCK_LEN,
        key,
        counter,
        true,
        flags,
        CHUNK_START,
        super::CHUNK_END,
        out,
      );
      input = input.add(neon::DEGREE * CHUNK_LEN);
      out = out.add(neon::DEGREE * OUT_LEN);
    }
    counter = counter.wrapping_add(neon::DEGREE as u64);
    num_chunks -= neon::DEGREE;
  }

  if num_chunks != 0 {
    // SAFETY: `num_chunks` whole chunks remain in the caller's buffer.
    let last = unsafe { input.add((num_chunks - 1) * CHUNK_LEN) };
    // SAFETY: every offset is within the remaining `num_chunks` chunks.
    let ptrs = unsafe {
      [
        input,
        if num_chunks > 1 { input.add(CHUNK_LEN) } else { last },
        if num_chunks > 2 { input.add(2 * CHUNK_LEN) } else { last },
        last,
      ]
    };

    let mut tmp = [0u8; neon::DEGREE * OUT_LEN];
    // SAFETY: NEON is available per dispatch; `ptrs` cover whole chunks;
    // `tmp` holds DEGREE CVs and `out` holds `num_chunks` CVs.
    unsafe {
      neon::hash4(
        &ptrs,
        CHUNK_LEN / BLOCK_LEN,
        key,
        counter,
        true,
        flags,
        CHUNK_START,
        super::CHUNK_END,
        tmp.as_mut_ptr(),
      );
      core::ptr::copy_nonoverlapping(tmp.as_ptr(), out, num_chunks * OUT_LEN);
    }
  }
}
