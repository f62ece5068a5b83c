//! BLAKE3 (hash + XOF).
//!
//! A Merkle-tree hash over 1024-byte chunks. Chunk hashing is the hot path and
//! is dispatched to transposed-state SIMD engines (4/8/16 chunks per pass)
//! when the CPU supports them; the tree reduction and streaming bookkeeping
//! are scalar. All kernels produce byte-identical output.

#![allow(clippy::indexing_slicing)] // Fixed-size arrays + internal block parsing

use core::cmp::min;

use traits::{Digest, HashError, Xof};
use zeroize::Zeroize;

#[cfg(target_arch = "aarch64")]
pub(crate) mod aarch64;
#[doc(hidden)]
pub mod dispatch;
#[doc(hidden)]
pub mod dispatch_tables;
pub(crate) mod kernels;
#[cfg(target_arch = "x86_64")]
pub(crate) mod x86_64;

#[cfg(feature = "std")]
#[doc(hidden)]
pub mod kernel_test;

use self::kernels::Kernel;

const OUT_LEN: usize = 32;
const KEY_LEN: usize = 32;
const BLOCK_LEN: usize = 64;
const CHUNK_LEN: usize = 1024;
const OUTPUT_BLOCK_LEN: usize = 2 * OUT_LEN;

/// Widest SIMD degree any kernel exposes.
const MAX_SIMD_DEGREE: usize = 16;

/// The 64-bit chunk counter bounds the tree depth.
const CV_STACK_CAP: usize = 54;

const CHUNK_START: u32 = 1 << 0;
const CHUNK_END: u32 = 1 << 1;
const PARENT: u32 = 1 << 2;
const ROOT: u32 = 1 << 3;
const KEYED_HASH: u32 = 1 << 4;
const DERIVE_KEY_CONTEXT: u32 = 1 << 5;
const DERIVE_KEY_MATERIAL: u32 = 1 << 6;

const IV: [u32; 8] = [
  0x6A09_E667,
  0xBB67_AE85,
  0x3C6E_F372,
  0xA54F_F53A,
  0x510E_527F,
  0x9B05_688C,
  0x1F83_D9AB,
  0x5BE0_CD19,
];

/// BLAKE3 message schedule.
///
/// `MSG_SCHEDULE[round][i]` gives the index of the message word to use. Round
/// 0 is the identity; each later round applies the fixed BLAKE3 permutation to
/// the previous round's schedule.
pub(crate) const MSG_SCHEDULE: [[usize; 16]; 7] = [
  [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
  [2, 6, 3, 10, 7, 0, 4, 13, 1, 11, 12, 5, 9, 14, 15, 8],
  [3, 4, 10, 12, 13, 2, 7, 14, 6, 5, 9, 0, 11, 15, 8, 1],
  [10, 7, 12, 9, 14, 3, 13, 15, 4, 0, 11, 2, 5, 8, 1, 6],
  [12, 13, 9, 11, 15, 10, 14, 8, 7, 2, 5, 3, 0, 1, 6, 4],
  [9, 14, 11, 5, 8, 12, 15, 1, 13, 3, 0, 10, 2, 6, 4, 7],
  [11, 15, 5, 0, 1, 9, 8, 6, 14, 10, 2, 12, 3, 4, 7, 13],
];

// ─────────────────────────────────────────────────────────────────────────────
// Little-endian word plumbing
// ─────────────────────────────────────────────────────────────────────────────

#[inline(always)]
fn words8_from_le_bytes_32(bytes: &[u8; 32]) -> [u32; 8] {
  let mut words = [0u32; 8];
  let (chunks, _) = bytes.as_chunks::<4>();
  for (word, chunk) in words.iter_mut().zip(chunks) {
    *word = u32::from_le_bytes(*chunk);
  }
  words
}

#[inline(always)]
fn words16_from_le_bytes_64(bytes: &[u8; 64]) -> [u32; 16] {
  let mut words = [0u32; 16];
  let (chunks, _) = bytes.as_chunks::<4>();
  for (word, chunk) in words.iter_mut().zip(chunks) {
    *word = u32::from_le_bytes(*chunk);
  }
  words
}

#[inline(always)]
fn words8_to_le_bytes(words: &[u32; 8]) -> [u8; OUT_LEN] {
  let mut out = [0u8; OUT_LEN];
  let (chunks, _) = out.as_chunks_mut::<4>();
  for (chunk, word) in chunks.iter_mut().zip(words) {
    *chunk = word.to_le_bytes();
  }
  out
}

#[inline(always)]
fn words16_to_le_bytes(words: &[u32; 16]) -> [u8; OUTPUT_BLOCK_LEN] {
  let mut out = [0u8; OUTPUT_BLOCK_LEN];
  let (chunks, _) = out.as_chunks_mut::<4>();
  for (chunk, word) in chunks.iter_mut().zip(words) {
    *chunk = word.to_le_bytes();
  }
  out
}

#[inline(always)]
fn first_8_words(words: [u32; 16]) -> [u32; 8] {
  [
    words[0], words[1], words[2], words[3], words[4], words[5], words[6], words[7],
  ]
}

// ─────────────────────────────────────────────────────────────────────────────
// Compression function
// ─────────────────────────────────────────────────────────────────────────────

/// The G quarter-round on four state words and two message words.
#[inline(always)]
fn g(v: &mut [u32; 16], a: usize, b: usize, c: usize, d: usize, mx: u32, my: u32) {
  v[a] = v[a].wrapping_add(v[b]).wrapping_add(mx);
  v[d] = (v[d] ^ v[a]).rotate_right(16);
  v[c] = v[c].wrapping_add(v[d]);
  v[b] = (v[b] ^ v[c]).rotate_right(12);
  v[a] = v[a].wrapping_add(v[b]).wrapping_add(my);
  v[d] = (v[d] ^ v[a]).rotate_right(8);
  v[c] = v[c].wrapping_add(v[d]);
  v[b] = (v[b] ^ v[c]).rotate_right(7);
}

#[inline(always)]
fn round(v: &mut [u32; 16], m: &[u32; 16], schedule: &[usize; 16]) {
  // Columns.
  g(v, 0, 4, 8, 12, m[schedule[0]], m[schedule[1]]);
  g(v, 1, 5, 9, 13, m[schedule[2]], m[schedule[3]]);
  g(v, 2, 6, 10, 14, m[schedule[4]], m[schedule[5]]);
  g(v, 3, 7, 11, 15, m[schedule[6]], m[schedule[7]]);
  // Diagonals.
  g(v, 0, 5, 10, 15, m[schedule[8]], m[schedule[9]]);
  g(v, 1, 6, 11, 12, m[schedule[10]], m[schedule[11]]);
  g(v, 2, 7, 8, 13, m[schedule[12]], m[schedule[13]]);
  g(v, 3, 4, 9, 14, m[schedule[14]], m[schedule[15]]);
}

/// The BLAKE3 compression function.
///
/// Returns the full 16-word state with both feed-forwards applied: the first
/// 8 words are the updated chaining value, and all 16 serialize to one 64-byte
/// XOF output block.
#[inline]
pub(crate) fn compress(
  chaining_value: &[u32; 8],
  block_words: &[u32; 16],
  counter: u64,
  block_len: u32,
  flags: u32,
) -> [u32; 16] {
  let mut v = [
    chaining_value[0],
    chaining_value[1],
    chaining_value[2],
    chaining_value[3],
    chaining_value[4],
    chaining_value[5],
    chaining_value[6],
    chaining_value[7],
    IV[0],
    IV[1],
    IV[2],
    IV[3],
    counter as u32,
    (counter >> 32) as u32,
    block_len,
    flags,
  ];

  for schedule in &MSG_SCHEDULE {
    round(&mut v, block_words, schedule);
  }

  for i in 0..8 {
    v[i] ^= v[i + 8];
    v[i + 8] ^= chaining_value[i];
  }
  v
}

// ─────────────────────────────────────────────────────────────────────────────
// Deferred node output (chunk tail or parent), root hashing, XOF blocks
// ─────────────────────────────────────────────────────────────────────────────

/// A compression whose final flags are not yet settled.
///
/// The last compression of a hash must carry `ROOT`, but whether a given chunk
/// tail or parent node is the last one is only known at finalize time. This
/// object captures the compression inputs so it can be run in chaining-value
/// mode, root mode, or XOF mode.
#[derive(Clone, Copy)]
struct NodeOutput {
  kernel: Kernel,
  input_chaining_value: [u32; 8],
  block_words: [u32; 16],
  counter: u64,
  block_len: u32,
  flags: u32,
}

impl NodeOutput {
  #[inline]
  fn chaining_value(&self) -> [u32; 8] {
    first_8_words((self.kernel.compress)(
      &self.input_chaining_value,
      &self.block_words,
      self.counter,
      self.block_len,
      self.flags,
    ))
  }

  /// Root hash words: XOF block 0, truncated to the chaining value.
  #[inline]
  fn root_hash_words(&self) -> [u32; 8] {
    first_8_words((self.kernel.compress)(
      &self.input_chaining_value,
      &self.block_words,
      0,
      self.block_len,
      self.flags | ROOT,
    ))
  }

  #[inline]
  fn root_hash_bytes(&self) -> [u8; OUT_LEN] {
    words8_to_le_bytes(&self.root_hash_words())
  }

  /// Write whole 64-byte XOF blocks starting at `block_counter`.
  ///
  /// The root compression is re-run once per output block with the counter
  /// overwritten by the output block index; the chaining value, block, block
  /// length, and flags stay fixed.
  fn write_root_blocks(&self, mut block_counter: u64, mut out: &mut [u8]) {
    debug_assert!(out.len().is_multiple_of(OUTPUT_BLOCK_LEN));
    let flags = self.flags | ROOT;

    while !out.is_empty() {
      let blocks_remaining = out.len() / OUTPUT_BLOCK_LEN;

      #[cfg(target_arch = "x86_64")]
      {
        use self::kernels::KernelId;

        let avx2_ok = matches!(self.kernel.id, KernelId::X86Avx2 | KernelId::X86Avx512);
        if avx2_ok && blocks_remaining >= x86_64::avx2::DEGREE {
          // SAFETY: dispatch only selects AVX2/AVX-512 kernels when their
          // required CPU features are present, and `out` holds >= 8 blocks.
          unsafe {
            x86_64::avx2::root_output_blocks8(
              &self.input_chaining_value,
              &self.block_words,
              block_counter,
              self.block_len,
              flags,
              out.as_mut_ptr(),
            );
          }
          block_counter = block_counter.wrapping_add(x86_64::avx2::DEGREE as u64);
          out = &mut out[x86_64::avx2::DEGREE * OUTPUT_BLOCK_LEN..];
          continue;
        }

        let sse41_ok = matches!(
          self.kernel.id,
          KernelId::X86Sse41 | KernelId::X86Avx2 | KernelId::X86Avx512
        );
        if sse41_ok && blocks_remaining >= x86_64::sse41::DEGREE {
          // SAFETY: every x86 SIMD kernel requires SSE4.1+SSSE3 (validated by
          // dispatch), and `out` holds >= 4 blocks.
          unsafe {
            x86_64::sse41::root_output_blocks4(
              &self.input_chaining_value,
              &self.block_words,
              block_counter,
              self.block_len,
              flags,
              out.as_mut_ptr(),
            );
          }
          block_counter = block_counter.wrapping_add(x86_64::sse41::DEGREE as u64);
          out = &mut out[x86_64::sse41::DEGREE * OUTPUT_BLOCK_LEN..];
          continue;
        }
      }

      // Scalar fallback: one block at a time.
      let words = (self.kernel.compress)(
        &self.input_chaining_value,
        &self.block_words,
        block_counter,
        self.block_len,
        flags,
      );
      out[..OUTPUT_BLOCK_LEN].copy_from_slice(&words16_to_le_bytes(&words));
      block_counter = block_counter.wrapping_add(1);
      out = &mut out[OUTPUT_BLOCK_LEN..];
    }
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Chunk state
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
struct ChunkState {
  kernel: Kernel,
  chaining_value: [u32; 8],
  chunk_counter: u64,
  block: [u8; BLOCK_LEN],
  block_len: u8,
  blocks_compressed: u8,
  flags: u32,
}

impl ChunkState {
  #[inline]
  fn new(key_words: [u32; 8], chunk_counter: u64, flags: u32, kernel: Kernel) -> Self {
    Self {
      kernel,
      chaining_value: key_words,
      chunk_counter,
      block: [0u8; BLOCK_LEN],
      block_len: 0,
      blocks_compressed: 0,
      flags,
    }
  }

  #[inline]
  fn len(&self) -> usize {
    BLOCK_LEN * self.blocks_compressed as usize + self.block_len as usize
  }

  #[inline]
  fn start_flag(&self) -> u32 {
    if self.blocks_compressed == 0 { CHUNK_START } else { 0 }
  }

  #[inline]
  fn compress_block_words(&mut self, block_words: &[u32; 16]) {
    self.chaining_value = first_8_words((self.kernel.compress)(
      &self.chaining_value,
      block_words,
      self.chunk_counter,
      BLOCK_LEN as u32,
      self.flags | self.start_flag(),
    ));
    self.blocks_compressed = self.blocks_compressed.wrapping_add(1);
  }

  /// Absorb bytes into this chunk.
  ///
  /// Invariant: the most recently seen block stays buffered. It is compressed
  /// only once more input proves it is not the chunk's (and possibly the
  /// hash's) final block; `output()` settles its `CHUNK_END` flag otherwise.
  fn update(&mut self, mut input: &[u8]) {
    debug_assert!(self.len() + input.len() <= CHUNK_LEN);

    // Top up a partially filled block first.
    if self.block_len != 0 {
      let take = min(BLOCK_LEN - self.block_len as usize, input.len());
      self.block[self.block_len as usize..][..take].copy_from_slice(&input[..take]);
      self.block_len = self.block_len.wrapping_add(take as u8);
      input = &input[take..];
      if input.is_empty() {
        return;
      }
      debug_assert!(self.blocks_compressed < 15, "the 16th block stays buffered");
      let block_words = words16_from_le_bytes_64(&self.block);
      self.compress_block_words(&block_words);
      self.block_len = 0;
    }

    // Whole blocks straight from the caller slice, always leaving a trailing
    // block (full or partial) for the buffer.
    if input.len() > BLOCK_LEN {
      let full_blocks = (input.len() - 1) / BLOCK_LEN;
      let take_blocks = min(full_blocks, 15 - self.blocks_compressed as usize);
      let bytes = take_blocks * BLOCK_LEN;
      let (blocks, _) = input[..bytes].as_chunks::<BLOCK_LEN>();
      for block in blocks {
        let block_words = words16_from_le_bytes_64(block);
        self.compress_block_words(&block_words);
      }
      input = &input[bytes..];
    }

    debug_assert!(!input.is_empty() && input.len() <= BLOCK_LEN);
    self.block[..input.len()].copy_from_slice(input);
    self.block_len = input.len() as u8;
  }

  /// The chunk's final compression, with `CHUNK_END` settled.
  #[inline]
  fn output(&self) -> NodeOutput {
    let mut block = self.block;
    block[self.block_len as usize..].fill(0);
    NodeOutput {
      kernel: self.kernel,
      input_chaining_value: self.chaining_value,
      block_words: words16_from_le_bytes_64(&block),
      counter: self.chunk_counter,
      block_len: self.block_len as u32,
      flags: self.flags | self.start_flag() | CHUNK_END,
    }
  }
}

/// Hash one chunk of at most `CHUNK_LEN` bytes into its deferred tail output.
///
/// The empty input is a single zero-length block carrying both position flags.
fn single_chunk_output(
  kernel: Kernel,
  key_words: [u32; 8],
  chunk_counter: u64,
  flags: u32,
  input: &[u8],
) -> NodeOutput {
  debug_assert!(input.len() <= CHUNK_LEN);

  let (full_bytes, last_len) = if input.is_empty() {
    (0usize, 0usize)
  } else {
    let full_blocks = (input.len() - 1) / BLOCK_LEN;
    (full_blocks * BLOCK_LEN, input.len() - full_blocks * BLOCK_LEN)
  };

  let mut chaining_value = key_words;
  let mut blocks_compressed = 0u32;
  let (blocks, _) = input[..full_bytes].as_chunks::<BLOCK_LEN>();
  for block in blocks {
    let start = if blocks_compressed == 0 { CHUNK_START } else { 0 };
    chaining_value = first_8_words((kernel.compress)(
      &chaining_value,
      &words16_from_le_bytes_64(block),
      chunk_counter,
      BLOCK_LEN as u32,
      flags | start,
    ));
    blocks_compressed += 1;
  }

  let mut last_block = [0u8; BLOCK_LEN];
  last_block[..last_len].copy_from_slice(&input[full_bytes..]);
  let start = if blocks_compressed == 0 { CHUNK_START } else { 0 };

  NodeOutput {
    kernel,
    input_chaining_value: chaining_value,
    block_words: words16_from_le_bytes_64(&last_block),
    counter: chunk_counter,
    block_len: last_len as u32,
    flags: flags | start | CHUNK_END,
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tree hasher: CV stack and parent compression
// ─────────────────────────────────────────────────────────────────────────────

/// Fixed-capacity stack of subtree chaining values.
///
/// After `n` chunks have been committed, the stack holds exactly
/// `n.count_ones()` entries, one complete subtree per set bit of `n`, largest
/// at the bottom.
#[derive(Clone)]
struct CvStack {
  cvs: [[u32; 8]; CV_STACK_CAP],
  len: u8,
}

impl CvStack {
  #[inline]
  fn new() -> Self {
    Self {
      cvs: [[0u32; 8]; CV_STACK_CAP],
      len: 0,
    }
  }

  #[inline]
  fn height(&self) -> usize {
    self.len as usize
  }

  #[inline]
  fn push(&mut self, cv: [u32; 8]) {
    debug_assert!((self.len as usize) < CV_STACK_CAP);
    self.cvs[self.len as usize] = cv;
    self.len = self.len.wrapping_add(1);
  }

  #[inline]
  fn pop(&mut self) -> [u32; 8] {
    debug_assert!(self.len > 0);
    self.len = self.len.wrapping_sub(1);
    self.cvs[self.len as usize]
  }

  #[inline]
  fn get(&self, index: usize) -> [u32; 8] {
    debug_assert!(index < self.len as usize);
    self.cvs[index]
  }
}

#[inline]
fn parent_output(
  kernel: Kernel,
  left_child_cv: [u32; 8],
  right_child_cv: [u32; 8],
  key_words: [u32; 8],
  flags: u32,
) -> NodeOutput {
  let mut block_words = [0u32; 16];
  block_words[..8].copy_from_slice(&left_child_cv);
  block_words[8..].copy_from_slice(&right_child_cv);
  NodeOutput {
    kernel,
    input_chaining_value: key_words,
    block_words,
    counter: 0,
    block_len: BLOCK_LEN as u32,
    flags: PARENT | flags,
  }
}

/// Commit a chunk CV to the stack, merging completed subtrees.
///
/// `total_chunks` counts chunks consumed *including* this one. Its trailing
/// one bits are exactly the subtrees this chunk completes, so the merge
/// pattern matches a binary counter's carry propagation.
fn merge_chunk_cv(
  stack: &mut CvStack,
  kernel: Kernel,
  key_words: [u32; 8],
  flags: u32,
  mut cv: [u32; 8],
  mut total_chunks: u64,
) {
  debug_assert!(total_chunks > 0);
  while total_chunks & 1 == 0 {
    cv = (kernel.parent_cv)(stack.pop(), cv, key_words, flags);
    total_chunks >>= 1;
  }
  stack.push(cv);
}

// ─────────────────────────────────────────────────────────────────────────────
// One-shot root construction
// ─────────────────────────────────────────────────────────────────────────────

/// Build the root output for `input` in one pass, without streaming state.
///
/// Whole chunks go through the kernel's multi-chunk engine in
/// `simd_degree`-sized batches. When the input ends on a chunk boundary, the
/// final full chunk is held back as the root parent's right child rather than
/// committed to the stack: a multi-chunk root is always a parent node.
fn root_output_oneshot(kernel: Kernel, key_words: [u32; 8], flags: u32, input: &[u8]) -> NodeOutput {
  if input.len() <= CHUNK_LEN {
    return single_chunk_output(kernel, key_words, 0, flags, input);
  }

  let full_chunks = input.len() / CHUNK_LEN;
  let remainder = input.len() % CHUNK_LEN;

  let mut stack = CvStack::new();
  let mut out_buf = [0u8; OUT_LEN * MAX_SIMD_DEGREE];
  let mut last_full_chunk_cv = None;

  let mut chunk_index = 0usize;
  while chunk_index < full_chunks {
    let batch = min(full_chunks - chunk_index, min(kernel.simd_degree, MAX_SIMD_DEGREE));
    debug_assert!(batch != 0);

    // SAFETY: `chunk_index + batch <= full_chunks`, so the input pointer stays
    // in bounds for `batch` whole chunks; `out_buf` holds `MAX_SIMD_DEGREE`
    // CVs; the kernel was selected only with its CPU features present.
    unsafe {
      (kernel.hash_many_contiguous)(
        input.as_ptr().add(chunk_index * CHUNK_LEN),
        batch,
        &key_words,
        chunk_index as u64,
        flags,
        out_buf.as_mut_ptr(),
      );
    }

    let (cv_bytes, _) = out_buf.as_chunks::<OUT_LEN>();
    for (i, bytes) in cv_bytes.iter().take(batch).enumerate() {
      let cv = words8_from_le_bytes_32(bytes);
      let index = chunk_index + i;
      if remainder == 0 && index + 1 == full_chunks {
        last_full_chunk_cv = Some(cv);
      } else {
        merge_chunk_cv(&mut stack, kernel, key_words, flags, cv, (index + 1) as u64);
      }
    }

    chunk_index += batch;
  }

  let right_cv = if remainder != 0 {
    single_chunk_output(kernel, key_words, full_chunks as u64, flags, &input[full_chunks * CHUNK_LEN..])
      .chaining_value()
  } else {
    match last_full_chunk_cv {
      Some(cv) => cv,
      // `input.len() > CHUNK_LEN` with no remainder means >= 2 full chunks.
      None => unreachable!("missing final full chunk cv"),
    }
  };

  let mut remaining = stack.height();
  debug_assert!(remaining > 0);
  remaining -= 1;
  let mut output = parent_output(kernel, stack.get(remaining), right_cv, key_words, flags);
  while remaining > 0 {
    remaining -= 1;
    output = parent_output(kernel, stack.get(remaining), output.chaining_value(), key_words, flags);
  }
  output
}

#[inline]
fn digest_oneshot_words(kernel: Kernel, key_words: [u32; 8], flags: u32, input: &[u8]) -> [u32; 8] {
  root_output_oneshot(kernel, key_words, flags, input).root_hash_words()
}

#[inline]
fn digest_oneshot(kernel: Kernel, key_words: [u32; 8], flags: u32, input: &[u8]) -> [u8; OUT_LEN] {
  words8_to_le_bytes(&digest_oneshot_words(kernel, key_words, flags, input))
}

// ─────────────────────────────────────────────────────────────────────────────
// Streaming hasher
// ─────────────────────────────────────────────────────────────────────────────

/// A BLAKE3 hasher.
///
/// Construct with [`Digest::new`] (plain hash), [`Blake3::new_keyed`] (keyed
/// hash), or [`Blake3::new_derive_key`] (key derivation), absorb bytes with
/// [`Digest::update`] or [`Blake3::try_update`], and produce output with
/// [`Digest::finalize`] (32 bytes), [`Blake3::finalize_xof`], or the checked
/// [`Blake3::finalize_into`] / [`Blake3::finalize_bytes`].
#[derive(Clone)]
pub struct Blake3 {
  kernel: Kernel,
  chunk_state: ChunkState,
  /// CV of a full chunk hashed at an update boundary. It may still turn out
  /// to be the hash's final chunk, so it is committed to the tree only when
  /// more input arrives; at finalize time it becomes the root parent's right
  /// child instead (a multi-chunk root is always a parent node).
  pending_chunk_cv: Option<[u32; 8]>,
  key_words: [u32; 8],
  cv_stack: CvStack,
  flags: u32,
  finalized: bool,
}

impl Default for Blake3 {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

impl Blake3 {
  /// Key length in bytes for the keyed hash mode.
  pub const KEY_LEN: usize = KEY_LEN;
  /// Upper bound on the output length of a single checked finalize call.
  ///
  /// Longer outputs remain reachable by repeated [`Xof::squeeze`] on the
  /// stream from [`Blake3::finalize_xof`].
  pub const MAX_OUTPUT_LEN: usize = 1 << 30;
  /// Default digest length in bytes.
  pub const OUT_LEN: usize = OUT_LEN;

  /// Compute the hash of `data` in one shot.
  ///
  /// This selects the best available kernel for the current platform and
  /// input length (cached after first use).
  #[inline]
  #[must_use]
  pub fn digest(data: &[u8]) -> [u8; OUT_LEN] {
    dispatch::digest(data)
  }

  /// Compute the XOF output state of `data` in one shot.
  #[inline]
  #[must_use]
  pub fn xof(data: &[u8]) -> Blake3Xof {
    dispatch::xof(data)
  }

  /// Compute the keyed hash of `data` in one shot.
  #[inline]
  #[must_use]
  pub fn keyed_digest(key: &[u8; KEY_LEN], data: &[u8]) -> [u8; OUT_LEN] {
    let key_words = words8_from_le_bytes_32(key);
    let kernel = dispatch::kernel_dispatch().select(data.len());
    digest_oneshot(kernel, key_words, KEYED_HASH, data)
  }

  /// Compute the keyed XOF output state of `data` in one shot.
  #[inline]
  #[must_use]
  pub fn keyed_xof(key: &[u8; KEY_LEN], data: &[u8]) -> Blake3Xof {
    let key_words = words8_from_le_bytes_32(key);
    let kernel = dispatch::kernel_dispatch().select(data.len());
    Blake3Xof::new(root_output_oneshot(kernel, key_words, KEYED_HASH, data))
  }

  /// Compute the derived key for `key_material` under `context`, in one shot.
  #[inline]
  #[must_use]
  pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; OUT_LEN] {
    let context_key_words = derive_context_key_words(context);
    let kernel = dispatch::kernel_dispatch().select(key_material.len());
    words8_to_le_bytes(&digest_oneshot_words(
      kernel,
      context_key_words,
      DERIVE_KEY_MATERIAL,
      key_material,
    ))
  }

  /// Construct a new hasher for the keyed hash function.
  #[must_use]
  #[inline]
  pub fn new_keyed(key: &[u8; KEY_LEN]) -> Self {
    Self::new_internal(words8_from_le_bytes_32(key), KEYED_HASH)
  }

  /// Construct a new keyed hasher from a runtime-length key.
  ///
  /// # Errors
  ///
  /// Returns [`HashError::InvalidKeyLength`] unless `key` is exactly 32 bytes.
  pub fn new_keyed_from_slice(key: &[u8]) -> Result<Self, HashError> {
    let key: &[u8; KEY_LEN] = key.try_into().map_err(|_| HashError::InvalidKeyLength {
      expected: KEY_LEN,
      actual: key.len(),
    })?;
    Ok(Self::new_keyed(key))
  }

  /// Construct a new hasher for the key derivation function.
  ///
  /// The context string is hashed under `DERIVE_KEY_CONTEXT`; the resulting
  /// chaining value keys the material hasher.
  #[must_use]
  #[inline]
  pub fn new_derive_key(context: &str) -> Self {
    Self::new_internal(derive_context_key_words(context), DERIVE_KEY_MATERIAL)
  }

  #[inline]
  fn new_internal(key_words: [u32; 8], flags: u32) -> Self {
    Self::new_internal_with(key_words, flags, dispatch::streaming_kernel())
  }

  #[inline]
  fn new_internal_with(key_words: [u32; 8], flags: u32, kernel: Kernel) -> Self {
    Self {
      kernel,
      chunk_state: ChunkState::new(key_words, 0, flags, kernel),
      pending_chunk_cv: None,
      key_words,
      cv_stack: CvStack::new(),
      flags,
      finalized: false,
    }
  }

  /// Test/bench hook: build a hasher pinned to a specific kernel.
  #[cfg(feature = "std")]
  #[must_use]
  pub(crate) fn with_kernel_id(id: kernels::KernelId) -> Self {
    Self::new_internal_with(IV, 0, kernels::kernel(id))
  }

  /// Test/bench hook: repin an existing hasher (any mode) to a kernel.
  #[cfg(feature = "std")]
  pub(crate) fn force_kernel_id(&mut self, id: kernels::KernelId) {
    let kernel = kernels::kernel(id);
    self.kernel = kernel;
    self.chunk_state.kernel = kernel;
  }

  #[inline]
  fn merge_chunk_cv(&mut self, cv: [u32; 8], total_chunks: u64) {
    merge_chunk_cv(&mut self.cv_stack, self.kernel, self.key_words, self.flags, cv, total_chunks);
  }

  fn absorb(&mut self, mut input: &[u8]) {
    if input.is_empty() {
      return;
    }

    // A chunk CV parked at an update boundary stops being terminal as soon as
    // more input arrives.
    if let Some(cv) = self.pending_chunk_cv.take() {
      let total_chunks = self.chunk_state.chunk_counter;
      self.merge_chunk_cv(cv, total_chunks);
    }

    let mut out_buf = [0u8; OUT_LEN * MAX_SIMD_DEGREE];

    while !input.is_empty() {
      // A chunk completed by an earlier iteration (or update) rolls into the
      // tree before new bytes start the next chunk.
      if self.chunk_state.len() == CHUNK_LEN {
        let chunk_cv = self.chunk_state.output().chaining_value();
        let total_chunks = self.chunk_state.chunk_counter + 1;
        self.merge_chunk_cv(chunk_cv, total_chunks);
        self.chunk_state = ChunkState::new(self.key_words, total_chunks, self.flags, self.kernel);
      }

      // Bulk path: chunk-aligned with more than one whole chunk available.
      // `input.len() > CHUNK_LEN` proves every chunk in the batch except a
      // boundary-terminal one is not the hash's last chunk.
      if self.chunk_state.len() == 0 && self.kernel.simd_degree > 1 && input.len() > CHUNK_LEN {
        let full_chunks = input.len() / CHUNK_LEN;
        let batch = min(full_chunks, min(self.kernel.simd_degree, MAX_SIMD_DEGREE));
        let base_counter = self.chunk_state.chunk_counter;

        // SAFETY: `input` holds at least `batch * CHUNK_LEN` bytes, `out_buf`
        // holds `MAX_SIMD_DEGREE` CVs, and this kernel was selected only with
        // its required CPU features present.
        unsafe {
          (self.kernel.hash_many_contiguous)(
            input.as_ptr(),
            batch,
            &self.key_words,
            base_counter,
            self.flags,
            out_buf.as_mut_ptr(),
          );
        }

        let park_last = batch == full_chunks && input.len() == batch * CHUNK_LEN;
        let commit = if park_last { batch - 1 } else { batch };

        let (cv_bytes, _) = out_buf.as_chunks::<OUT_LEN>();
        for (i, bytes) in cv_bytes.iter().take(commit).enumerate() {
          let cv = words8_from_le_bytes_32(bytes);
          self.merge_chunk_cv(cv, base_counter + i as u64 + 1);
        }

        self.chunk_state = ChunkState::new(self.key_words, base_counter + batch as u64, self.flags, self.kernel);
        if park_last {
          self.pending_chunk_cv = Some(words8_from_le_bytes_32(&cv_bytes[batch - 1]));
        }
        input = &input[batch * CHUNK_LEN..];
        continue;
      }

      let want = CHUNK_LEN - self.chunk_state.len();
      let take = min(want, input.len());
      self.chunk_state.update(&input[..take]);
      input = &input[take..];
    }
  }

  fn root_output(&self) -> NodeOutput {
    let mut remaining = self.cv_stack.height();
    let mut output = if let Some(right_cv) = self.pending_chunk_cv {
      debug_assert!(remaining > 0, "a parked full chunk implies at least two chunks");
      remaining -= 1;
      parent_output(
        self.kernel,
        self.cv_stack.get(remaining),
        right_cv,
        self.key_words,
        self.flags,
      )
    } else {
      self.chunk_state.output()
    };

    while remaining > 0 {
      remaining -= 1;
      output = parent_output(
        self.kernel,
        self.cv_stack.get(remaining),
        output.chaining_value(),
        self.key_words,
        self.flags,
      );
    }
    output
  }

  /// Absorb bytes, rejecting use after finalization.
  ///
  /// # Errors
  ///
  /// Returns [`HashError::InvalidState`] if a checked finalize ran without an
  /// intervening [`Digest::reset`].
  pub fn try_update(&mut self, input: &[u8]) -> Result<(), HashError> {
    if self.finalized {
      return Err(HashError::InvalidState);
    }
    self.absorb(input);
    Ok(())
  }

  /// Finalize into `out`, filling it from the start of the XOF stream.
  ///
  /// Marks the hasher finalized; further [`Blake3::try_update`] calls fail
  /// until [`Digest::reset`].
  ///
  /// # Errors
  ///
  /// Returns [`HashError::InvalidOutputLength`] if `out` is longer than
  /// [`Blake3::MAX_OUTPUT_LEN`].
  pub fn finalize_into(&mut self, out: &mut [u8]) -> Result<(), HashError> {
    if out.len() > Self::MAX_OUTPUT_LEN {
      return Err(HashError::InvalidOutputLength {
        requested: out.len(),
        max: Self::MAX_OUTPUT_LEN,
      });
    }
    let mut xof = Blake3Xof::new(self.root_output());
    xof.squeeze(out);
    self.finalized = true;
    Ok(())
  }

  /// Finalize to `out_len` bytes of XOF output.
  ///
  /// Marks the hasher finalized; further [`Blake3::try_update`] calls fail
  /// until [`Digest::reset`].
  ///
  /// # Errors
  ///
  /// Returns [`HashError::InvalidOutputLength`] if `out_len` exceeds
  /// [`Blake3::MAX_OUTPUT_LEN`].
  #[cfg(feature = "alloc")]
  pub fn finalize_bytes(&mut self, out_len: usize) -> Result<alloc::vec::Vec<u8>, HashError> {
    if out_len > Self::MAX_OUTPUT_LEN {
      return Err(HashError::InvalidOutputLength {
        requested: out_len,
        max: Self::MAX_OUTPUT_LEN,
      });
    }
    let mut out = alloc::vec![0u8; out_len];
    let mut xof = Blake3Xof::new(self.root_output());
    xof.squeeze(&mut out);
    self.finalized = true;
    Ok(out)
  }

  /// Finalize into an extendable output state (XOF).
  #[must_use]
  #[inline]
  pub fn finalize_xof(&self) -> Blake3Xof {
    Blake3Xof::new(self.root_output())
  }
}

/// Hash a derive-key context string down to the material hasher's key words.
fn derive_context_key_words(context: &str) -> [u32; 8] {
  let context_bytes = context.as_bytes();
  let kernel = dispatch::kernel_dispatch().select(context_bytes.len());
  digest_oneshot_words(kernel, IV, DERIVE_KEY_CONTEXT, context_bytes)
}

impl Digest for Blake3 {
  const OUTPUT_SIZE: usize = OUT_LEN;
  type Output = [u8; OUT_LEN];

  #[inline]
  fn new() -> Self {
    Self::new_internal(IV, 0)
  }

  #[inline]
  fn update(&mut self, input: &[u8]) {
    debug_assert!(!self.finalized, "update after finalize; see try_update");
    self.absorb(input);
  }

  #[inline]
  fn finalize(&self) -> Self::Output {
    self.root_output().root_hash_bytes()
  }

  #[inline]
  fn reset(&mut self) {
    *self = Self::new_internal(self.key_words, self.flags);
  }
}

impl Drop for Blake3 {
  fn drop(&mut self) {
    self.key_words.zeroize();
    self.chunk_state.chaining_value.zeroize();
    self.chunk_state.block.zeroize();
    let height = self.cv_stack.height();
    for cv in &mut self.cv_stack.cvs[..height] {
      cv.zeroize();
    }
    if let Some(cv) = self.pending_chunk_cv.as_mut() {
      cv.zeroize();
    }
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// XOF stream
// ─────────────────────────────────────────────────────────────────────────────

/// BLAKE3 extendable output stream.
///
/// Yields the root's XOF keystream 64 bytes per block, with the output block
/// counter starting at 0. The counter wraps at 2^64 blocks; the function is
/// unspecified in that range.
#[derive(Clone)]
pub struct Blake3Xof {
  output: NodeOutput,
  block_counter: u64,
  buf: [u8; OUTPUT_BLOCK_LEN],
  buf_pos: usize,
}

impl Blake3Xof {
  #[inline]
  fn new(output: NodeOutput) -> Self {
    Self {
      output,
      block_counter: 0,
      buf: [0u8; OUTPUT_BLOCK_LEN],
      buf_pos: OUTPUT_BLOCK_LEN,
    }
  }

  #[inline]
  fn refill(&mut self) {
    let counter = self.block_counter;
    self.output.write_root_blocks(counter, &mut self.buf);
    self.block_counter = counter.wrapping_add(1);
    self.buf_pos = 0;
  }
}

impl Xof for Blake3Xof {
  fn squeeze(&mut self, mut out: &mut [u8]) {
    if out.is_empty() {
      return;
    }

    // Drain any buffered bytes first.
    if self.buf_pos != self.buf.len() {
      let take = min(self.buf.len() - self.buf_pos, out.len());
      out[..take].copy_from_slice(&self.buf[self.buf_pos..self.buf_pos + take]);
      self.buf_pos += take;
      out = &mut out[take..];
      if out.is_empty() {
        return;
      }
    }

    // Whole output blocks go directly into the caller buffer, letting the
    // kernel pick its widest batch size.
    let full = out.len() / OUTPUT_BLOCK_LEN * OUTPUT_BLOCK_LEN;
    if full != 0 {
      let blocks = (full / OUTPUT_BLOCK_LEN) as u64;
      self.output.write_root_blocks(self.block_counter, &mut out[..full]);
      self.block_counter = self.block_counter.wrapping_add(blocks);
      out = &mut out[full..];
    }

    // Tail: refill once and copy the remaining bytes.
    if !out.is_empty() {
      self.refill();
      let take = out.len();
      out.copy_from_slice(&self.buf[..take]);
      self.buf_pos = take;
    }
  }
}

impl Drop for Blake3Xof {
  fn drop(&mut self) {
    self.output.input_chaining_value.zeroize();
    self.output.block_words.zeroize();
    self.buf.zeroize();
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  extern crate alloc;

  use alloc::vec::Vec;

  use traits::{Digest, Xof};

  use super::{Blake3, CHUNK_LEN, OUT_LEN};

  const KEY: &[u8; 32] = b"whats the Elvish word for friend";
  const CONTEXT: &str = "BLAKE3 2019-12-27 16:29:52 test vectors context";

  fn hex_to_bytes(hex: &str, out: &mut [u8]) {
    assert_eq!(hex.len(), out.len() * 2);
    for (i, pair) in hex.as_bytes().chunks_exact(2).enumerate() {
      let hi = (pair[0] as char).to_digit(16).unwrap();
      let lo = (pair[1] as char).to_digit(16).unwrap();
      out[i] = ((hi << 4) | lo) as u8;
    }
  }

  fn digest32(hex: &str) -> [u8; OUT_LEN] {
    let mut out = [0u8; OUT_LEN];
    hex_to_bytes(hex, &mut out);
    out
  }

  fn input_pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
  }

  #[test]
  fn canonical_vector_len0() {
    let mut h = Blake3::new();
    h.update(&input_pattern(0));
    assert_eq!(
      h.finalize(),
      digest32("af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262")
    );
  }

  #[test]
  fn canonical_vector_abc() {
    assert_eq!(
      Blake3::digest(b"abc"),
      digest32("6437b3ac38465133ffb63b75273a8db548c558465d79db03fd359c6cd5bd9d85")
    );
  }

  #[test]
  fn canonical_vector_len3() {
    let mut h = Blake3::new();
    h.update(&input_pattern(3));
    assert_eq!(
      h.finalize(),
      digest32("e1be4d7a8ab5560aa4199eaca8a9b4a73a087fa3c30ed28aa3f9bddd3c09db3d")
    );
  }

  #[test]
  fn canonical_vector_one_chunk() {
    let mut h = Blake3::new();
    h.update(&input_pattern(1024));
    assert_eq!(
      h.finalize(),
      digest32("42214739f095a406f3fc83deb889744ac00df831c10daa55189b5d121c855af7")
    );
  }

  #[test]
  fn canonical_vector_two_chunks() {
    let mut h = Blake3::new();
    h.update(&input_pattern(2048));
    assert_eq!(
      h.finalize(),
      digest32("e776b6028c7cd22a4d0ba182a8bf62205d2ef576467e838ed6f2529b85fba24a")
    );
  }

  #[test]
  fn canonical_vector_four_chunks() {
    let mut h = Blake3::new();
    h.update(&input_pattern(4096));
    assert_eq!(
      h.finalize(),
      digest32("015094013f57a5277b59d8475c0501042c0b642e531b0a1c8f58d2163229e969")
    );
  }

  #[test]
  fn canonical_vector_len0_xof_prefix() {
    let expected_hex = "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262e00f03e7b69af26b7faaf09fcd333050338ddfe085b8cc869ca98b206c08243a26f5487789e8f660afe6c99ef9e0c52b92e7393024a80459cf91f476f9ffdbda7001c22e159b402631f277ca96f2defdf1078282314e763699a31c5363165421cce14d";
    let mut expected = [0u8; 131];
    hex_to_bytes(expected_hex, &mut expected);

    let mut xof = Blake3::new().finalize_xof();
    let mut out = [0u8; 131];
    xof.squeeze(&mut out);
    assert_eq!(out, expected);
  }

  #[test]
  fn canonical_vector_len0_keyed_and_derive() {
    let mut keyed = Blake3::new_keyed(KEY);
    keyed.update(&input_pattern(0));
    assert_eq!(
      keyed.finalize(),
      digest32("92b2b75604ed3c761f9d6f62392c8a9227ad0ea3f09573e783f1498a4ed60d26")
    );

    let mut dk = Blake3::new_derive_key(CONTEXT);
    dk.update(&input_pattern(0));
    assert_eq!(
      dk.finalize(),
      digest32("2cc39783c223154fea8dfb7c1b1660f2ac2dcbd1c1de8277b0b0dd39b7e50d7d")
    );
  }

  #[test]
  fn cv_stack_height_is_popcount_of_committed_chunks() {
    for n in [1usize, 2, 3, 4, 5, 7, 8, 9, 15, 16, 17, 31, 33, 63, 64, 65] {
      let mut h = Blake3::new();
      h.update(&input_pattern(n * CHUNK_LEN));
      // Push one byte so the n-th chunk is provably non-terminal and commits.
      h.update(&[0u8]);
      assert_eq!(
        h.cv_stack.height(),
        n.count_ones() as usize,
        "stack height after {n} committed chunks"
      );
      assert!(h.pending_chunk_cv.is_none());
      assert_eq!(h.chunk_state.len(), 1);
    }
  }

  #[test]
  fn chunk_boundary_update_parks_final_chunk() {
    let mut h = Blake3::new();
    h.update(&input_pattern(2 * CHUNK_LEN));
    // Whether the last chunk is parked or buffered depends on the kernel's
    // SIMD degree, but a committed-chunks count of 1 does not.
    let committed = h.cv_stack.height();
    assert_eq!(committed, 1);
    assert_eq!(
      h.finalize(),
      digest32("e776b6028c7cd22a4d0ba182a8bf62205d2ef576467e838ed6f2529b85fba24a")
    );
  }

  #[test]
  fn reset_replays_to_the_same_digest() {
    let data = input_pattern(3000);
    let mut h = Blake3::new_keyed(KEY);
    h.update(&data);
    let first = h.finalize();

    h.reset();
    h.update(&data);
    assert_eq!(h.finalize(), first);
  }

  #[test]
  fn finalize_is_idempotent_and_nondestructive() {
    let mut h = Blake3::new();
    h.update(&input_pattern(1025));
    assert_eq!(h.finalize(), h.finalize());
  }
}
