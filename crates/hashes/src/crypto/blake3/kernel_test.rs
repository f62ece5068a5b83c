//! Cross-kernel agreement harness.
//!
//! Every kernel the host CPU supports must produce byte-identical output for
//! any input. The helpers here run a digest under each runnable kernel; the
//! unit tests additionally compare against the official `blake3` crate.

use alloc::vec::Vec;

use traits::Digest as _;

use super::{
  Blake3,
  kernels::{ALL, KernelId, required_caps},
};

#[derive(Clone, Debug)]
pub struct KernelResult {
  pub name: &'static str,
  pub digest: [u8; 32],
}

fn digest_with_kernel(id: KernelId, data: &[u8]) -> [u8; 32] {
  let mut h = Blake3::with_kernel_id(id);
  h.update(data);
  h.finalize()
}

/// Digest `data` under every kernel the running CPU supports.
#[must_use]
pub fn run_all_kernels(data: &[u8]) -> Vec<KernelResult> {
  let caps = platform::caps();
  let mut out = Vec::new();
  for &id in ALL {
    if caps.has(required_caps(id)) {
      out.push(KernelResult {
        name: id.as_str(),
        digest: digest_with_kernel(id, data),
      });
    }
  }
  out
}

/// Check that every runnable kernel agrees on `data`.
///
/// # Errors
///
/// Returns the mismatching kernel's name if any digest disagrees with the
/// first (portable) kernel's.
pub fn verify_kernels(data: &[u8]) -> Result<(), &'static str> {
  let results = run_all_kernels(data);
  let Some(first) = results.first() else {
    return Ok(());
  };
  for r in &results[1..] {
    if r.digest != first.digest {
      return Err(r.name);
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use alloc::{vec, vec::Vec};

  use traits::Xof as _;

  use super::*;
  use crate::crypto::blake3::kernels::kernel as kernel_for_id;

  const KEY: &[u8; 32] = b"whats the Elvish word for friend";
  const CONTEXT: &str = "BLAKE3 2019-12-27 16:29:52 test vectors context";

  fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
  }

  #[test]
  fn all_kernels_match_official_crate_and_streaming_splits() {
    let caps = platform::caps();
    let lens = [0usize, 1, 2, 3, 63, 64, 65, 1023, 1024, 1025, 2047, 2048, 2049, 10_000];

    for &id in ALL {
      if !caps.has(required_caps(id)) {
        continue;
      }

      for &len in &lens {
        let msg = pattern(len);

        let ours = digest_with_kernel(id, &msg);
        let expected = *blake3::hash(&msg).as_bytes();
        assert_eq!(ours, expected, "hash mismatch for kernel={}", id.as_str());

        for &chunk in &[1usize, 7, 31, 32, 63, 64, 65, 256, 1024, 4096] {
          let mut h = Blake3::with_kernel_id(id);
          for part in msg.chunks(chunk) {
            h.update(part);
          }
          assert_eq!(
            h.finalize(),
            ours,
            "streaming mismatch kernel={} len={} chunk={}",
            id.as_str(),
            len,
            chunk
          );
        }

        // Keyed hash mode.
        {
          let mut h = Blake3::new_keyed(KEY);
          h.force_kernel_id(id);
          for part in msg.chunks(63) {
            h.update(part);
          }
          let expected = *blake3::keyed_hash(KEY, &msg).as_bytes();
          assert_eq!(h.finalize(), expected, "keyed mismatch kernel={}", id.as_str());
        }

        // Derive-key mode.
        {
          let mut h = Blake3::new_derive_key(CONTEXT);
          h.force_kernel_id(id);
          for part in msg.chunks(65) {
            h.update(part);
          }
          let expected = {
            let mut hh = blake3::Hasher::new_derive_key(CONTEXT);
            hh.update(&msg);
            *hh.finalize().as_bytes()
          };
          assert_eq!(h.finalize(), expected, "derive mismatch kernel={}", id.as_str());
        }
      }
    }
  }

  #[test]
  fn xof_prefix_matches_official_crate() {
    let caps = platform::caps();
    let data = pattern(1234);

    for &id in ALL {
      if !caps.has(required_caps(id)) {
        continue;
      }

      let mut ours = [0u8; 131];
      {
        let mut h = Blake3::with_kernel_id(id);
        h.update(&data);
        let mut xof = h.finalize_xof();
        xof.squeeze(&mut ours);
      }

      let mut expected = [0u8; 131];
      {
        let mut h = blake3::Hasher::new();
        h.update(&data);
        let mut out = h.finalize_xof();
        out.fill(&mut expected);
      }

      assert_eq!(ours, expected, "xof mismatch kernel={}", id.as_str());
    }
  }

  #[test]
  fn long_xof_streams_match_official_crate() {
    let caps = platform::caps();
    let data = pattern(3072);

    // Long enough to exercise the 8-way and 4-way XOF block generators plus
    // the scalar tail, across uneven squeeze splits.
    let mut expected = vec![0u8; 4096 + 17];
    {
      let mut h = blake3::Hasher::new();
      h.update(&data);
      h.finalize_xof().fill(&mut expected);
    }

    for &id in ALL {
      if !caps.has(required_caps(id)) {
        continue;
      }

      let mut ours = vec![0u8; expected.len()];
      let mut h = Blake3::with_kernel_id(id);
      h.update(&data);
      let mut xof = h.finalize_xof();
      let (head, rest) = ours.split_at_mut(97);
      let (mid, tail) = rest.split_at_mut(1024);
      xof.squeeze(head);
      xof.squeeze(mid);
      xof.squeeze(tail);

      assert_eq!(ours, expected, "long xof mismatch kernel={}", id.as_str());
    }
  }

  #[test]
  fn run_all_agree() {
    verify_kernels(b"abc").expect("kernels should agree");
    verify_kernels(&pattern(8192)).expect("kernels should agree");
  }

  /// The multi-chunk engines must agree with the portable engine bit-for-bit.
  #[test]
  fn hash_many_engines_agree() {
    use crate::crypto::blake3::{CHUNK_LEN, IV, OUT_LEN};

    let caps = platform::caps();

    for num_chunks in [1usize, 2, 3, 4, 5, 7, 8, 9, 15, 16, 17, 33] {
      let mut input = vec![0u8; num_chunks * CHUNK_LEN];
      for (chunk_idx, chunk) in input.chunks_mut(CHUNK_LEN).enumerate() {
        for (i, b) in chunk.iter_mut().enumerate() {
          *b = ((i % 251) as u8).wrapping_add(chunk_idx as u8);
        }
      }

      // Use a nonzero base counter so the per-lane counter vectors are
      // exercised away from zero.
      let base_counter = 5u64;

      let portable = kernel_for_id(KernelId::Portable);
      let mut reference = vec![0u8; num_chunks * OUT_LEN];
      // SAFETY: `input` holds `num_chunks` whole chunks and `reference` holds
      // `num_chunks` CVs.
      unsafe {
        (portable.hash_many_contiguous)(input.as_ptr(), num_chunks, &IV, base_counter, 0, reference.as_mut_ptr());
      }

      for &id in ALL {
        if id == KernelId::Portable || !caps.has(required_caps(id)) {
          continue;
        }

        let k = kernel_for_id(id);
        let mut out = vec![0u8; num_chunks * OUT_LEN];
        // SAFETY: same buffer guarantees as the portable call above.
        unsafe { (k.hash_many_contiguous)(input.as_ptr(), num_chunks, &IV, base_counter, 0, out.as_mut_ptr()) };

        assert_eq!(
          out,
          reference,
          "hash_many_contiguous mismatch: kernel={} num_chunks={}",
          id.as_str(),
          num_chunks
        );
      }
    }
  }
}
