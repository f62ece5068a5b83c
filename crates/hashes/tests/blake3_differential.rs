//! Randomized differential tests against the official `blake3` crate.

use hashes::{Digest as _, Xof as _, crypto::Blake3};
use proptest::prelude::*;

fn blake3_ref_hash(data: &[u8]) -> [u8; 32] {
  *blake3::hash(data).as_bytes()
}

proptest! {
  #[test]
  fn one_shot_matches_official(data in proptest::collection::vec(any::<u8>(), 0..8192)) {
    prop_assert_eq!(Blake3::digest(&data), blake3_ref_hash(&data));
  }

  #[test]
  fn streaming_matches_official(data in proptest::collection::vec(any::<u8>(), 0..8192)) {
    let expected = blake3_ref_hash(&data);

    // Update lengths derived from the data itself: every call sees an
    // arbitrary, data-dependent boundary.
    let mut h = Blake3::new();
    let mut i = 0usize;
    while i < data.len() {
      let step = (data[i] as usize % 2048) + 1;
      let end = core::cmp::min(data.len(), i + step);
      h.update(&data[i..end]);
      i = end;
    }

    prop_assert_eq!(h.finalize(), expected);
  }

  #[test]
  fn xof_matches_official(data in proptest::collection::vec(any::<u8>(), 0..4096), out_len in 0usize..2048) {
    let mut expected = vec![0u8; out_len];
    let mut ref_hasher = blake3::Hasher::new();
    ref_hasher.update(&data);
    ref_hasher.finalize_xof().fill(&mut expected);

    let mut h = Blake3::new();
    h.update(&data);
    let mut xof = h.finalize_xof();
    let mut actual = vec![0u8; out_len];
    xof.squeeze(&mut actual);

    prop_assert_eq!(actual, expected);
  }

  #[test]
  fn split_squeezes_match_one_squeeze(
    data in proptest::collection::vec(any::<u8>(), 0..4096),
    out_len in 1usize..1024,
    split_seed in any::<u16>(),
  ) {
    let mut h = Blake3::new();
    h.update(&data);

    let mut whole = vec![0u8; out_len];
    h.finalize_xof().squeeze(&mut whole);

    let split = split_seed as usize % (out_len + 1);
    let mut parts = vec![0u8; out_len];
    let mut xof = h.finalize_xof();
    xof.squeeze(&mut parts[..split]);
    xof.squeeze(&mut parts[split..]);

    prop_assert_eq!(parts, whole);
  }

  #[test]
  fn keyed_matches_official(
    data in proptest::collection::vec(any::<u8>(), 0..4096),
    key in any::<[u8; 32]>(),
  ) {
    let expected = *blake3::keyed_hash(&key, &data).as_bytes();
    let mut h = Blake3::new_keyed(&key);
    h.update(&data);
    prop_assert_eq!(h.finalize(), expected);
  }

  #[test]
  fn derive_key_matches_official(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
    const CONTEXT: &str = "treehash blake3 derive-key test context";

    let expected = blake3::derive_key(CONTEXT, &data);
    let mut h = Blake3::new_derive_key(CONTEXT);
    h.update(&data);
    prop_assert_eq!(h.finalize(), expected);
  }
}
