//! Checked-lifecycle and API-misuse behavior.

use hashes::{Digest, HashError, crypto::Blake3};

fn input_pattern(len: usize) -> Vec<u8> {
  (0..len).map(|i| (i % 251) as u8).collect()
}

#[test]
fn update_after_finalize_is_rejected_until_reset() {
  let mut h = Blake3::new();
  h.try_update(b"some input").unwrap();

  let mut out = [0u8; 32];
  h.finalize_into(&mut out).unwrap();

  assert_eq!(h.try_update(b"more"), Err(HashError::InvalidState));
  // The digest is unchanged by the failed update.
  let mut again = [0u8; 32];
  let mut copy = Blake3::new();
  copy.try_update(b"some input").unwrap();
  copy.finalize_into(&mut again).unwrap();
  assert_eq!(out, again);

  h.reset();
  assert_eq!(h.try_update(b"more"), Ok(()));
}

#[test]
fn reset_preserves_key_and_mode() {
  const KEY: &[u8; 32] = &[7u8; 32];
  let data = input_pattern(4097);

  let mut h = Blake3::new_keyed(KEY);
  h.try_update(&data).unwrap();
  let first = h.finalize_bytes(32).unwrap();

  h.reset();
  h.try_update(&data).unwrap();
  let second = h.finalize_bytes(32).unwrap();

  assert_eq!(first, second);
  assert_eq!(&first[..], &blake3::keyed_hash(KEY, &data).as_bytes()[..]);
}

#[test]
fn keyed_construction_rejects_wrong_key_lengths() {
  for len in [0usize, 1, 31, 33, 64] {
    let key = vec![0u8; len];
    assert_eq!(
      Blake3::new_keyed_from_slice(&key).err(),
      Some(HashError::InvalidKeyLength { expected: 32, actual: len })
    );
  }

  let key = [0x42u8; 32];
  let h = Blake3::new_keyed_from_slice(&key).unwrap();
  assert_eq!(h.finalize(), Blake3::new_keyed(&key).finalize());
}

#[test]
fn oversized_output_requests_are_rejected() {
  let mut h = Blake3::new();
  h.try_update(b"x").unwrap();

  let requested = Blake3::MAX_OUTPUT_LEN + 1;
  assert_eq!(
    h.finalize_bytes(requested),
    Err(HashError::InvalidOutputLength {
      requested,
      max: Blake3::MAX_OUTPUT_LEN,
    })
  );

  // A failed finalize does not poison the hasher.
  assert_eq!(h.try_update(b"y"), Ok(()));
}

#[test]
fn finalize_zero_bytes_is_empty() {
  let mut h = Blake3::new();
  assert_eq!(h.finalize_bytes(0).unwrap(), Vec::<u8>::new());
}

#[test]
fn finalize_bytes_prefix_is_the_digest() {
  let data = input_pattern(70_000);

  for out_len in [32usize, 47, 64, 1 << 16, 1 << 20] {
    let mut h = Blake3::new();
    h.try_update(&data).unwrap();
    let long = h.finalize_bytes(out_len).unwrap();

    h.reset();
    h.try_update(&data).unwrap();
    let short = h.finalize_bytes(32).unwrap();

    assert_eq!(&long[..32], &short[..], "out_len={out_len}");
  }
}

#[test]
fn update_granularity_does_not_change_the_digest() {
  let data = input_pattern(70_001);
  let expected = Blake3::digest(&data);

  for split in [1usize, 32, 63, 64, 65, 1023, 1024, 1025, 4096, 16 * 1024 + 1] {
    let mut h = Blake3::new();
    for part in data.chunks(split) {
      h.update(part);
    }
    assert_eq!(h.finalize(), expected, "split={split}");
  }

  // Irregular splits that straddle chunk boundaries in different places.
  let mut h = Blake3::new();
  let mut offset = 0usize;
  for (i, step) in [1usize, 1023, 1, 1024, 2048, 511, 513].iter().cycle().enumerate() {
    if offset >= data.len() {
      break;
    }
    let end = usize::min(data.len(), offset + step + (i % 3));
    h.update(&data[offset..end]);
    offset = end;
  }
  h.update(&data[offset.min(data.len())..]);
  assert_eq!(h.finalize(), expected);
}

#[test]
fn empty_updates_are_no_ops() {
  let mut h = Blake3::new();
  h.update(&[]);
  h.update(b"abc");
  h.update(&[]);
  assert_eq!(h.finalize(), Blake3::digest(b"abc"));
}

#[test]
fn vectored_update_matches_contiguous() {
  let data = input_pattern(5000);
  let (a, rest) = data.split_at(1);
  let (b, c) = rest.split_at(2047);

  let mut h = Blake3::new();
  h.update_vectored(&[a, b, c]);
  assert_eq!(h.finalize(), Blake3::digest(&data));
}

#[test]
fn clones_are_independent() {
  let mut h = Blake3::new();
  h.update(&input_pattern(1500));

  let mut fork = h.clone();
  fork.update(b"tail");
  h.update(b"tail");

  assert_eq!(h.finalize(), fork.finalize());
}
