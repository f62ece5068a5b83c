//! Canonical BLAKE3 vectors and boundary-length checks.
//!
//! The canonical test-vector input is the byte pattern `i % 251`. A handful of
//! digests are pinned as hex; the official `blake3` crate serves as the oracle
//! for the full boundary-length sweep.

use hashes::{Digest, Xof, crypto::Blake3};

fn input_pattern(len: usize) -> Vec<u8> {
  (0..len).map(|i| (i % 251) as u8).collect()
}

fn hex_digest(hex: &str) -> [u8; 32] {
  let mut out = [0u8; 32];
  assert_eq!(hex.len(), 64);
  for (i, pair) in hex.as_bytes().chunks_exact(2).enumerate() {
    let hi = (pair[0] as char).to_digit(16).unwrap();
    let lo = (pair[1] as char).to_digit(16).unwrap();
    out[i] = ((hi << 4) | lo) as u8;
  }
  out
}

#[test]
fn pinned_canonical_digests() {
  let cases: &[(usize, &str)] = &[
    (0, "AF1349B9F5F9A1A6A0404DEA36DCC9499BCB25C9ADC112B7CC9A93CAE41F3262"),
    (3, "E1BE4D7A8AB5560AA4199EACA8A9B4A73A087FA3C30ED28AA3F9BDDD3C09DB3D"),
    (1024, "42214739F095A406F3FC83DEB889744AC00DF831C10DAA55189B5D121C855AF7"),
    (2048, "E776B6028C7CD22A4D0BA182A8BF62205D2EF576467E838ED6F2529B85FBA24A"),
    (4096, "015094013F57A5277B59D8475C0501042C0B642E531B0A1C8F58D2163229E969"),
  ];

  for &(len, hex) in cases {
    let expected = hex_digest(&hex.to_lowercase());
    assert_eq!(Blake3::digest(&input_pattern(len)), expected, "one-shot len={len}");

    let mut h = Blake3::new();
    h.update(&input_pattern(len));
    assert_eq!(h.finalize(), expected, "streaming len={len}");
  }
}

#[test]
fn pinned_ascii_abc_digest() {
  let expected = hex_digest("6437b3ac38465133ffb63b75273a8db548c558465d79db03fd359c6cd5bd9d85");
  assert_eq!(Blake3::digest(b"abc"), expected);
}

#[test]
fn boundary_lengths_match_official_crate() {
  const KEY: &[u8; 32] = b"whats the Elvish word for friend";
  const CONTEXT: &str = "BLAKE3 2019-12-27 16:29:52 test vectors context";

  let lens = [
    0usize, 1, 63, 64, 65, 1023, 1024, 1025, 2047, 2048, 2049, 4095, 4096, 4097, 16384, 16385, 65536, 65537,
  ];

  for &len in &lens {
    let msg = input_pattern(len);

    assert_eq!(
      Blake3::digest(&msg),
      *blake3::hash(&msg).as_bytes(),
      "hash mismatch len={len}"
    );

    assert_eq!(
      Blake3::keyed_digest(KEY, &msg),
      *blake3::keyed_hash(KEY, &msg).as_bytes(),
      "keyed mismatch len={len}"
    );

    assert_eq!(
      Blake3::derive_key(CONTEXT, &msg),
      blake3::derive_key(CONTEXT, &msg),
      "derive mismatch len={len}"
    );

    // Streaming across an awkward split size must agree with one-shot.
    let mut h = Blake3::new();
    for part in msg.chunks(997) {
      h.update(part);
    }
    assert_eq!(h.finalize(), *blake3::hash(&msg).as_bytes(), "streaming mismatch len={len}");
  }
}

#[test]
fn xof_long_outputs_match_official_crate() {
  for &len in &[0usize, 3, 1024, 1025, 5000] {
    let msg = input_pattern(len);

    let mut expected = vec![0u8; 2080];
    let mut oracle = blake3::Hasher::new();
    oracle.update(&msg);
    oracle.finalize_xof().fill(&mut expected);

    let mut h = Blake3::new();
    h.update(&msg);
    let mut xof = h.finalize_xof();
    let mut ours = vec![0u8; expected.len()];
    xof.squeeze(&mut ours);

    assert_eq!(ours, expected, "xof mismatch len={len}");
  }
}

#[test]
fn xof_prefix_is_the_digest() {
  for &out_len in &[32usize, 33, 64, 100, 1 << 12, 1 << 20] {
    let msg = input_pattern(2049);

    let mut h = Blake3::new();
    h.update(&msg);
    let digest = h.finalize();

    let mut xof = h.finalize_xof();
    let mut out = vec![0u8; out_len];
    xof.squeeze(&mut out);

    assert_eq!(&out[..32], &digest[..], "prefix mismatch out_len={out_len}");
  }
}

#[test]
fn keyed_and_derive_xof_match_official_crate() {
  const KEY: &[u8; 32] = b"whats the Elvish word for friend";
  let msg = input_pattern(1337);

  let mut expected = vec![0u8; 301];
  let mut oracle = blake3::Hasher::new_keyed(KEY);
  oracle.update(&msg);
  oracle.finalize_xof().fill(&mut expected);

  let mut xof = Blake3::keyed_xof(KEY, &msg);
  let mut ours = vec![0u8; expected.len()];
  xof.squeeze(&mut ours);
  assert_eq!(ours, expected);
}
