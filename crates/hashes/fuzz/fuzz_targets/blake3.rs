#![no_main]

use hashes::crypto::Blake3;
use libfuzzer_sys::fuzz_target;
use traits::{Digest as _, HashError, Xof as _};

const KEY_LEN: usize = 32;

/// Steering parameters pulled from the head of the input. The whole input is
/// still the message, so the corpus keeps exploring block and chunk
/// boundaries regardless of how the head mutates.
struct Plan {
  step_seed: usize,
  out_len: usize,
  split: usize,
  bad_key_len: usize,
  ctx_len: usize,
}

impl Plan {
  fn new(data: &[u8]) -> Self {
    let byte = |i: usize| data.get(i).copied().unwrap_or(0) as usize;
    let out_len = (byte(0) | (byte(1) << 8)) % 2049;
    Self {
      step_seed: byte(2),
      out_len,
      split: if out_len == 0 { 0 } else { byte(3) % (out_len + 1) },
      bad_key_len: byte(4) % 64,
      ctx_len: byte(5) % 65,
    }
  }
}

fuzz_target!(|data: &[u8]| {
  let plan = Plan::new(data);
  let expected = *blake3::hash(data).as_bytes();

  // One-shot plain hash.
  assert_eq!(Blake3::digest(data), expected);

  // Checked streaming lifecycle: data-dependent update splits through
  // `try_update`, then `finalize_into`, after which the hasher must refuse
  // further updates until reset.
  let mut h = Blake3::new();
  let mut offset = 0usize;
  while offset < data.len() {
    let step = (plan.step_seed + offset) % 1531 + 1;
    let end = data.len().min(offset + step);
    h.try_update(&data[offset..end]).unwrap();
    offset = end;
  }
  let mut digest = [0u8; 32];
  h.finalize_into(&mut digest).unwrap();
  assert_eq!(digest, expected);
  assert_eq!(h.try_update(data), Err(HashError::InvalidState));

  // The per-call output bound is enforced up front, on any hasher state.
  assert_eq!(
    h.finalize_bytes(Blake3::MAX_OUTPUT_LEN + 1),
    Err(HashError::InvalidOutputLength {
      requested: Blake3::MAX_OUTPUT_LEN + 1,
      max: Blake3::MAX_OUTPUT_LEN,
    })
  );

  // Reset-replay with an XOF-length finalize; prefix and stream must match
  // the oracle.
  h.reset();
  h.try_update(data).unwrap();
  let long = h.finalize_bytes(plan.out_len).unwrap();
  let mut oracle_long = vec![0u8; plan.out_len];
  {
    let mut oracle = blake3::Hasher::new();
    oracle.update(data);
    oracle.finalize_xof().fill(&mut oracle_long);
  }
  assert_eq!(long, oracle_long);

  // One-shot XOF with a split squeeze.
  let mut ours = vec![0u8; plan.out_len];
  let mut xof = Blake3::xof(data);
  xof.squeeze(&mut ours[..plan.split]);
  xof.squeeze(&mut ours[plan.split..]);
  assert_eq!(ours, oracle_long);

  // Keyed mode: the one-shot entry point, the checked slice constructor, and
  // checked streaming all agree with the oracle.
  let mut key = [0u8; KEY_LEN];
  for (i, b) in key.iter_mut().enumerate() {
    *b = data.get(i).copied().unwrap_or(i as u8);
  }
  let keyed_expected = *blake3::keyed_hash(&key, data).as_bytes();
  assert_eq!(Blake3::keyed_digest(&key, data), keyed_expected);

  let mut keyed = Blake3::new_keyed_from_slice(&key).unwrap();
  keyed.try_update(data).unwrap();
  let mut keyed_digest = [0u8; 32];
  keyed.finalize_into(&mut keyed_digest).unwrap();
  assert_eq!(keyed_digest, keyed_expected);

  // Wrong-length keys are rejected with the offending length.
  if plan.bad_key_len != KEY_LEN {
    let bad_key = [0u8; 64];
    assert_eq!(
      Blake3::new_keyed_from_slice(&bad_key[..plan.bad_key_len]).err(),
      Some(HashError::InvalidKeyLength {
        expected: KEY_LEN,
        actual: plan.bad_key_len,
      })
    );
  }

  // One-shot keyed XOF.
  let mut keyed_xof_ours = vec![0u8; plan.out_len];
  Blake3::keyed_xof(&key, data).squeeze(&mut keyed_xof_ours);
  let mut keyed_xof_oracle = vec![0u8; plan.out_len];
  {
    let mut oracle = blake3::Hasher::new_keyed(&key);
    oracle.update(data);
    oracle.finalize_xof().fill(&mut keyed_xof_oracle);
  }
  assert_eq!(keyed_xof_ours, keyed_xof_oracle);

  // Derive-key mode: the one-shot entry point and checked streaming (ASCII
  // context to guarantee a valid `&str`).
  let ctx_src = data.get(KEY_LEN..).unwrap_or(&[]);
  let ctx_len = plan.ctx_len.min(ctx_src.len());
  let mut context = String::with_capacity(ctx_len);
  for &b in &ctx_src[..ctx_len] {
    context.push((b'a' + (b % 26)) as char);
  }
  let derive_expected = blake3::derive_key(&context, data);
  assert_eq!(Blake3::derive_key(&context, data), derive_expected);

  let mut deriver = Blake3::new_derive_key(&context);
  deriver.try_update(data).unwrap();
  let mut derived = [0u8; 32];
  deriver.finalize_into(&mut derived).unwrap();
  assert_eq!(derived, derive_expected);
});
