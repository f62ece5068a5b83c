//! BLAKE3 benchmarks.
//!
//! One-shot and streaming throughput, compared against the official `blake3`
//! crate, plus XOF output generation.

use core::{hint::black_box, time::Duration};

use criterion::{BenchmarkId, Criterion, SamplingMode, Throughput, criterion_group, criterion_main};
use hashes::{Digest as _, Xof as _, crypto::Blake3};

fn pseudo_random_bytes(len: usize, mut state: u64) -> Vec<u8> {
  let mut out = Vec::with_capacity(len);
  while out.len() < len {
    state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    out.extend_from_slice(&state.to_le_bytes());
  }
  out.truncate(len);
  out
}

fn oneshot_comparison(c: &mut Criterion) {
  let mut group = c.benchmark_group("blake3/oneshot");
  group.sample_size(40);
  group.warm_up_time(Duration::from_secs(2));
  group.measurement_time(Duration::from_secs(4));
  group.sampling_mode(SamplingMode::Flat);

  for len in [64usize, 256, 1024, 4096, 16 * 1024, 64 * 1024, 1024 * 1024] {
    let data = pseudo_random_bytes(len, 0xB1A3_0001 ^ len as u64);
    group.throughput(Throughput::Bytes(len as u64));

    group.bench_with_input(BenchmarkId::new("treehash", len), &data, |b, d| {
      b.iter(|| black_box(Blake3::digest(black_box(d))))
    });

    group.bench_with_input(BenchmarkId::new("official", len), &data, |b, d| {
      b.iter(|| black_box(*blake3::hash(black_box(d)).as_bytes()))
    });
  }

  group.finish();
}

fn streaming_update_sizes(c: &mut Criterion) {
  let data = black_box(pseudo_random_bytes(1024 * 1024, 0xB1A3_0002));

  let mut group = c.benchmark_group("blake3/streaming");
  group.sample_size(30);
  group.warm_up_time(Duration::from_secs(2));
  group.measurement_time(Duration::from_secs(4));
  group.sampling_mode(SamplingMode::Flat);
  group.throughput(Throughput::Bytes(data.len() as u64));

  for chunk_size in [64usize, 256, 1024, 4096, 16 * 1024, 64 * 1024] {
    group.bench_function(format!("treehash/{chunk_size}B-updates"), |b| {
      b.iter(|| {
        let mut h = Blake3::new();
        for chunk in data.chunks(chunk_size) {
          h.update(chunk);
        }
        black_box(h.finalize())
      })
    });

    group.bench_function(format!("official/{chunk_size}B-updates"), |b| {
      b.iter(|| {
        let mut h = blake3::Hasher::new();
        for chunk in data.chunks(chunk_size) {
          h.update(chunk);
        }
        black_box(*h.finalize().as_bytes())
      })
    });
  }

  group.finish();
}

fn xof_output(c: &mut Criterion) {
  let data = black_box(pseudo_random_bytes(4096, 0xB1A3_0003));

  let mut group = c.benchmark_group("blake3/xof");
  group.sample_size(40);
  group.warm_up_time(Duration::from_secs(2));
  group.measurement_time(Duration::from_secs(4));

  for out_len in [64usize, 1024, 64 * 1024] {
    group.throughput(Throughput::Bytes(out_len as u64));

    group.bench_function(format!("treehash/{out_len}B"), |b| {
      let mut out = vec![0u8; out_len];
      b.iter(|| {
        let mut h = Blake3::new();
        h.update(&data);
        let mut xof = h.finalize_xof();
        xof.squeeze(&mut out);
        black_box(out.last().copied())
      })
    });

    group.bench_function(format!("official/{out_len}B"), |b| {
      let mut out = vec![0u8; out_len];
      b.iter(|| {
        let mut h = blake3::Hasher::new();
        h.update(&data);
        h.finalize_xof().fill(&mut out);
        black_box(out.last().copied())
      })
    });
  }

  group.finish();
}

criterion_group!(benches, oneshot_comparison, streaming_update_sizes, xof_output);
criterion_main!(benches);
