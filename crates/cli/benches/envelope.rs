//! Benchmarks for the cache entry envelope's encode/decode round trip
//! (spec §4.5 "Cache entry envelope"), across payload sizes and
//! compression levels.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use ccforge::envelope::{EntryType, Envelope};

fn payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

fn bench_encode_by_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope_encode_by_size");

    for size in [1_024, 64 * 1024, 4 * 1024 * 1024] {
        let envelope = Envelope::new(EntryType::Result, "default".to_string(), payload(size));
        group.bench_with_input(BenchmarkId::new("encode", size), &envelope, |b, envelope| {
            b.iter(|| black_box(envelope.encode().unwrap()))
        });
    }

    group.finish();
}

fn bench_decode_by_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope_decode_by_size");

    for size in [1_024, 64 * 1024, 4 * 1024 * 1024] {
        let envelope = Envelope::new(EntryType::Result, "default".to_string(), payload(size));
        let encoded = envelope.encode().unwrap();
        group.bench_with_input(BenchmarkId::new("decode", size), &encoded, |b, encoded| {
            b.iter(|| black_box(Envelope::decode(encoded).unwrap()))
        });
    }

    group.finish();
}

fn bench_encode_by_compression_level(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope_encode_by_compression_level");
    let body = payload(512 * 1024);

    for level in [1, 9, 19] {
        let mut envelope = Envelope::new(EntryType::Result, "default".to_string(), body.clone());
        envelope.compression_level = level;
        group.bench_with_input(BenchmarkId::new("level", level), &envelope, |b, envelope| {
            b.iter(|| black_box(envelope.encode().unwrap()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_encode_by_size,
    bench_decode_by_size,
    bench_encode_by_compression_level,
);
criterion_main!(benches);
