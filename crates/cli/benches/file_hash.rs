//! Benchmarks for content hashing (spec §4.3 "Hashing a file").
//!
//! Measures the streaming blake3 + temporal-macro scan over a range of
//! file sizes, with and without an inode cache hit short-circuiting the
//! read entirely.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tempfile::tempdir;

use ccforge::hash::file_hash::hash_file;
use ccforge::inode_cache::InodeCache;

fn bench_hash_file_by_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_file_by_size");
    let dir = tempdir().unwrap();

    for lines in [100, 10_000, 200_000] {
        let content: String = (0..lines)
            .map(|i| format!("int line_{i}(void) {{ return {i}; }}\n"))
            .collect();
        let path = dir.path().join(format!("src_{lines}.c"));
        std::fs::write(&path, &content).unwrap();

        group.bench_with_input(
            BenchmarkId::new("no_inode_cache", lines),
            &path,
            |b, path| b.iter(|| black_box(hash_file(path, None).unwrap())),
        );
    }

    group.finish();
}

fn bench_hash_file_with_inode_cache_hit(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let cache_path = dir.path().join("inode-cache");
    let cache = InodeCache::open(&cache_path).unwrap();

    let path = dir.path().join("warm.c");
    std::fs::write(&path, "int x;\n".repeat(5000)).unwrap();
    hash_file(&path, Some(&cache)).unwrap(); // warm the cache

    c.bench_function("hash_file_with_inode_cache_hit", |b| {
        b.iter(|| black_box(hash_file(&path, Some(&cache)).unwrap()))
    });
}

fn bench_hash_file_temporal_macro_scan(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dated.h");
    let mut content = String::new();
    for i in 0..50_000 {
        content.push_str(&format!("const char *s_{i} = \"value\";\n"));
    }
    content.push_str("const char *built = __DATE__ \" \" __TIME__;\n");
    std::fs::write(&path, &content).unwrap();

    c.bench_function("hash_file_temporal_macro_scan", |b| {
        b.iter(|| black_box(hash_file(&path, None).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_hash_file_by_size,
    bench_hash_file_with_inode_cache_hit,
    bench_hash_file_temporal_macro_scan,
);
criterion_main!(benches);
