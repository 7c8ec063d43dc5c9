#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use tempfile::tempdir;

#[test]
fn same_content_hashes_identically() {
    let tmp = tempdir().unwrap();
    let a = tmp.path().join("a.h");
    let b = tmp.path().join("b.h");
    std::fs::write(&a, b"int foo(void);\n").unwrap();
    std::fs::write(&b, b"int foo(void);\n").unwrap();

    let ha = hash_file(&a, None).unwrap();
    let hb = hash_file(&b, None).unwrap();
    assert_eq!(ha.digest, hb.digest);
}

#[test]
fn different_content_hashes_differently() {
    let tmp = tempdir().unwrap();
    let a = tmp.path().join("a.h");
    std::fs::write(&a, b"int foo(void);\n").unwrap();
    let ha = hash_file(&a, None).unwrap();

    std::fs::write(&a, b"int bar(void);\n").unwrap();
    let ha2 = hash_file(&a, None).unwrap();
    assert_ne!(ha.digest, ha2.digest);
}

#[test]
fn detects_date_macro() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("version.h");
    std::fs::write(&path, b"const char *build = __DATE__;\n").unwrap();
    let result = hash_file(&path, None).unwrap();
    assert!(result.flags.contains(TemporalFlags::CONTAINS_DATE));
    assert!(!result.flags.contains(TemporalFlags::CONTAINS_TIME));
}

#[test]
fn detects_timestamp_macro_split_across_a_chunk_boundary() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("version.h");
    // Pad past one chunk boundary so "__TIMESTAMP__" straddles it.
    let mut content = vec![b'x'; CHUNK_SIZE - 6];
    content.extend_from_slice(b"__TIMESTAMP__");
    std::fs::write(&path, &content).unwrap();

    let result = hash_file(&path, None).unwrap();
    assert!(result.flags.contains(TemporalFlags::CONTAINS_TIMESTAMP));
}

#[test]
fn no_temporal_macros_means_empty_flags() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("plain.h");
    std::fs::write(&path, b"int x;\n").unwrap();
    let result = hash_file(&path, None).unwrap();
    assert!(result.flags.is_empty());
}

#[test]
fn missing_file_is_bad_input_file() {
    let err = hash_file(Path::new("/does/not/exist.h"), None).unwrap_err();
    assert!(matches!(err, Error::BadInputFile { .. }));
}

#[test]
fn inode_cache_hit_avoids_rereading_unchanged_old_file() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("header.h");
    std::fs::write(&path, b"old enough to be cached\n").unwrap();

    // Give the file's timestamps time to clear min_age.
    std::thread::sleep(Duration::from_millis(2100));

    let cache = InodeCache::open(&tmp.path().join("inode-cache")).expect("tmpfs/ext4 should be accepted");
    let first = hash_file(&path, Some(&cache)).unwrap();
    let second = hash_file(&path, Some(&cache)).unwrap();
    assert_eq!(first.digest, second.digest);

    let (hits, _misses, _errors) = cache.stats();
    assert!(hits >= 1);
}
