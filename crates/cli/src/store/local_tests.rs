#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use crate::digest::Digest;
use tempfile::tempdir;

fn digest(byte: u8) -> Digest {
    Digest::from_bytes([byte; 20])
}

/// A digest sharing `digest(shard_byte)`'s shard (its first byte) but
/// distinct from it, for tests that need two keys landing in one shard.
fn digest_same_shard(shard_byte: u8, tail_byte: u8) -> Digest {
    let mut bytes = [tail_byte; 20];
    bytes[0] = shard_byte;
    Digest::from_bytes(bytes)
}

#[test]
fn new_creates_cachedir_tag() {
    let dir = tempdir().unwrap();
    let storage = LocalStorage::new(dir.path(), 1000, 1_000_000).unwrap();
    assert!(dir.path().join("CACHEDIR.TAG").exists());
    drop(storage);
}

#[test]
fn put_then_get_round_trips_payload() {
    let dir = tempdir().unwrap();
    let storage = LocalStorage::new(dir.path(), 1000, 1_000_000).unwrap();
    let mut counters = Counters::new();
    let key = digest(1);
    storage
        .put(&key, EntryType::Result, "ns", b"hello".to_vec(), true, &mut counters)
        .unwrap();

    let got = storage.get(&key, EntryType::Result).unwrap();
    assert_eq!(got, Some(b"hello".to_vec()));
}

#[test]
fn get_on_missing_key_is_none() {
    let dir = tempdir().unwrap();
    let storage = LocalStorage::new(dir.path(), 1000, 1_000_000).unwrap();
    assert_eq!(storage.get(&digest(2), EntryType::Result).unwrap(), None);
}

#[test]
fn put_without_overwrite_is_noop_on_existing_key() {
    let dir = tempdir().unwrap();
    let storage = LocalStorage::new(dir.path(), 1000, 1_000_000).unwrap();
    let mut counters = Counters::new();
    let key = digest(3);
    let first = storage
        .put(&key, EntryType::Result, "ns", b"a".to_vec(), true, &mut counters)
        .unwrap();
    let second = storage
        .put(&key, EntryType::Result, "ns", b"b".to_vec(), false, &mut counters)
        .unwrap();
    assert!(first);
    assert!(!second);
    assert_eq!(
        storage.get(&key, EntryType::Result).unwrap(),
        Some(b"a".to_vec())
    );
}

#[test]
fn corrupt_entry_is_treated_as_miss_and_removed() {
    let dir = tempdir().unwrap();
    let storage = LocalStorage::new(dir.path(), 1000, 1_000_000).unwrap();
    let mut counters = Counters::new();
    let key = digest(4);
    storage
        .put(&key, EntryType::Result, "ns", b"hello".to_vec(), true, &mut counters)
        .unwrap();

    let path = storage.entry_path(&key, EntryType::Result);
    let mut bytes = fs::read(&path).unwrap();
    bytes[0] = b'X';
    fs::write(&path, &bytes).unwrap();

    assert_eq!(storage.get(&key, EntryType::Result).unwrap(), None);
    assert!(!path.exists());
}

#[test]
fn manifest_and_result_keys_do_not_collide_on_disk() {
    let dir = tempdir().unwrap();
    let storage = LocalStorage::new(dir.path(), 1000, 1_000_000).unwrap();
    let mut counters = Counters::new();
    let key = digest(5);
    storage
        .put(&key, EntryType::Manifest, "ns", b"manifest".to_vec(), true, &mut counters)
        .unwrap();
    storage
        .put(&key, EntryType::Result, "ns", b"result".to_vec(), true, &mut counters)
        .unwrap();

    assert_eq!(
        storage.get(&key, EntryType::Manifest).unwrap(),
        Some(b"manifest".to_vec())
    );
    assert_eq!(
        storage.get(&key, EntryType::Result).unwrap(),
        Some(b"result".to_vec())
    );
}

#[test]
fn cleanup_shard_removes_oldest_files_past_threshold() {
    let dir = tempdir().unwrap();
    // max_files/16 == 1, so a second file in the shard triggers cleanup.
    let storage = LocalStorage::new(dir.path(), 16, 1_000_000_000).unwrap();
    let mut counters = Counters::new();
    let key_a = digest_same_shard(0xaa, 0x01);
    let key_b = digest_same_shard(0xaa, 0x02);
    storage
        .put(&key_a, EntryType::Result, "ns", vec![1; 100], true, &mut counters)
        .unwrap();
    std::thread::sleep(std::time::Duration::from_millis(10));
    storage
        .put(&key_b, EntryType::Result, "ns", vec![2; 100], true, &mut counters)
        .unwrap();

    let shard = key_a.shard();
    assert_eq!(shard, key_b.shard());
    let mut shard_counters = storage.read_stats(&shard);
    let removed = storage.cleanup_shard(&shard, &mut shard_counters).unwrap();
    assert_eq!(removed, 1);
}

#[test]
fn wipe_all_removes_every_shard() {
    let dir = tempdir().unwrap();
    let storage = LocalStorage::new(dir.path(), 1000, 1_000_000).unwrap();
    let mut counters = Counters::new();
    storage
        .put(&digest(6), EntryType::Result, "ns", vec![1], true, &mut counters)
        .unwrap();
    storage.wipe_all().unwrap();
    assert!(storage.shards().unwrap().is_empty());
}

#[test]
fn zero_all_stats_resets_every_shard_but_keeps_entries() {
    let dir = tempdir().unwrap();
    let storage = LocalStorage::new(dir.path(), 1000, 1_000_000).unwrap();
    let mut counters = Counters::new();
    let key = digest(7);
    storage
        .put(&key, EntryType::Result, "ns", b"hello".to_vec(), true, &mut counters)
        .unwrap();
    assert!(storage.read_stats(&key.shard()).get(StatCounter::FilesInCache) > 0);

    storage.zero_all_stats(555).unwrap();

    assert_eq!(storage.read_stats(&key.shard()).get(StatCounter::FilesInCache), 0);
    assert_eq!(storage.read_stats(&key.shard()).zeroed_at_unix_secs, 555);
    assert_eq!(storage.get(&key, EntryType::Result).unwrap(), Some(b"hello".to_vec()));
}

#[test]
fn inspect_reports_entry_type_mismatch_as_absent() {
    let dir = tempdir().unwrap();
    let storage = LocalStorage::new(dir.path(), 1000, 1_000_000).unwrap();
    let mut counters = Counters::new();
    let key = digest(8);
    storage
        .put(&key, EntryType::Result, "ns", b"payload".to_vec(), true, &mut counters)
        .unwrap();

    let found = storage.inspect(&key, EntryType::Result).unwrap().unwrap();
    assert_eq!(found.payload, b"payload");
    assert!(storage.inspect(&key, EntryType::Manifest).unwrap().is_none());
    assert!(storage.inspect(&digest(9), EntryType::Result).unwrap().is_none());
}

#[test]
fn evict_by_age_removes_only_entries_past_the_threshold() {
    let dir = tempdir().unwrap();
    let storage = LocalStorage::new(dir.path(), 1000, 1_000_000).unwrap();
    let mut counters = Counters::new();
    let old_key = digest(10);
    storage
        .put(&old_key, EntryType::Result, "ns", vec![1], true, &mut counters)
        .unwrap();
    let old_path = storage.entry_path(&old_key, EntryType::Result);
    let ancient = std::time::SystemTime::now() - std::time::Duration::from_secs(10_000);
    filetime_touch(&old_path, ancient);

    let fresh_key = digest(11);
    storage
        .put(&fresh_key, EntryType::Result, "ns", vec![2], true, &mut counters)
        .unwrap();

    let removed = storage.evict(Some(1000), None).unwrap();
    assert_eq!(removed, 1);
    assert_eq!(storage.get(&old_key, EntryType::Result).unwrap(), None);
    assert_eq!(storage.get(&fresh_key, EntryType::Result).unwrap(), Some(vec![2]));
}

#[test]
fn recompress_rewrites_entries_to_the_target_level() {
    let dir = tempdir().unwrap();
    let storage = LocalStorage::new(dir.path(), 1000, 1_000_000).unwrap();
    let mut counters = Counters::new();
    let key = digest(12);
    storage
        .put(&key, EntryType::Result, "ns", vec![3; 64], true, &mut counters)
        .unwrap();

    let rewritten = storage.recompress(9, 1).unwrap();
    assert_eq!(rewritten, 1);

    let envelope = storage.inspect(&key, EntryType::Result).unwrap().unwrap();
    assert_eq!(envelope.compression_level, 9);
    assert_eq!(storage.get(&key, EntryType::Result).unwrap(), Some(vec![3; 64]));

    // A second pass at the same level has nothing left to rewrite.
    assert_eq!(storage.recompress(9, 1).unwrap(), 0);
}

/// Backdate a file's mtime so `evict`'s age comparison sees it as old,
/// without adding a dependency for what `utimensat` already does for
/// `materialize.rs`.
fn filetime_touch(path: &Path, when: std::time::SystemTime) {
    let secs = when
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    let spec = nix::sys::time::TimeSpec::new(secs, 0);
    nix::sys::stat::utimensat(
        None,
        path,
        &spec,
        &spec,
        nix::sys::stat::UtimensatFlags::FollowSymlink,
    )
    .unwrap();
}
