#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use tempfile::tempdir;

fn digest(byte: u8) -> Digest {
    Digest::from_bytes([byte; 20])
}

#[test]
fn put_then_get_round_trips() {
    let dir = tempdir().unwrap();
    let backend = FileBackend::new(dir.path(), Duration::from_secs(5));
    let key = digest(1);
    assert!(backend.put(&key, b"payload", true).unwrap());
    assert_eq!(backend.get(&key).unwrap(), Some(b"payload".to_vec()));
}

#[test]
fn get_missing_key_is_none() {
    let dir = tempdir().unwrap();
    let backend = FileBackend::new(dir.path(), Duration::from_secs(5));
    assert_eq!(backend.get(&digest(2)).unwrap(), None);
}

#[test]
fn put_without_overwrite_is_noop_on_existing_key() {
    let dir = tempdir().unwrap();
    let backend = FileBackend::new(dir.path(), Duration::from_secs(5));
    let key = digest(3);
    assert!(backend.put(&key, b"first", true).unwrap());
    assert!(!backend.put(&key, b"second", false).unwrap());
    assert_eq!(backend.get(&key).unwrap(), Some(b"first".to_vec()));
}

#[test]
fn remove_reports_whether_key_existed() {
    let dir = tempdir().unwrap();
    let backend = FileBackend::new(dir.path(), Duration::from_secs(5));
    let key = digest(4);
    backend.put(&key, b"x", true).unwrap();
    assert!(backend.remove(&key).unwrap());
    assert!(!backend.remove(&key).unwrap());
}

#[test]
fn file_url_strips_scheme() {
    let path = path_from_file_url("file:///var/cache/remote").unwrap();
    assert_eq!(path, PathBuf::from("/var/cache/remote"));
}

#[test]
fn file_url_decodes_percent_escapes() {
    let path = path_from_file_url("file:///var/cache/shared%20cache").unwrap();
    assert_eq!(path, PathBuf::from("/var/cache/shared cache"));
}

#[test]
fn non_file_url_is_rejected() {
    assert!(path_from_file_url("https://example.com/cache").is_none());
}
