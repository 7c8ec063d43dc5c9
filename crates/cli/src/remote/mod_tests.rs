#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use crate::remote::backend::{BackendFailure, BackendResult};
use tempfile::tempdir;

fn digest(byte: u8) -> Digest {
    Digest::from_bytes([byte; 20])
}

struct AlwaysFails;

impl RemoteBackend for AlwaysFails {
    fn get(&self, _key: &Digest) -> BackendResult<Option<Vec<u8>>> {
        Err(BackendFailure::Error("boom".to_string()))
    }
    fn put(&self, _key: &Digest, _value: &[u8], _overwrite: bool) -> BackendResult<bool> {
        Err(BackendFailure::Error("boom".to_string()))
    }
    fn remove(&self, _key: &Digest) -> BackendResult<bool> {
        Err(BackendFailure::Error("boom".to_string()))
    }
}

#[test]
fn put_writes_through_to_a_file_backend() {
    let dir = tempdir().unwrap();
    let mut orchestrator = RemoteOrchestrator::new(false, false);
    orchestrator
        .add_entry(
            RemoteEntry {
                url: format!("file://{}", dir.path().display()),
                ..RemoteEntry::default()
            },
            |url| {
                let path = url.strip_prefix("file://")?;
                Some(Box::new(file_backend::FileBackend::new(
                    path,
                    std::time::Duration::from_secs(5),
                )) as Box<dyn RemoteBackend>)
            },
        )
        .unwrap();

    let mut counters = Counters::new();
    let key = digest(1);
    orchestrator.put(&key, b"payload", true, &mut counters);
    let got = orchestrator.get(&key, &mut counters);
    assert_eq!(got, Some(b"payload".to_vec()));
    assert_eq!(counters.get(StatCounter::RemoteCacheHit), 1);
}

#[test]
fn failing_backend_is_isolated_after_first_error_and_others_still_work() {
    let dir = tempdir().unwrap();
    let mut orchestrator = RemoteOrchestrator::new(false, false);

    // "Bad" entry: always fails.
    orchestrator
        .add_entry(
            RemoteEntry {
                url: "fail://whatever".to_string(),
                ..RemoteEntry::default()
            },
            |_| Some(Box::new(AlwaysFails) as Box<dyn RemoteBackend>),
        )
        .unwrap();

    // "Good" entry: a real file backend.
    orchestrator
        .add_entry(
            RemoteEntry {
                url: format!("file://{}", dir.path().display()),
                ..RemoteEntry::default()
            },
            |url| {
                let path = url.strip_prefix("file://")?;
                Some(Box::new(file_backend::FileBackend::new(
                    path,
                    std::time::Duration::from_secs(5),
                )) as Box<dyn RemoteBackend>)
            },
        )
        .unwrap();

    let mut counters = Counters::new();
    let key = digest(2);
    orchestrator.put(&key, b"payload", true, &mut counters);

    assert_eq!(counters.get(StatCounter::RemoteStorageError), 1);
    let got = orchestrator.get(&key, &mut counters);
    assert_eq!(got, Some(b"payload".to_vec()));

    // Second call should not re-contact the failed backend.
    orchestrator.put(&key, b"payload2", true, &mut counters);
    assert_eq!(counters.get(StatCounter::RemoteStorageError), 1);
}

#[test]
fn read_only_entry_skips_puts() {
    let dir = tempdir().unwrap();
    let mut orchestrator = RemoteOrchestrator::new(false, false);
    orchestrator
        .add_entry(
            RemoteEntry {
                url: format!("file://{}", dir.path().display()),
                read_only: true,
                ..RemoteEntry::default()
            },
            |url| {
                let path = url.strip_prefix("file://")?;
                Some(Box::new(file_backend::FileBackend::new(
                    path,
                    std::time::Duration::from_secs(5),
                )) as Box<dyn RemoteBackend>)
            },
        )
        .unwrap();

    let mut counters = Counters::new();
    let key = digest(3);
    orchestrator.put(&key, b"payload", true, &mut counters);
    assert_eq!(orchestrator.get(&key, &mut counters), None);
}
