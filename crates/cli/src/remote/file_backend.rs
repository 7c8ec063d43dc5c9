//! A `file://` remote backend: a second filesystem directory tree, used
//! for the file-to-file reshare/fallback scenarios in spec §8 (scenarios
//! 5 and 6 both configure `remote_storage = file://...`).
//!
//! Reuses the same content-addressed layout as local storage, but flat
//! (no sharding) since remote directories are expected to be small
//! mirrors, not the primary cache.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use percent_encoding::percent_decode_str;

use crate::digest::Digest;
use crate::remote::backend::{BackendFailure, BackendResult, RemoteBackend};

pub struct FileBackend {
    root: PathBuf,
    request_timeout: Duration,
}

/// Turn a `file://` URL into a filesystem path, percent-decoding the
/// path component (a `file://` URL may encode spaces and other
/// reserved characters as `%XX`).
pub fn path_from_file_url(url: &str) -> Option<PathBuf> {
    let rest = url.strip_prefix("file://")?;
    let decoded = percent_decode_str(rest).decode_utf8().ok()?;
    Some(PathBuf::from(decoded.into_owned()))
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>, request_timeout: Duration) -> Self {
        Self {
            root: root.into(),
            request_timeout,
        }
    }

    fn entry_path(&self, key: &Digest) -> PathBuf {
        self.root.join(key.format_base16())
    }

    fn check_deadline(&self, started: Instant) -> BackendResult<()> {
        if started.elapsed() > self.request_timeout {
            return Err(BackendFailure::Timeout {
                millis: self.request_timeout.as_millis() as u64,
            });
        }
        Ok(())
    }
}

impl RemoteBackend for FileBackend {
    fn get(&self, key: &Digest) -> BackendResult<Option<Vec<u8>>> {
        let started = Instant::now();
        let path = self.entry_path(key);
        self.check_deadline(started)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BackendFailure::Error(e.to_string())),
        }
    }

    fn put(&self, key: &Digest, value: &[u8], overwrite: bool) -> BackendResult<bool> {
        let started = Instant::now();
        let path = self.entry_path(key);
        if !overwrite && path.exists() {
            return Ok(false);
        }
        fs::create_dir_all(&self.root).map_err(|e| BackendFailure::Error(e.to_string()))?;
        self.check_deadline(started)?;
        let tmp = self.root.join(format!("{}.tmp", key.format_base16()));
        fs::write(&tmp, value).map_err(|e| BackendFailure::Error(e.to_string()))?;
        fs::rename(&tmp, &path).map_err(|e| BackendFailure::Error(e.to_string()))?;
        Ok(true)
    }

    fn remove(&self, key: &Digest) -> BackendResult<bool> {
        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(BackendFailure::Error(e.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "file_backend_tests.rs"]
mod tests;
