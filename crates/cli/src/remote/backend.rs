//! The remote backend contract (spec §4.7 "Backend interface").
//!
//! Every backend — whether a simple filesystem mirror or a future
//! network-backed helper — implements this trait. `get`/`put`/`remove`
//! return `Ok(Err(BackendFailure))` (not a hard `Err`) to let the
//! orchestrator distinguish operational failures (to isolate) from
//! programmer errors.

use crate::digest::Digest;

/// A recoverable backend-operation failure: either an outright error or
/// a timeout. The orchestrator isolates the shard-backend on either.
#[derive(Debug, Clone)]
pub enum BackendFailure {
    Error(String),
    Timeout { millis: u64 },
}

pub type BackendResult<T> = Result<T, BackendFailure>;

pub trait RemoteBackend: Send + Sync {
    fn get(&self, key: &Digest) -> BackendResult<Option<Vec<u8>>>;

    /// `overwrite=false` on an existing key must be a strict no-op,
    /// returning `Ok(false)`.
    fn put(&self, key: &Digest, value: &[u8], overwrite: bool) -> BackendResult<bool>;

    fn remove(&self, key: &Digest) -> BackendResult<bool>;

    /// Best-effort shutdown for long-lived helper processes. The default
    /// no-op suits stateless backends like the file backend.
    fn stop(&self) {}
}
