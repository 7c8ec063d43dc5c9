//! Remote storage orchestrator (spec §4.7, component I).
//!
//! Fans a `get`/`put`/`remove` out to whichever backend the weighted
//! rendezvous hash selects for each configured entry, isolating any
//! shard-backend that errors or times out for the rest of the
//! invocation.

pub mod backend;
pub mod config;
pub mod file_backend;
pub mod rendezvous;

use std::collections::HashSet;
use std::sync::Mutex;

use crate::digest::Digest;
use crate::error::Error;
use crate::store::stats::{Counters, StatCounter};

pub use backend::{BackendFailure, RemoteBackend};
pub use config::RemoteEntry;

/// One configured entry bound to a live backend per shard.
struct BoundEntry {
    config: RemoteEntry,
    backends: Vec<(rendezvous::Shard, Box<dyn RemoteBackend>)>,
}

/// Orchestrates one or more remote entries, tracking failed
/// shard-backends for the lifetime of one invocation.
pub struct RemoteOrchestrator {
    entries: Vec<BoundEntry>,
    failed: Mutex<HashSet<String>>,
    pub reshare: bool,
    pub remote_only: bool,
}

impl RemoteOrchestrator {
    pub fn new(reshare: bool, remote_only: bool) -> Self {
        Self {
            entries: Vec::new(),
            failed: Mutex::new(HashSet::new()),
            reshare,
            remote_only,
        }
    }

    /// Register an entry with its backend per shard. `make_backend` lets
    /// callers plug in the right [`RemoteBackend`] implementation per URL
    /// scheme (only `file://` is built in; see
    /// [`file_backend::FileBackend`]).
    pub fn add_entry(
        &mut self,
        config: RemoteEntry,
        make_backend: impl Fn(&str) -> Option<Box<dyn RemoteBackend>>,
    ) -> crate::error::Result<()> {
        let shards = if config.shards.is_empty() {
            vec![rendezvous::Shard {
                name: String::new(),
                weight: 1.0,
            }]
        } else {
            config.shards.clone()
        };

        let mut backends = Vec::new();
        for shard in shards {
            let url = if shard.name.is_empty() {
                config.url.clone()
            } else {
                config::expand_shard_url(&config.url, &shard.name)?
            };
            let Some(backend) = make_backend(&url) else {
                return Err(Error::Config {
                    message: format!("remote_storage: unsupported url scheme in {url:?}"),
                    path: None,
                });
            };
            backends.push((shard, backend));
        }

        self.entries.push(BoundEntry { config, backends });
        Ok(())
    }

    fn shard_key(entry_index: usize, shard_name: &str) -> String {
        format!("{entry_index}:{shard_name}")
    }

    fn is_failed(&self, key: &str) -> bool {
        self.failed.lock().expect("failed-set lock poisoned").contains(key)
    }

    fn mark_failed(&self, key: String) {
        self.failed.lock().expect("failed-set lock poisoned").insert(key);
    }

    /// Select the backend for `key` within one entry via weighted
    /// rendezvous hashing, skipping any shard already marked failed this
    /// invocation.
    fn select<'a>(
        &self,
        entry_index: usize,
        entry: &'a BoundEntry,
        key: &Digest,
    ) -> Option<&'a (rendezvous::Shard, Box<dyn RemoteBackend>)> {
        let shards: Vec<_> = entry
            .backends
            .iter()
            .map(|(shard, _)| shard.clone())
            .collect();
        let picked = rendezvous::select_shard(key.as_bytes(), &shards)?;
        let sk = Self::shard_key(entry_index, &picked.name);
        if self.is_failed(&sk) {
            return None;
        }
        entry.backends.iter().find(|(shard, _)| shard.name == picked.name)
    }

    pub fn get(&self, key: &Digest, counters: &mut Counters) -> Option<Vec<u8>> {
        for (entry_index, entry) in self.entries.iter().enumerate() {
            let Some((shard, backend)) = self.select(entry_index, entry, key) else {
                continue;
            };
            match backend.get(key) {
                Ok(Some(bytes)) => {
                    counters.increment(StatCounter::RemoteCacheHit);
                    return Some(bytes);
                }
                Ok(None) => {
                    counters.increment(StatCounter::RemoteCacheMiss);
                }
                Err(failure) => {
                    self.record_failure(entry_index, shard, &failure, counters);
                }
            }
        }
        None
    }

    /// Put to every entry's selected shard. If `reshare` drove this call
    /// on a local hit, `overwrite` should be `false` (spec §4.7
    /// "Policies").
    pub fn put(&self, key: &Digest, value: &[u8], overwrite: bool, counters: &mut Counters) {
        for (entry_index, entry) in self.entries.iter().enumerate() {
            if entry.config.read_only {
                continue;
            }
            let Some((shard, backend)) = self.select(entry_index, entry, key) else {
                continue;
            };
            match backend.put(key, value, overwrite) {
                Ok(_) => counters.increment(StatCounter::RemoteStorageWrite),
                Err(failure) => self.record_failure(entry_index, shard, &failure, counters),
            }
        }
    }

    pub fn remove(&self, key: &Digest, counters: &mut Counters) {
        for (entry_index, entry) in self.entries.iter().enumerate() {
            if entry.config.read_only {
                continue;
            }
            let Some((shard, backend)) = self.select(entry_index, entry, key) else {
                continue;
            };
            if let Err(failure) = backend.remove(key) {
                self.record_failure(entry_index, shard, &failure, counters);
            }
        }
    }

    pub fn stop(&self) {
        for entry in &self.entries {
            for (_, backend) in &entry.backends {
                backend.stop();
            }
        }
    }

    fn record_failure(
        &self,
        entry_index: usize,
        shard: &rendezvous::Shard,
        failure: &BackendFailure,
        counters: &mut Counters,
    ) {
        let sk = Self::shard_key(entry_index, &shard.name);
        self.mark_failed(sk);
        match failure {
            BackendFailure::Error(message) => {
                tracing::warn!(shard = %shard.name, %message, "remote storage error, isolating shard for this invocation");
                counters.increment(StatCounter::RemoteStorageError);
            }
            BackendFailure::Timeout { millis } => {
                tracing::warn!(shard = %shard.name, millis, "remote storage timeout, isolating shard for this invocation");
                counters.increment(StatCounter::RemoteStorageTimeout);
            }
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
