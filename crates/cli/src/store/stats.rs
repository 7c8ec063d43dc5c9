//! Statistics counters.
//!
//! Spec §3: "a fixed-size vector of named uint64 counters covering:
//! hits/misses (direct, preprocessed, remote), cache size and file count,
//! uncacheable-reason tallies, error-reason tallies, remote error/timeout
//! counts, cleanups performed, stats-zeroed timestamp." One shard's
//! counters are updated atomically per cacheable invocation; aggregation
//! sums across shards (§4.8).

use std::fmt;

/// A single named counter slot.
///
/// `Counters` below stores one `u64` per variant, indexed by
/// [`StatCounter::index`]. The variant list is the fixed-size vector the
/// spec describes; `COUNT` is its length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum StatCounter {
    DirectCacheHit,
    DirectCacheMiss,
    PreprocessedCacheHit,
    PreprocessedCacheMiss,
    RemoteCacheHit,
    RemoteCacheMiss,
    CacheMiss,
    CacheSizeBytes,
    FilesInCache,
    Uncacheable,
    UnsupportedCompilerOption,
    BadCompilerArguments,
    BadInputFile,
    BadOutputFile,
    MissingCacheFile,
    InternalError,
    RemoteStorageError,
    RemoteStorageTimeout,
    RemoteStorageWrite,
    CompileFailed,
    CleanupsPerformed,
    FilesCleanedUp,
}

impl StatCounter {
    pub const COUNT: usize = 22;

    /// Stable index into a [`Counters`] array.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The name used when rendering a stats report, matching ccache's
    /// snake_case counter names.
    pub fn name(self) -> &'static str {
        match self {
            StatCounter::DirectCacheHit => "direct_cache_hit",
            StatCounter::DirectCacheMiss => "direct_cache_miss",
            StatCounter::PreprocessedCacheHit => "preprocessed_cache_hit",
            StatCounter::PreprocessedCacheMiss => "preprocessed_cache_miss",
            StatCounter::RemoteCacheHit => "remote_cache_hit",
            StatCounter::RemoteCacheMiss => "remote_cache_miss",
            StatCounter::CacheMiss => "cache_miss",
            StatCounter::CacheSizeBytes => "cache_size_kibibyte",
            StatCounter::FilesInCache => "files_in_cache",
            StatCounter::Uncacheable => "uncacheable",
            StatCounter::UnsupportedCompilerOption => "unsupported_compiler_option",
            StatCounter::BadCompilerArguments => "bad_compiler_arguments",
            StatCounter::BadInputFile => "bad_input_file",
            StatCounter::BadOutputFile => "bad_output_file",
            StatCounter::MissingCacheFile => "missing_cache_file",
            StatCounter::InternalError => "internal_error",
            StatCounter::RemoteStorageError => "remote_storage_error",
            StatCounter::RemoteStorageTimeout => "remote_storage_timeout",
            StatCounter::RemoteStorageWrite => "remote_storage_write",
            StatCounter::CompileFailed => "compile_failed",
            StatCounter::CleanupsPerformed => "cleanups_performed",
            StatCounter::FilesCleanedUp => "files_cleaned_up",
        }
    }

    /// All counters, in index order.
    pub fn all() -> [StatCounter; StatCounter::COUNT] {
        [
            StatCounter::DirectCacheHit,
            StatCounter::DirectCacheMiss,
            StatCounter::PreprocessedCacheHit,
            StatCounter::PreprocessedCacheMiss,
            StatCounter::RemoteCacheHit,
            StatCounter::RemoteCacheMiss,
            StatCounter::CacheMiss,
            StatCounter::CacheSizeBytes,
            StatCounter::FilesInCache,
            StatCounter::Uncacheable,
            StatCounter::UnsupportedCompilerOption,
            StatCounter::BadCompilerArguments,
            StatCounter::BadInputFile,
            StatCounter::BadOutputFile,
            StatCounter::MissingCacheFile,
            StatCounter::InternalError,
            StatCounter::RemoteStorageError,
            StatCounter::RemoteStorageTimeout,
            StatCounter::RemoteStorageWrite,
            StatCounter::CompileFailed,
            StatCounter::CleanupsPerformed,
            StatCounter::FilesCleanedUp,
        ]
    }
}

impl fmt::Display for StatCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A shard's counter vector plus its last-zeroed timestamp.
///
/// Per §5, counters are shared-writable and updated with commutative
/// integer additions, so a shard's file can be a flat array of u64s with
/// no locking needed for the increments themselves (the file-level atomic
/// write/rename still guards structural changes).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Counters {
    values: [u64; StatCounter::COUNT],
    pub zeroed_at_unix_secs: u64,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            values: [0; StatCounter::COUNT],
            zeroed_at_unix_secs: 0,
        }
    }
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, counter: StatCounter) -> u64 {
        self.values[counter.index()]
    }

    pub fn increment(&mut self, counter: StatCounter) {
        self.add(counter, 1);
    }

    pub fn add(&mut self, counter: StatCounter, amount: u64) {
        self.values[counter.index()] = self.values[counter.index()].saturating_add(amount);
    }

    pub fn set(&mut self, counter: StatCounter, value: u64) {
        self.values[counter.index()] = value;
    }

    /// Sum `other` into `self`, the aggregation step of §4.8's
    /// `get_all_statistics`.
    pub fn merge(&mut self, other: &Counters) {
        for c in StatCounter::all() {
            self.add(c, other.get(c));
        }
        if other.zeroed_at_unix_secs > self.zeroed_at_unix_secs {
            self.zeroed_at_unix_secs = other.zeroed_at_unix_secs;
        }
    }

    pub fn zero(&mut self, now_unix_secs: u64) {
        self.values = [0; StatCounter::COUNT];
        self.zeroed_at_unix_secs = now_unix_secs;
    }

    pub fn iter(&self) -> impl Iterator<Item = (StatCounter, u64)> + '_ {
        StatCounter::all().into_iter().map(|c| (c, self.get(c)))
    }
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
