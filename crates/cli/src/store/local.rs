//! Local content-addressed storage (spec §4.6 "Local storage").
//!
//! Layout: `<cache_dir>/<shard>/<rest><suffix>` where `shard` is the
//! first two path-form characters of the key and `suffix` is `M`
//! (manifest) or `R` (result). Writes go to a per-shard `tmp/` file with a
//! unique suffix, then an atomic rename into place; reads verify the
//! envelope and drop/treat-as-miss anything that fails to validate.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rayon::prelude::*;

use crate::digest::Digest;
use crate::envelope::{Envelope, EntryType};
use crate::error::{Error, Result};
use crate::store::stats::{Counters, StatCounter};

const CACHEDIR_TAG_CONTENTS: &str = "Signature: 8a477f597d28d172789f06886806bc55\n\
# This file is a cache directory tag created by ccforge.\n\
# For information about cache directory tags see https://bford.info/cachedir/\n";

fn suffix_for(entry_type: EntryType) -> &'static str {
    match entry_type {
        EntryType::Manifest => "M",
        EntryType::Result => "R",
    }
}

/// Monotonically-unique counter mixed into temp file names so concurrent
/// writers in the same process never collide before the PID/time mix is
/// even consulted.
static TEMP_FILE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// The local, filesystem-backed cache.
pub struct LocalStorage {
    cache_dir: PathBuf,
    pub max_files: u64,
    pub max_size: u64,
}

impl LocalStorage {
    pub fn new(cache_dir: impl Into<PathBuf>, max_files: u64, max_size: u64) -> Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir).map_err(|e| Error::Io {
            path: cache_dir.clone(),
            source: e,
        })?;
        let storage = Self {
            cache_dir,
            max_files,
            max_size,
        };
        storage.ensure_cachedir_tag()?;
        Ok(storage)
    }

    fn ensure_cachedir_tag(&self) -> Result<()> {
        let tag_path = self.cache_dir.join("CACHEDIR.TAG");
        if tag_path.exists() {
            return Ok(());
        }
        fs::write(&tag_path, CACHEDIR_TAG_CONTENTS).map_err(|e| Error::Io {
            path: tag_path,
            source: e,
        })
    }

    fn shard_dir(&self, digest: &Digest) -> PathBuf {
        self.cache_dir.join(digest.shard())
    }

    fn entry_path(&self, digest: &Digest, entry_type: EntryType) -> PathBuf {
        let path_form = digest.format_path();
        let rest = &path_form[2..];
        self.shard_dir(digest)
            .join(format!("{rest}{}", suffix_for(entry_type)))
    }

    fn stats_path(&self, shard: &str) -> PathBuf {
        self.cache_dir.join(shard).join("stats")
    }

    /// Read an entry, verifying the envelope. A validation failure is
    /// treated exactly like a miss, after removing the corrupt file
    /// (spec §4.6 "Read (get)").
    pub fn get(&self, digest: &Digest, entry_type: EntryType) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(digest, entry_type);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Io { path, source: e }),
        };
        match Envelope::decode(&bytes) {
            Ok(envelope) => {
                if envelope.entry_type != entry_type {
                    self.remove_unchecked(&path);
                    return Ok(None);
                }
                // The preceding fs::read already refreshed atime on any
                // filesystem not mounted noatime, which cleanup_shard's
                // LRU ordering relies on.
                Ok(Some(envelope.payload))
            }
            Err(_) => {
                self.remove_unchecked(&path);
                Ok(None)
            }
        }
    }

    /// Write an entry. Returns whether a new file was actually stored —
    /// `false` when `overwrite=false` and the key already exists, which
    /// must be a strict no-op (spec §4.7's backend contract, reused here
    /// for local storage's own idempotence requirement in §4.8).
    pub fn put(
        &self,
        digest: &Digest,
        entry_type: EntryType,
        namespace: &str,
        payload: Vec<u8>,
        overwrite: bool,
        counters: &mut Counters,
    ) -> Result<bool> {
        let final_path = self.entry_path(digest, entry_type);
        if !overwrite && final_path.exists() {
            return Ok(false);
        }

        let shard_dir = self.shard_dir(digest);
        let tmp_dir = shard_dir.join("tmp");
        fs::create_dir_all(&tmp_dir).map_err(|e| Error::Io {
            path: tmp_dir.clone(),
            source: e,
        })?;

        let envelope = Envelope::new(entry_type, namespace.to_string(), payload);
        let encoded = envelope.encode()?;

        let unique = TEMP_FILE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_path = tmp_dir.join(format!(
            "{}.{}.ccache{}remove",
            std::process::id(),
            unique,
            unique
        ));

        {
            let mut f = fs::File::create(&tmp_path).map_err(|e| Error::Io {
                path: tmp_path.clone(),
                source: e,
            })?;
            f.write_all(&encoded).map_err(|e| Error::Io {
                path: tmp_path.clone(),
                source: e,
            })?;
        }

        let was_new = !final_path.exists();
        fs::rename(&tmp_path, &final_path).map_err(|e| Error::Io {
            path: final_path.clone(),
            source: e,
        })?;

        if was_new {
            counters.increment(StatCounter::FilesInCache);
            counters.add(StatCounter::CacheSizeBytes, encoded.len() as u64 / 1024);
            self.write_stats(&digest.shard(), counters)?;
        }

        Ok(true)
    }

    fn write_stats(&self, shard: &str, counters: &Counters) -> Result<()> {
        let path = self.stats_path(shard);
        let tmp = path.with_extension("tmp");
        let encoded = postcard::to_allocvec(counters)
            .map_err(|e| Error::Internal(format!("stats serialize failed: {e}")))?;
        fs::write(&tmp, &encoded).map_err(|e| Error::Io {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &path).map_err(|e| Error::Io { path, source: e })
    }

    /// Read one shard's counters, defaulting to zero if absent or
    /// unreadable (best-effort, per spec §5's "slight undercounting is
    /// acceptable").
    pub fn read_stats(&self, shard: &str) -> Counters {
        fs::read(self.stats_path(shard))
            .ok()
            .and_then(|bytes| postcard::from_bytes(&bytes).ok())
            .unwrap_or_default()
    }

    /// Sum counters across every shard directory present on disk.
    pub fn aggregate_stats(&self) -> Result<Counters> {
        let mut total = Counters::new();
        for entry in fs::read_dir(&self.cache_dir).map_err(|e| Error::Io {
            path: self.cache_dir.clone(),
            source: e,
        })? {
            let entry = entry.map_err(|e| Error::Io {
                path: self.cache_dir.clone(),
                source: e,
            })?;
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                if let Some(name) = entry.file_name().to_str() {
                    if name.len() == 2 {
                        total.merge(&self.read_stats(name));
                    }
                }
            }
        }
        Ok(total)
    }

    /// NFS-safe removal: rename to a local temporary name, then unlink,
    /// to avoid stale file handles on the original name (spec §4.6).
    fn remove_unchecked(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            let tmp = parent.join(format!(
                ".ccache.remove.{}",
                TEMP_FILE_COUNTER.fetch_add(1, Ordering::Relaxed)
            ));
            if fs::rename(path, &tmp).is_ok() {
                let _ = fs::remove_file(&tmp);
            } else {
                let _ = fs::remove_file(path);
            }
        }
    }

    /// Per-shard cleanup: evict by ascending atime until both thresholds
    /// (`max_files/16`, `max_size/16`, spec §4.6) are satisfied for this
    /// shard. Returns the number of files removed.
    pub fn cleanup_shard(&self, shard: &str, counters: &mut Counters) -> Result<u64> {
        let shard_dir = self.cache_dir.join(shard);
        if !shard_dir.exists() {
            return Ok(0);
        }
        let file_limit = self.max_files / 16;
        let size_limit_kib = self.max_size / 16 / 1024;

        let mut entries: Vec<(PathBuf, SystemTime, u64)> = Vec::new();
        for entry in fs::read_dir(&shard_dir).map_err(|e| Error::Io {
            path: shard_dir.clone(),
            source: e,
        })? {
            let entry = entry.map_err(|e| Error::Io {
                path: shard_dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            if !path.is_file() || path.file_name().and_then(|n| n.to_str()) == Some("stats") {
                continue;
            }
            let meta = entry.metadata().map_err(|e| Error::Io {
                path: path.clone(),
                source: e,
            })?;
            let atime = meta.accessed().unwrap_or(UNIX_EPOCH);
            entries.push((path, atime, meta.len()));
        }

        entries.sort_by_key(|(_, atime, _)| *atime);

        let mut total_size_kib: u64 = entries.iter().map(|(_, _, size)| size / 1024).sum();
        let mut total_files = entries.len() as u64;
        let mut removed = 0u64;

        for (path, _, size) in entries {
            if total_files <= file_limit && total_size_kib <= size_limit_kib {
                break;
            }
            self.remove_unchecked(&path);
            total_files = total_files.saturating_sub(1);
            total_size_kib = total_size_kib.saturating_sub(size / 1024);
            removed += 1;
        }

        if removed > 0 {
            counters.increment(StatCounter::CleanupsPerformed);
            counters.add(StatCounter::FilesCleanedUp, removed);
            self.write_stats(shard, counters)?;
        }

        Ok(removed)
    }

    /// Zero every shard's counters in place, preserving the new
    /// `zeroed_at_unix_secs` timestamp (the `--zero-stats` path).
    pub fn zero_all_stats(&self, now_unix_secs: u64) -> Result<()> {
        for shard in self.shards()? {
            let mut counters = self.read_stats(&shard);
            counters.zero(now_unix_secs);
            self.write_stats(&shard, &counters)?;
        }
        Ok(())
    }

    /// Look up one key directly by its digest and entry type, for the
    /// `--inspect` debug surface: unlike [`Self::get`], a bad envelope is
    /// reported rather than silently treated as a miss.
    pub fn inspect(&self, digest: &Digest, entry_type: EntryType) -> Result<Option<Envelope>> {
        let path = self.entry_path(digest, entry_type);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Io { path, source: e }),
        };
        Envelope::decode(&bytes).map(Some)
    }

    pub fn shards(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.cache_dir).map_err(|e| Error::Io {
            path: self.cache_dir.clone(),
            source: e,
        })? {
            let entry = entry.map_err(|e| Error::Io {
                path: self.cache_dir.clone(),
                source: e,
            })?;
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                if let Some(name) = entry.file_name().to_str() {
                    if name.len() == 2 {
                        out.push(name.to_string());
                    }
                }
            }
        }
        Ok(out)
    }

    /// Run `cleanup_shard` across every shard, in parallel over a thread
    /// pool the way the teacher's runner parallelizes per-file work with
    /// rayon.
    pub fn cleanup_all(&self) -> Result<u64> {
        let shards = self.shards()?;
        let removed: u64 = shards
            .into_par_iter()
            .map(|shard| {
                let mut counters = self.read_stats(&shard);
                self.cleanup_shard(&shard, &mut counters).unwrap_or(0)
            })
            .sum();
        Ok(removed)
    }

    /// Walk every shard and rewrite any entry whose compression level
    /// differs from `target_level`, decompressing and recompressing in
    /// memory before the temp-file-and-rename swap (spec §4.6
    /// "Recompression"). `threads` bounds the rayon pool used.
    pub fn recompress(&self, target_level: i32, threads: usize) -> Result<u64> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .build()
            .map_err(|e| Error::Internal(format!("failed to build recompression pool: {e}")))?;

        let shards = self.shards()?;
        let rewritten = std::sync::atomic::AtomicU64::new(0);

        pool.install(|| {
            shards.par_iter().for_each(|shard| {
                let shard_dir = self.cache_dir.join(shard);
                let Ok(dir_entries) = fs::read_dir(&shard_dir) else {
                    return;
                };
                for entry in dir_entries.flatten() {
                    let path = entry.path();
                    if !path.is_file() {
                        continue;
                    }
                    if self.recompress_one(&path, target_level).unwrap_or(false) {
                        rewritten.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
        });

        Ok(rewritten.load(Ordering::Relaxed))
    }

    fn recompress_one(&self, path: &Path, target_level: i32) -> Result<bool> {
        let bytes = fs::read(path).map_err(|e| Error::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut envelope = match Envelope::decode(&bytes) {
            Ok(e) => e,
            Err(_) => return Ok(false),
        };
        if envelope.compression_level == target_level {
            return Ok(false);
        }
        envelope.compression_level = target_level;
        let encoded = envelope.encode()?;
        let tmp = path.with_extension("recompress.tmp");
        fs::write(&tmp, &encoded).map_err(|e| Error::Io {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, path).map_err(|e| Error::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(true)
    }

    /// Explicit eviction bounded by age and/or namespace (spec §4.6
    /// "Eviction").
    pub fn evict(&self, older_than_secs: Option<u64>, namespace: Option<&str>) -> Result<u64> {
        let now = SystemTime::now();
        let mut removed = 0u64;
        for shard in self.shards()? {
            let shard_dir = self.cache_dir.join(&shard);
            let Ok(dir_entries) = fs::read_dir(&shard_dir) else {
                continue;
            };
            for entry in dir_entries.flatten() {
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                if let Some(max_age) = older_than_secs {
                    let Ok(meta) = entry.metadata() else { continue };
                    let Ok(mtime) = meta.modified() else { continue };
                    let age = now.duration_since(mtime).unwrap_or_default().as_secs();
                    if age < max_age {
                        continue;
                    }
                }
                if let Some(ns) = namespace {
                    let Ok(bytes) = fs::read(&path) else { continue };
                    let Ok(envelope) = Envelope::decode(&bytes) else {
                        continue;
                    };
                    if envelope.namespace != ns {
                        continue;
                    }
                }
                self.remove_unchecked(&path);
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Remove every shard directory (the `--clear` / `wipe_all` path).
    pub fn wipe_all(&self) -> Result<()> {
        for shard in self.shards()? {
            let shard_dir = self.cache_dir.join(shard);
            fs::remove_dir_all(&shard_dir).map_err(|e| Error::Io {
                path: shard_dir,
                source: e,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
