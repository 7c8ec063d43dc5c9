//! Manifest entries for direct mode (spec §3 "Manifest entry", §4.2 "On
//! read").
//!
//! A manifest maps a set of included-file fingerprints to the
//! `result_key` that was produced the last time that exact fingerprint
//! was observed. One manifest (one on-disk key) may hold several such
//! entries, because the same direct-mode key can see different header
//! sets across builds (e.g. a header guarded by `#ifdef`).

use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::error::Result;

/// Fixed cap from spec §4.4 ("entries: 100; oldest-first"). Oldest entry
/// (by position) is pruned on insert once the cap is reached.
pub const MAX_MANIFEST_ENTRIES: usize = 100;

/// Sloppiness flags controlling how strictly an included file is
/// re-verified on manifest lookup (spec §4.2).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sloppiness {
    /// Match on `(size, mtime)` alone, skipping content hashing.
    pub file_stat_matches: bool,
    /// Additionally require `ctime` to match.
    pub file_stat_matches_ctime: bool,
    /// Ignore an included file's mtime difference when deciding a match.
    pub include_file_mtime: bool,
    /// Ignore an included file's ctime difference when deciding a match.
    pub include_file_ctime: bool,
}

/// The recorded state of one file referenced by a manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludedFile {
    pub path: String,
    pub mtime: i64,
    pub ctime: i64,
    pub size: u64,
    pub content_hash: [u8; 20],
}

impl IncludedFile {
    /// Whether the current on-disk state of this file still satisfies
    /// the entry under the given sloppiness, without reading content.
    fn stat_matches(&self, size: u64, mtime: i64, ctime: i64, sloppiness: Sloppiness) -> bool {
        if self.size != size {
            return false;
        }
        if !sloppiness.include_file_mtime && self.mtime != mtime {
            return false;
        }
        if sloppiness.file_stat_matches_ctime
            && !sloppiness.include_file_ctime
            && self.ctime != ctime
        {
            return false;
        }
        true
    }
}

/// One fingerprint-to-result mapping within a manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub files: Vec<IncludedFile>,
    pub result_key: Digest,
}

/// The full set of entries sharing one direct-mode manifest key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

/// Per-file state observed at lookup time, supplied by the caller (the
/// inode cache supplies `content_hash` lazily, only when stat alone can't
/// decide under the active sloppiness).
pub struct ObservedFile<'a> {
    pub path: &'a str,
    pub size: u64,
    pub mtime: i64,
    pub ctime: i64,
    pub content_hash: [u8; 20],
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Find the first entry (insertion order, "stable" per spec §5) whose
    /// every referenced file matches the observed state under the given
    /// sloppiness.
    pub fn find_match(
        &self,
        observed: &[ObservedFile<'_>],
        sloppiness: Sloppiness,
    ) -> Option<Digest> {
        'entry: for entry in &self.entries {
            if entry.files.len() != observed.len() {
                continue;
            }
            for recorded in &entry.files {
                let Some(current) = observed.iter().find(|o| o.path == recorded.path) else {
                    continue 'entry;
                };
                if sloppiness.file_stat_matches {
                    if !recorded.stat_matches(
                        current.size,
                        current.mtime,
                        current.ctime,
                        sloppiness,
                    ) {
                        continue 'entry;
                    }
                } else if recorded.content_hash != current.content_hash
                    || recorded.size != current.size
                {
                    continue 'entry;
                }
            }
            return Some(entry.result_key);
        }
        None
    }

    /// Insert or overwrite the entry for this exact file set, pruning the
    /// oldest entry first if at capacity.
    pub fn upsert(&mut self, files: Vec<IncludedFile>, result_key: Digest) {
        if self.entries.len() >= MAX_MANIFEST_ENTRIES {
            self.entries.remove(0);
        }
        self.entries.push(ManifestEntry { files, result_key });
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        postcard::to_allocvec(self)
            .map_err(|e| crate::error::Error::Internal(format!("manifest serialize failed: {e}")))
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        postcard::from_bytes(bytes).map_err(|e| {
            crate::error::Error::Internal(format!("manifest deserialize failed: {e}"))
        })
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
