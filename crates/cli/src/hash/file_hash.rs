// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! File content hashing, integrated with the inode cache (spec §4.3
//! "Hashing a file").
//!
//! Adapted from the crate's original size-gated file reader: the same
//! streaming-read shape, but without an artificial size cap (a compiler
//! cache can't refuse to hash a legitimately large translation unit) and
//! with the temporal-macro scan and inode-cache consultation folded in.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::digest::Digest;
use crate::error::{Error, Result};
use crate::hash::Hasher;
use crate::inode_cache::InodeCache;

bitflags::bitflags! {
    /// Result bitmask stashed alongside a file's content digest in the
    /// inode cache (spec §4.6 "Entry: { key_digest, file_digest,
    /// return_value_bitmask }").
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TemporalFlags: i32 {
        const CONTAINS_DATE      = 0b001;
        const CONTAINS_TIME      = 0b010;
        const CONTAINS_TIMESTAMP = 0b100;
    }
}

const CHUNK_SIZE: usize = 64 * 1024;

const NEEDLES: &[(&[u8], TemporalFlags)] = &[
    (b"__DATE__", TemporalFlags::CONTAINS_DATE),
    (b"__TIME__", TemporalFlags::CONTAINS_TIME),
    (b"__TIMESTAMP__", TemporalFlags::CONTAINS_TIMESTAMP),
];

/// Longest needle length minus one: how much of the tail of one chunk
/// must be carried into the next so a needle split across a chunk
/// boundary is still found.
const MAX_OVERLAP: usize = 12;

#[derive(Debug, Clone, Copy)]
pub struct FileHashResult {
    pub digest: Digest,
    pub flags: TemporalFlags,
}

/// Hash `path`'s content, consulting `inode_cache` (if any) first when
/// the file's timestamps clear `min_age`.
pub fn hash_file(path: &Path, inode_cache: Option<&InodeCache>) -> Result<FileHashResult> {
    let meta = std::fs::metadata(path).map_err(|e| Error::BadInputFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let mtime = meta.modified().unwrap_or(UNIX_EPOCH);
    let ctime = unix_ctime(&meta);

    let identity_key = if inode_cache.is_some() && InodeCache::should_consult(mtime, ctime) {
        Some(inode_identity_digest(&meta))
    } else {
        None
    };

    if let (Some(cache), Some(key)) = (inode_cache, identity_key.as_ref()) {
        if let Some(hit) = cache.get(key) {
            return Ok(FileHashResult {
                digest: hit.file_digest,
                flags: TemporalFlags::from_bits_truncate(hit.return_value),
            });
        }
    }

    let file = File::open(path).map_err(|e| Error::BadInputFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let (digest, flags) = hash_content_streaming(file).map_err(|e| Error::BadInputFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if let (Some(cache), Some(key)) = (inode_cache, identity_key) {
        cache.put(&key, digest, flags.bits());
    }

    Ok(FileHashResult { digest, flags })
}

/// Stream `reader` through a content digest while scanning for the
/// temporal macros that make a header's expansion non-reproducible.
fn hash_content_streaming(mut reader: impl Read) -> std::io::Result<(Digest, TemporalFlags)> {
    let mut hasher = blake3::Hasher::new();
    let mut flags = TemporalFlags::empty();
    let mut carry: Vec<u8> = Vec::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);

        carry.extend_from_slice(&buf[..n]);
        for (needle, flag) in NEEDLES {
            if !flags.contains(*flag) && contains_subslice(&carry, needle) {
                flags |= *flag;
            }
        }
        let keep_from = carry.len().saturating_sub(MAX_OVERLAP);
        carry.drain(0..keep_from);
    }

    let mut out = [0u8; 20];
    hasher.finalize_xof().fill(&mut out);
    Ok((Digest::from_bytes(out), flags))
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// The inode cache's lookup key: a hash of the file's identity, not its
/// content (spec §3 "InodeCache Key / Entry": `{content_type, st_dev,
/// st_ino, st_mode, st_mtim, st_ctim, st_size}`).
fn inode_identity_digest(meta: &std::fs::Metadata) -> Digest {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let mut h = Hasher::new();
        h.update_str("TYP", "file-content");
        h.update_tagged("DEV", &meta.dev().to_be_bytes());
        h.update_tagged("INO", &meta.ino().to_be_bytes());
        h.update_tagged("MOD", &meta.mode().to_be_bytes());
        h.update_tagged("MTS", &meta.mtime().to_be_bytes());
        h.update_tagged("MTN", &meta.mtime_nsec().to_be_bytes());
        h.update_tagged("CTS", &meta.ctime().to_be_bytes());
        h.update_tagged("CTN", &meta.ctime_nsec().to_be_bytes());
        h.update_tagged("SIZ", &meta.size().to_be_bytes());
        h.digest()
    }
    #[cfg(not(unix))]
    {
        let mut h = Hasher::new();
        h.update_str("TYP", "file-content");
        h.update_tagged("SIZ", &meta.len().to_be_bytes());
        h.digest()
    }
}

#[cfg(unix)]
fn unix_ctime(meta: &std::fs::Metadata) -> SystemTime {
    use std::os::unix::fs::MetadataExt;
    UNIX_EPOCH + Duration::new(meta.ctime().max(0) as u64, meta.ctime_nsec().max(0) as u32)
}

#[cfg(not(unix))]
fn unix_ctime(meta: &std::fs::Metadata) -> SystemTime {
    meta.modified().unwrap_or(UNIX_EPOCH)
}

#[cfg(test)]
#[path = "file_hash_tests.rs"]
mod tests;
