// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Streaming hasher (spec §4.3, component C).
//!
//! Every field mixed into a direct- or preprocessor-mode key goes through
//! [`Hasher::update_tagged`]: a short tag, a big-endian length, then the
//! bytes themselves. Two adjacent fields can never be confused for a
//! single longer one, and the tag makes a hex-dumped digest's ancestry
//! debuggable.

pub mod file_hash;

use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};

use crate::digest::Digest;
use crate::error::{Error, Result};

pub use file_hash::{hash_file, FileHashResult, TemporalFlags};

/// How the compiler binary itself is mixed into the hash (spec §4.3
/// "Hashing the compiler").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilerCheck {
    /// Mix path + size + mtime (default).
    Mtime,
    /// Stream the compiler binary's content.
    Content,
    /// Omit the compiler entirely from the hash.
    None,
    /// Run a shell command and mix its stdout.
    Command(String),
    /// Mix a fixed, user-supplied string.
    String(String),
}

/// A streaming 160-bit hash built from tag-and-length-framed fields.
///
/// `update(bytes)` is order-sensitive; `digest()` is a terminal operation
/// in the sense that it doesn't consume `self`, but a [`Hasher`] that has
/// been `digest()`-ed is not meant to be updated further and reused for
/// an unrelated key — construct a fresh one per key.
pub struct Hasher {
    inner: blake3::Hasher,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    pub fn new() -> Self {
        Self { inner: blake3::Hasher::new() }
    }

    /// Mix `tag` (a short human-readable identifier like `"CWD"` or
    /// `"ARG"`), `bytes.len()` as a big-endian `u32`, then `bytes`.
    pub fn update_tagged(&mut self, tag: &str, bytes: &[u8]) -> &mut Self {
        self.inner.update(tag.as_bytes());
        self.inner.update(&(bytes.len() as u32).to_be_bytes());
        self.inner.update(bytes);
        self
    }

    pub fn update_str(&mut self, tag: &str, s: &str) -> &mut Self {
        self.update_tagged(tag, s.as_bytes())
    }

    /// Extract a 160-bit digest from the bytes mixed so far.
    pub fn digest(&self) -> Digest {
        let mut out = [0u8; 20];
        self.inner.finalize_xof().fill(&mut out);
        Digest::from_bytes(out)
    }
}

/// Mix the compiler identity into `hasher` per `mode` (spec §4.3
/// "Hashing the compiler").
pub fn hash_compiler(hasher: &mut Hasher, compiler_path: &Path, mode: &CompilerCheck) -> Result<()> {
    match mode {
        CompilerCheck::None => {}
        CompilerCheck::String(s) => {
            hasher.update_str("CCS", s);
        }
        CompilerCheck::Mtime => {
            let meta = std::fs::metadata(compiler_path).map_err(|e| Error::BadInputFile {
                path: compiler_path.to_path_buf(),
                message: e.to_string(),
            })?;
            hasher.update_str("CCP", &compiler_path.to_string_lossy());
            hasher.update_tagged("CCZ", &meta.len().to_be_bytes());
            let mtime = meta.modified().unwrap_or(UNIX_EPOCH);
            let secs = mtime.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO).as_secs();
            hasher.update_tagged("CCM", &secs.to_be_bytes());
        }
        CompilerCheck::Content => {
            let result = file_hash::hash_file(compiler_path, None)?;
            hasher.update_tagged("CCC", result.digest.as_bytes());
        }
        CompilerCheck::Command(cmd) => {
            let output = std::process::Command::new("sh")
                .arg("-c")
                .arg(cmd)
                .output()
                .map_err(|e| Error::Internal(format!("compiler_check command failed: {e}")))?;
            hasher.update_tagged("CCX", &output.stdout);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
