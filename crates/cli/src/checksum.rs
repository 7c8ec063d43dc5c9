// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Ad hoc file checksum (SPEC_FULL.md "SUPPLEMENTED FEATURES",
//! `--checksum-file`): a 128-bit XXH3 digest over a file's raw bytes,
//! independent of the compile-key hashing in [`crate::hash`]. Mirrors
//! `examples/original_source/src/ccache/util/xxh3_128.hpp`'s debug
//! utility, not part of the hot compile path.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Compute the 128-bit XXH3 checksum of a file's contents.
pub fn checksum_file(path: &Path) -> Result<[u8; 16]> {
    let bytes = fs::read(path).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(xxhash_rust::xxh3::xxh3_128(&bytes).to_be_bytes())
}

/// Render a checksum as lowercase hex, matching the original's
/// `--checksum-file` output format.
pub fn format_checksum(checksum: &[u8; 16]) -> String {
    checksum.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
#[path = "checksum_tests.rs"]
mod tests;
