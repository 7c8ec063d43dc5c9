// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Direct- and preprocessor-mode key construction (spec §4.8
//! "Direct-mode hashing" / "Preprocessor-mode hashing").

use std::path::Path;

use crate::args::CompilationRequest;
use crate::config::Config;
use crate::digest::Digest;
use crate::error::Result;
use crate::hash::{hash_compiler, hash_file, Hasher};
use crate::inode_cache::InodeCache;

/// Whether any seen compiler flag asks for debug info, gating the cwd
/// and source-path terms of the hash (spec §4.8).
fn wants_debug_info(req: &CompilationRequest) -> bool {
    req.compiler_args
        .iter()
        .any(|a| a == "-g" || a.starts_with("-g") || a == "-gsplit-dwarf")
}

/// Mix the fields common to both direct- and preprocessor-mode keys,
/// everything except the mode-specific "source content" term.
fn mix_tail(hasher: &mut Hasher, config: &Config, req: &CompilationRequest, cwd: &Path) {
    if config.hash_dir || wants_debug_info(req) {
        hasher.update_str("CWD", &cwd.to_string_lossy());
    }
    hasher.update_str("LNG", &req.actual_language);
    if wants_debug_info(req) {
        hasher.update_str("SRC", &req.source_path.to_string_lossy());
    }
    for extra in &config.extra_files_to_hash {
        if let Ok(result) = hash_file(extra, None) {
            hasher.update_tagged("EXF", result.digest.as_bytes());
        }
    }
    if let Some(ns) = &config.namespace {
        hasher.update_str("NS", ns);
    }
}

fn mix_head(hasher: &mut Hasher, config: &Config, req: &CompilationRequest) -> Result<()> {
    hasher.update_str("TAG", "compile-key-v1");
    hash_compiler(hasher, &req.compiler_path, &config.compiler_check)?;
    for arg in &req.compiler_args {
        hasher.update_str("ARG", arg);
    }
    for arg in &req.extra_args_to_hash {
        hasher.update_str("XTR", arg);
    }
    Ok(())
}

/// Build the direct-mode key, mixing the source file's own content hash.
/// Returns `None` when direct mode is disallowed for this invocation.
pub fn direct_key(
    config: &Config,
    req: &CompilationRequest,
    cwd: &Path,
    inode_cache: Option<&InodeCache>,
) -> Result<Option<Digest>> {
    if !config.direct_mode || req.direct_mode_disallowed {
        return Ok(None);
    }
    let mut hasher = Hasher::new();
    mix_head(&mut hasher, config, req)?;
    let source_hash = hash_file(&req.source_path, inode_cache)?;
    hasher.update_tagged("SRH", source_hash.digest.as_bytes());
    mix_tail(&mut hasher, config, req, cwd);
    Ok(Some(hasher.digest()))
}

/// Build the preprocessor-mode key, mixing the preprocessor's captured
/// stdout in place of the source file's own content hash.
pub fn cpp_key(
    config: &Config,
    req: &CompilationRequest,
    cwd: &Path,
    cpp_stdout: &[u8],
) -> Result<Digest> {
    let mut hasher = Hasher::new();
    mix_head(&mut hasher, config, req)?;
    hasher.update_tagged("CPP", cpp_stdout);
    mix_tail(&mut hasher, config, req, cwd);
    Ok(hasher.digest())
}

/// Hash over a stored result's own contents (spec §4.8 "Compute
/// `result_key` as a hash over the result contents").
pub fn result_key(result: &crate::result_entry::ResultEntry) -> Digest {
    let mut hasher = Hasher::new();
    hasher.update_str("TAG", "result-key-v1");
    for file in result.iter() {
        hasher.update_str("FTY", &format!("{:?}", file.file_type));
        hasher.update_tagged("FBY", &file.bytes);
    }
    hasher.digest()
}

#[cfg(test)]
#[path = "hashing_tests.rs"]
mod tests;
