// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Compile engine (spec §4.8, component J): the state machine driving
//! one invocation from raw argv to an exit code —
//! CLASSIFY → DIRECT HASH → (MANIFEST LOOKUP | RUN CPP) → CPP HASH →
//! (FETCH RESULT | COMPILE) → STORE + UPDATE MANIFEST.

mod hashing;
mod materialize;

use std::collections::HashSet;
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::process::Command;

use crate::args::{self, CompilationRequest, CompilerType};
use crate::compiler_exec::{self, CompilerOutput};
use crate::config::Config;
use crate::depfile;
use crate::digest::Digest;
use crate::envelope::{EntryType, Envelope};
use crate::error::{Error, Result};
use crate::inode_cache::InodeCache;
use crate::manifest::{IncludedFile, Manifest, ObservedFile};
use crate::result_entry::{FileType, ResultEntry};
use crate::store::local::LocalStorage;
use crate::store::stats::{Counters, StatCounter};

pub use hashing::{cpp_key, direct_key, result_key};

/// Everything the engine needs to drive one invocation, borrowed from
/// whatever `main` assembled at startup.
pub struct EngineContext<'a> {
    pub config: &'a Config,
    pub local: &'a LocalStorage,
    pub remote: Option<&'a crate::remote::RemoteOrchestrator>,
    pub inode_cache: Option<&'a InodeCache>,
}

/// Run one compiler invocation through the full cache state machine,
/// returning the exit code the wrapper should itself exit with.
pub fn run(
    ctx: &EngineContext,
    argv: &[String],
    cwd: &Path,
    counters: &mut Counters,
) -> Result<i32> {
    if argv.is_empty() {
        return Err(Error::Argument("empty argv".to_string()));
    }
    let compiler_path = Path::new(&argv[0]);
    let compiler_type = ctx
        .config
        .compiler_type
        .unwrap_or_else(|| CompilerType::detect(compiler_path));

    let req = match args::process(argv, compiler_type, ctx.config.base_dir.as_deref(), cwd) {
        Ok(req) => req,
        Err(e) => {
            counters.increment(e.counter());
            if e.falls_back_to_exec() {
                tracing::debug!(reason = %e, "falling back to direct compiler execution");
                return exec_original(argv);
            }
            return Err(e);
        }
    };

    if ctx.config.disable {
        tracing::debug!(reason = "disable=true", "falling back to direct compiler execution");
        return exec_original(argv);
    }

    let direct_key = direct_key(ctx.config, &req, cwd, ctx.inode_cache)?;

    if let Some(key) = direct_key.filter(|_| !ctx.config.recache) {
        if let Some(manifest) = fetch_manifest(ctx, &key, counters)? {
            let observed = build_observed(ctx, &manifest)?;
            let refs: Vec<ObservedFile<'_>> = observed
                .iter()
                .map(|o| ObservedFile {
                    path: &o.path,
                    size: o.size,
                    mtime: o.mtime,
                    ctime: o.ctime,
                    content_hash: o.content_hash,
                })
                .collect();
            if let Some(result_key) = manifest.find_match(&refs, ctx.config.sloppiness) {
                if let Some(outcome) = try_fetch(ctx, &req, &result_key, counters)? {
                    counters.increment(StatCounter::DirectCacheHit);
                    return Ok(outcome);
                }
            }
        }
    }

    let cpp_argv = build_cpp_argv(&req);
    let cpp_output = compiler_exec::run(
        &cpp_argv,
        true,
        &[],
        &ctx.config.temporary_dir,
        compiler_type,
    )?;
    if cpp_output.exit_status != 0 {
        forward(&cpp_output);
        return Ok(cpp_output.exit_status);
    }

    let cpp_key = cpp_key(ctx.config, &req, cwd, &cpp_output.stdout)?;

    if !ctx.config.recache {
        if let Some(outcome) = try_fetch(ctx, &req, &cpp_key, counters)? {
            counters.increment(StatCounter::PreprocessedCacheHit);
            return Ok(outcome);
        }
    }

    let compile_argv = build_compile_argv(&req);
    let compile_output = compiler_exec::run(
        &compile_argv,
        false,
        &cpp_output.stderr,
        &ctx.config.temporary_dir,
        compiler_type,
    )?;

    if compile_output.exit_status != 0 {
        forward(&compile_output);
        counters.increment(StatCounter::CompileFailed);
        return Ok(compile_output.exit_status);
    }

    let mut result = ResultEntry::new();
    let object_bytes = fs::read(&req.output_obj).map_err(|e| Error::BadOutputFile {
        path: req.output_obj.clone(),
        message: e.to_string(),
    })?;
    result.insert(FileType::Object, object_bytes);
    if let Some(dep_path) = &req.output_dep {
        if let Ok(bytes) = fs::read(dep_path) {
            result.insert(FileType::Dependency, bytes);
        }
    }
    if !compile_output.stderr.is_empty() {
        result.insert(FileType::StderrOutput, compile_output.stderr.clone());
    }
    result.validate(req.expect_output_obj)?;

    // Direct mode needs a level of indirection: several header
    // configurations can share one direct key, so the manifest maps it
    // to a content-addressed result. Preprocessor mode has no such
    // ambiguity — the cpp key already determines the result uniquely,
    // so it doubles as the storage key and no manifest entry is needed.
    let storage_key = if direct_key.is_some() {
        result_key(&result)
    } else {
        cpp_key
    };
    if !ctx.config.read_only {
        let result_bytes = result.serialize()?;
        put_entry(
            ctx,
            &storage_key,
            EntryType::Result,
            result_bytes,
            false,
            counters,
        )?;
    }

    if !ctx.config.read_only && !ctx.config.read_only_direct {
        if let Some(key) = direct_key {
            update_manifest(ctx, &key, &req, storage_key, counters)?;
        }
    }

    forward(&compile_output);
    counters.increment(StatCounter::CacheMiss);
    if direct_key.is_some() {
        counters.increment(StatCounter::DirectCacheMiss);
    } else {
        counters.increment(StatCounter::PreprocessedCacheMiss);
    }

    Ok(0)
}

/// FETCH RESULT for an already-known key: on a hit, materialize and
/// return `Some(0)`; on a materialization failure or miss, return `None`
/// so the caller continues down the state machine (RUN CPP or COMPILE).
fn try_fetch(
    ctx: &EngineContext,
    req: &CompilationRequest,
    key: &Digest,
    counters: &mut Counters,
) -> Result<Option<i32>> {
    let Some(result_bytes) = fetch_entry(ctx, key, EntryType::Result, counters)? else {
        return Ok(None);
    };
    let result = match ResultEntry::deserialize(&result_bytes) {
        Ok(r) => r,
        Err(_) => {
            counters.increment(StatCounter::MissingCacheFile);
            return Ok(None);
        }
    };
    match materialize::materialize(ctx.config, req, &result) {
        Ok(()) => {
            if let Some(stderr) = result.get(FileType::StderrOutput) {
                let _ = std::io::stderr().write_all(stderr);
            }
            Ok(Some(0))
        }
        Err(_) => {
            counters.increment(StatCounter::BadOutputFile);
            Ok(None)
        }
    }
}

fn build_cpp_argv(req: &CompilationRequest) -> Vec<String> {
    let mut argv = vec![req.compiler_path.to_string_lossy().to_string()];
    argv.extend(req.preprocessor_args.iter().cloned());
    argv.push("-E".to_string());
    argv.push(req.source_path.to_string_lossy().to_string());
    argv
}

fn build_compile_argv(req: &CompilationRequest) -> Vec<String> {
    let mut argv = vec![req.compiler_path.to_string_lossy().to_string()];
    argv.extend(req.compiler_args.iter().cloned());
    argv.push(req.source_path.to_string_lossy().to_string());
    argv.push("-o".to_string());
    argv.push(req.output_obj.to_string_lossy().to_string());
    argv
}

fn forward(output: &CompilerOutput) {
    if !output.stdout.is_empty() {
        let _ = std::io::stdout().write_all(&output.stdout);
    }
    if !output.stderr.is_empty() {
        let _ = std::io::stderr().write_all(&output.stderr);
    }
}

fn exec_original(argv: &[String]) -> Result<i32> {
    let status = Command::new(&argv[0])
        .args(&argv[1..])
        .status()
        .map_err(|e| Error::Internal(format!("failed to exec {}: {e}", argv[0])))?;
    Ok(status.code().unwrap_or(1))
}

fn namespace(config: &Config) -> String {
    config.namespace.clone().unwrap_or_default()
}

/// Read one entry, preferring local storage unless `remote_only`.
///
/// A local hit that satisfies `reshare` is pushed out to remote
/// (`overwrite=false`, per spec §4.7's reshare policy). A remote hit is
/// always pulled into local storage, regardless of `reshare` — matching
/// `examples/original_source/src/ccache/storage/storage.cpp`'s `Storage::get`,
/// where `reshare` only gates the local-hit-to-remote direction and the
/// remote-hit-to-local direction is unconditional.
fn fetch_entry(
    ctx: &EngineContext,
    key: &Digest,
    entry_type: EntryType,
    counters: &mut Counters,
) -> Result<Option<Vec<u8>>> {
    if !ctx.config.remote_only {
        if let Some(bytes) = ctx.local.get(key, entry_type)? {
            if ctx.config.reshare {
                if let Some(remote) = ctx.remote {
                    let encoded = Envelope::new(entry_type, namespace(ctx.config), bytes.clone()).encode()?;
                    remote.put(key, &encoded, false, counters);
                }
            }
            return Ok(Some(bytes));
        }
    }
    if let Some(remote) = ctx.remote {
        if let Some(raw) = remote.get(key, counters) {
            if let Ok(envelope) = Envelope::decode(&raw) {
                if envelope.entry_type == entry_type {
                    if !ctx.config.remote_only {
                        let _ = ctx.local.put(
                            key,
                            entry_type,
                            &namespace(ctx.config),
                            envelope.payload.clone(),
                            false,
                            counters,
                        );
                    }
                    return Ok(Some(envelope.payload));
                }
            }
        }
    }
    Ok(None)
}

fn put_entry(
    ctx: &EngineContext,
    key: &Digest,
    entry_type: EntryType,
    payload: Vec<u8>,
    overwrite: bool,
    counters: &mut Counters,
) -> Result<()> {
    if !ctx.config.remote_only {
        ctx.local
            .put(key, entry_type, &namespace(ctx.config), payload.clone(), overwrite, counters)?;
    }
    if let Some(remote) = ctx.remote {
        let encoded = Envelope::new(entry_type, namespace(ctx.config), payload).encode()?;
        remote.put(key, &encoded, overwrite, counters);
    }
    Ok(())
}

fn fetch_manifest(
    ctx: &EngineContext,
    key: &Digest,
    counters: &mut Counters,
) -> Result<Option<Manifest>> {
    let Some(bytes) = fetch_entry(ctx, key, EntryType::Manifest, counters)? else {
        return Ok(None);
    };
    Ok(Some(Manifest::deserialize(&bytes)?))
}

/// A stat/content snapshot of one file referenced by some entry in a
/// manifest, built once per distinct path and reused across entries.
struct ObservedFileOwned {
    path: String,
    size: u64,
    mtime: i64,
    ctime: i64,
    content_hash: [u8; 20],
}

fn build_observed(ctx: &EngineContext, manifest: &Manifest) -> Result<Vec<ObservedFileOwned>> {
    let mut paths = HashSet::new();
    for entry in manifest.entries() {
        for file in &entry.files {
            paths.insert(file.path.clone());
        }
    }

    let mut observed = Vec::new();
    for path in paths {
        let Ok(meta) = fs::metadata(&path) else {
            continue;
        };
        let (mtime, ctime) = unix_times(&meta);
        let Ok(hash) = crate::hash::hash_file(Path::new(&path), ctx.inode_cache) else {
            continue;
        };
        observed.push(ObservedFileOwned {
            path,
            size: meta.len(),
            mtime,
            ctime,
            content_hash: *hash.digest.as_bytes(),
        });
    }
    Ok(observed)
}

#[cfg(unix)]
fn unix_times(meta: &fs::Metadata) -> (i64, i64) {
    use std::os::unix::fs::MetadataExt;
    (meta.mtime(), meta.ctime())
}

#[cfg(not(unix))]
fn unix_times(meta: &fs::Metadata) -> (i64, i64) {
    let secs = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    (secs, secs)
}

/// Parse the produced depfile (if any) into the included-files list,
/// stat/hash each one, and upsert the manifest entry for `direct_key`.
fn update_manifest(
    ctx: &EngineContext,
    direct_key: &Digest,
    req: &CompilationRequest,
    result_key: Digest,
    counters: &mut Counters,
) -> Result<()> {
    let included_paths = match &req.output_dep {
        Some(dep_path) => fs::read_to_string(dep_path)
            .map(|contents| depfile::parse_included_files(&contents, &req.source_path))
            .unwrap_or_default(),
        None => Vec::new(),
    };
    let mut files = Vec::with_capacity(included_paths.len() + 1);
    files.push(build_included_file(&req.source_path, ctx.inode_cache)?);
    for path in &included_paths {
        if should_ignore(ctx.config, path) {
            continue;
        }
        if let Ok(included) = build_included_file(path, ctx.inode_cache) {
            files.push(included);
        }
    }

    let mut manifest = fetch_manifest(ctx, direct_key, counters)?.unwrap_or_default();
    manifest.upsert(files, result_key);
    let manifest_bytes = manifest.serialize()?;
    put_entry(
        ctx,
        direct_key,
        EntryType::Manifest,
        manifest_bytes,
        true,
        counters,
    )
}

fn should_ignore(config: &Config, path: &Path) -> bool {
    config.ignore_headers_in_manifest.iter().any(|p| p == path)
}

fn build_included_file(path: &Path, inode_cache: Option<&InodeCache>) -> Result<IncludedFile> {
    let meta = fs::metadata(path).map_err(|e| Error::BadInputFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let (mtime, ctime) = unix_times(&meta);
    let hash = crate::hash::hash_file(path, inode_cache)?;
    Ok(IncludedFile {
        path: path.to_string_lossy().to_string(),
        mtime,
        ctime,
        size: meta.len(),
        content_hash: *hash.digest.as_bytes(),
    })
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
