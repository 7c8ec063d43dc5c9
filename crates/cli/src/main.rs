// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! ccforge entry point: a compiler cache wrapper.
//!
//! Dispatch mirrors ccache's own three invocation forms (spec §6,
//! `examples/original_source/src/ccache/core/mainoptions.cpp`'s usage
//! text): invoked via a symlink named after a compiler, argv is the
//! compiler invocation outright; invoked as `ccforge` with a leading
//! run of `KEY=VALUE` tokens then a compiler name, those tokens become
//! config overrides; invoked as `ccforge -<flag>`, it's an
//! administrative operation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use ccforge::cli::{self, Cli};
use ccforge::config::{self, Config};
use ccforge::digest::Digest;
use ccforge::discovery;
use ccforge::engine::{self, EngineContext};
use ccforge::envelope::EntryType;
use ccforge::error::{Error, ExitCode};
use ccforge::inode_cache::InodeCache;
use ccforge::remote::file_backend::{path_from_file_url, FileBackend};
use ccforge::remote::{self, RemoteOrchestrator};
use ccforge::store::local::LocalStorage;
use ccforge::store::stats::Counters;
use ccforge::checksum;

fn init_logging() {
    let filter = EnvFilter::try_from_env("CCACHE_RS_LOG").unwrap_or_else(|_| EnvFilter::new("off"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    let code = match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ccforge: {e}");
            match e.downcast_ref::<Error>() {
                Some(err) => ExitCode::from(err) as i32,
                None => ExitCode::InternalError as i32,
            }
        }
    };

    std::process::exit(code);
}

fn run(args: &[String]) -> anyhow::Result<i32> {
    let env: HashMap<String, String> = std::env::vars().collect();

    let basename = args
        .first()
        .and_then(|a| Path::new(a).file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("");

    if basename != "ccforge" {
        // Masquerading as the compiler itself: argv is the compile
        // invocation, unmodified, with no leading override tokens.
        let config = load_config(&env, &[])?;
        return Ok(run_compile(&config, args)?);
    }

    if args.len() > 1 && args[1].starts_with('-') {
        let cli = Cli::parse_from(args);
        return Ok(run_admin(&cli, &env)?);
    }

    let mut idx = 1;
    let mut overrides = Vec::new();
    while idx < args.len() {
        match key_value(&args[idx]) {
            Some(kv) => {
                overrides.push(kv);
                idx += 1;
            }
            None => break,
        }
    }

    if idx >= args.len() {
        return Err(Error::Argument("no compiler command given".to_string()).into());
    }

    let config = load_config(&env, &overrides)?;
    Ok(run_compile(&config, &args[idx..])?)
}

/// Recognize a leading `KEY=VALUE` override token: config keys are
/// lowercase with underscores (spec §6), never containing a `-`, which
/// keeps this from misfiring on a compiler flag like `-DFOO=1`.
fn key_value(token: &str) -> Option<(String, String)> {
    let (k, v) = token.split_once('=')?;
    if k.is_empty() || !k.chars().all(|c| c.is_ascii_lowercase() || c == '_') {
        return None;
    }
    Some((k.to_string(), v.to_string()))
}

/// The config cascade's user file lives under the cache directory,
/// which is itself a config setting — resolved here from the
/// environment alone, same as the original's startup sequence, before
/// the full cascade (which may itself relocate `cache_dir`) runs.
fn env_cache_dir(env: &HashMap<String, String>) -> PathBuf {
    if let Some(dir) = env.get("CCACHE_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(xdg) = env.get("XDG_CACHE_HOME") {
        if !xdg.is_empty() {
            return PathBuf::from(xdg).join("ccache");
        }
    }
    let home = env.get("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("/"));
    home.join(".cache/ccache")
}

fn load_config(env: &HashMap<String, String>, overrides: &[(String, String)]) -> Result<Config, Error> {
    let system_path = discovery::system_config_path(env);
    let cache_dir = env_cache_dir(env);
    let user_path = discovery::user_config_path(env, &cache_dir);
    config::load(Some(&system_path), Some(&user_path), env, overrides)
}

fn build_remote(config: &Config) -> Result<Option<RemoteOrchestrator>, Error> {
    let Some(spec) = &config.remote_storage else {
        return Ok(None);
    };
    if spec.trim().is_empty() {
        return Ok(None);
    }
    let entries = remote::config::parse_remote_storage(spec)?;
    if entries.is_empty() {
        return Ok(None);
    }

    let mut orchestrator = RemoteOrchestrator::new(config.reshare, config.remote_only);
    for entry in entries {
        tracing::debug!(entry = %remote::config::redact_for_logging(&entry), "configuring remote storage entry");
        let request_timeout = entry.request_timeout;
        orchestrator.add_entry(entry, move |url| {
            let root = path_from_file_url(url)?;
            Some(Box::new(FileBackend::new(root, request_timeout)) as Box<dyn remote::RemoteBackend>)
        })?;
    }
    Ok(Some(orchestrator))
}

fn run_compile(config: &Config, argv: &[String]) -> Result<i32, Error> {
    let local = LocalStorage::new(&config.cache_dir, config.max_files, config.max_size)?;
    let remote = build_remote(config)?;
    let inode_cache = if config.inode_cache {
        InodeCache::open(&config.cache_dir.join("inode-cache"))
    } else {
        None
    };

    let ctx = EngineContext {
        config,
        local: &local,
        remote: remote.as_ref(),
        inode_cache: inode_cache.as_ref(),
    };

    let cwd = std::env::current_dir().map_err(|e| Error::Io {
        path: PathBuf::from("."),
        source: e,
    })?;
    let mut counters = Counters::new();
    let code = engine::run(&ctx, argv, &cwd, &mut counters);

    if let Some(remote) = &remote {
        remote.stop();
    }

    code
}

fn run_admin(cli: &Cli, env: &HashMap<String, String>) -> Result<i32, Error> {
    let overrides: Vec<(String, String)> = Vec::new();
    let mut config = load_config(env, &overrides)?;
    if let Some(dir) = &cli.dir {
        config.cache_dir = dir.clone();
    }
    let local = LocalStorage::new(&config.cache_dir, config.max_files, config.max_size)?;

    if let Some(path) = &cli.checksum_file {
        let sum = checksum::checksum_file(path)?;
        println!("{}", checksum::format_checksum(&sum));
        return Ok(0);
    }

    if let Some(kv) = &cli.set_config {
        let (key, value) = cli::parse_set_config(kv).map_err(Error::Argument)?;
        let user_path = cli
            .config_path
            .clone()
            .unwrap_or_else(|| discovery::user_config_path(env, &config.cache_dir));
        append_config_line(&user_path, &key, &value)?;
        println!("{key} = {value}");
        return Ok(0);
    }

    if let Some(level) = &cli.recompress {
        let level = cli::parse_recompress_level(level).map_err(Error::Argument)?;
        let threads = cli.recompress_threads.unwrap_or_else(available_parallelism);
        let rewritten = local.recompress(level, threads)?;
        println!("recompressed {rewritten} files to level {level}");
        return Ok(0);
    }

    if cli.evict_older_than.is_some() || cli.evict_namespace.is_some() {
        let secs = cli
            .evict_older_than
            .as_deref()
            .map(cli::parse_age_secs)
            .transpose()
            .map_err(Error::Argument)?;
        let removed = local.evict(secs, cli.evict_namespace.as_deref())?;
        println!("evicted {removed} files");
        return Ok(0);
    }

    if let Some(key) = &cli.inspect {
        return run_inspect(&local, key);
    }

    if cli.clear {
        local.wipe_all()?;
        println!("cache cleared");
        return Ok(0);
    }

    if cli.cleanup {
        let removed = local.cleanup_all()?;
        println!("cleaned up {removed} files");
        return Ok(0);
    }

    if cli.zero_stats {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        local.zero_all_stats(now)?;
        println!("statistics zeroed");
        return Ok(0);
    }

    // `--show-stats` and the bare `ccforge` (no admin flags) both print
    // the current aggregate report, matching the original's default
    // action when invoked with no compiler to wrap.
    print_stats(&config, &local)?;
    Ok(0)
}

fn run_inspect(local: &LocalStorage, key: &str) -> Result<i32, Error> {
    let digest = Digest::parse_base16(key).or_else(|_| Digest::parse_path(key))?;

    for (label, entry_type) in [("manifest", EntryType::Manifest), ("result", EntryType::Result)] {
        match local.inspect(&digest, entry_type)? {
            Some(envelope) => println!(
                "{label}: namespace={:?} compression_level={} bytes={}",
                envelope.namespace,
                envelope.compression_level,
                envelope.payload.len()
            ),
            None => println!("{label}: not present"),
        }
    }
    Ok(0)
}

/// Line-oriented report only — rich table/progress-bar rendering is out
/// of scope (SPEC_FULL.md "CLI / administrative front-end surface").
fn print_stats(config: &Config, local: &LocalStorage) -> Result<(), Error> {
    println!("cache directory: {}", config.cache_dir.display());
    let counters = local.aggregate_stats()?;
    for (counter, value) in counters.iter() {
        println!("{:<28} {value}", counter.name());
    }
    println!("{:<28} {}", "stats_zeroed_unix_secs", counters.zeroed_at_unix_secs);
    Ok(())
}

fn append_config_line(path: &Path, key: &str, value: &str) -> Result<(), Error> {
    use std::io::Write as _;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
    writeln!(file, "{key} = {value}").map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
