// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Administrative CLI surface (spec §6, SPEC_FULL.md "CLI / administrative
//! front-end surface").
//!
//! ccache's actual invocation grammar is masquerade-first: `argv[0]`
//! determines whether this process is standing in for a compiler (the
//! common case) or being invoked directly to run one of a handful of
//! admin operations. `clap` only ever sees the second form, since the
//! first form's argv is an arbitrary compiler's own flag grammar and
//! must never be parsed as ours.

use std::path::PathBuf;

use clap::Parser;

/// A compiler cache: ccforge.
#[derive(Parser, Debug)]
#[command(name = "ccforge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Operate on cache directory PATH instead of the default.
    #[arg(short = 'd', long = "dir", value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Operate on configuration file PATH instead of the default.
    #[arg(long = "config-path", value_name = "PATH")]
    pub config_path: Option<PathBuf>,

    /// Delete not recently used files and recalculate size counters.
    #[arg(short = 'c', long = "cleanup")]
    pub cleanup: bool,

    /// Clear the cache completely (except configuration).
    #[arg(short = 'C', long = "clear")]
    pub clear: bool,

    /// Show summary of configuration and statistics counters.
    #[arg(short = 's', long = "show-stats")]
    pub show_stats: bool,

    /// Zero the statistics counters.
    #[arg(short = 'z', long = "zero-stats")]
    pub zero_stats: bool,

    /// Set configuration option KEY to value VALUE.
    #[arg(short = 'o', long = "set-config", value_name = "KEY=VALUE")]
    pub set_config: Option<String>,

    /// Print the cache entries a key maps to, for debugging.
    #[arg(long = "inspect", value_name = "KEY")]
    pub inspect: Option<String>,

    /// Remove files used less recently than AGE (suffix `d` or `s`).
    #[arg(long = "evict-older-than", value_name = "AGE")]
    pub evict_older_than: Option<String>,

    /// Remove files created in namespace NAMESPACE.
    #[arg(long = "evict-namespace", value_name = "NAMESPACE")]
    pub evict_namespace: Option<String>,

    /// Recompress the cache to LEVEL (integer, or "uncompressed").
    #[arg(short = 'X', long = "recompress", value_name = "LEVEL")]
    pub recompress: Option<String>,

    /// Threads to use when recompressing; default: number of CPUs.
    #[arg(long = "recompress-threads", value_name = "THREADS")]
    pub recompress_threads: Option<usize>,

    /// Compute an ad hoc 128-bit XXH3 checksum of a file.
    #[arg(long = "checksum-file", value_name = "PATH")]
    pub checksum_file: Option<PathBuf>,
}

impl Cli {
    /// Whether any administrative flag was given — if not, the caller
    /// should treat this invocation as a bare compiler wrapper call
    /// instead (handled upstream of clap entirely; see `main.rs`).
    pub fn is_admin_invocation(&self) -> bool {
        self.cleanup
            || self.clear
            || self.show_stats
            || self.zero_stats
            || self.set_config.is_some()
            || self.inspect.is_some()
            || self.evict_older_than.is_some()
            || self.evict_namespace.is_some()
            || self.recompress.is_some()
            || self.checksum_file.is_some()
    }
}

/// Parse an age string like `"5d"` or `"3600s"` into seconds, per
/// `--evict-older-than`'s grammar.
pub fn parse_age_secs(value: &str) -> Result<u64, String> {
    let value = value.trim();
    if let Some(days) = value.strip_suffix('d') {
        return days
            .parse::<u64>()
            .map(|d| d * 86_400)
            .map_err(|_| format!("invalid age: {value:?}"));
    }
    if let Some(secs) = value.strip_suffix('s') {
        return secs.parse::<u64>().map_err(|_| format!("invalid age: {value:?}"));
    }
    value.parse::<u64>().map_err(|_| format!("invalid age: {value:?}"))
}

/// Parse `--recompress LEVEL`: an integer compression level, or the
/// literal `"uncompressed"` (meaning level 0 / store).
pub fn parse_recompress_level(value: &str) -> Result<i32, String> {
    if value == "uncompressed" {
        return Ok(0);
    }
    value.parse::<i32>().map_err(|_| format!("invalid recompress level: {value:?}"))
}

/// Parse `--set-config KEY=VALUE`.
pub fn parse_set_config(value: &str) -> Result<(String, String), String> {
    value
        .split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got {value:?}"))
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
