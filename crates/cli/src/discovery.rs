// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Config file discovery (spec §6 "Configuration").
//!
//! Adapted from `examples/original_source/src/ccache/config.cpp`'s
//! startup sequence: `CCACHE_CONFIGPATH` pins the user config file
//! directly; otherwise the system config comes from
//! `CCACHE_CONFIGPATH2` or a fixed `/etc/ccache.conf`, and the user
//! config lives alongside the resolved cache directory as
//! `ccache.conf`.

use std::path::{Path, PathBuf};

/// Fixed system config path used when `CCACHE_CONFIGPATH2` isn't set.
/// The original tool derives this from a configure-time `SYSCONFDIR`;
/// this wrapper has no build-time install prefix to inherit, so it
/// uses the conventional Unix location directly.
pub const DEFAULT_SYSTEM_CONFIG_PATH: &str = "/etc/ccache.conf";

/// Resolve the system config file path (lowest precedence).
pub fn system_config_path(env: &std::collections::HashMap<String, String>) -> PathBuf {
    env.get("CCACHE_CONFIGPATH2")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SYSTEM_CONFIG_PATH))
}

/// Resolve the user config file path, given the cache directory already
/// settled on by a prior (env-only) pass over `cache_dir`/`CCACHE_DIR`.
///
/// `CCACHE_CONFIGPATH` overrides this entirely, matching the original's
/// "if set, skip system config and point straight at this file" rule —
/// callers that honor that rule should skip [`system_config_path`] too.
pub fn user_config_path(
    env: &std::collections::HashMap<String, String>,
    cache_dir: &Path,
) -> PathBuf {
    if let Some(explicit) = env.get("CCACHE_CONFIGPATH") {
        return PathBuf::from(explicit);
    }
    cache_dir.join("ccache.conf")
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
