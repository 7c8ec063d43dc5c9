// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration cascade (spec §6, component L).
//!
//! Settings are read, lowest precedence first: the system config file,
//! the user config file, `CCACHE_*` environment variables (with
//! `CCACHE_NO<KEY>` boolean negation), then command-line `KEY=VALUE`
//! overrides. The resulting [`Config`] is immutable once built — pass it
//! by shared reference or `Arc` (spec §2: "consumed by all components
//! (read-only at runtime)").

mod size;
mod sloppiness;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::args::compiler_type::CompilerType;
use crate::error::{Error, Result};
use crate::hash::CompilerCheck;
use crate::manifest::Sloppiness;

pub use size::parse_size;
pub use sloppiness::parse_sloppiness;

/// `response_file_format` (spec §6): which quoting convention governs an
/// `@file` compiler argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFileFormat {
    Posix,
    Windows,
}

/// The fully resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_dir: Option<PathBuf>,
    pub cache_dir: PathBuf,
    pub compiler: Option<String>,
    pub compiler_check: CompilerCheck,
    pub compiler_type: Option<CompilerType>,
    pub compression: bool,
    pub compression_level: i32,
    pub cpp_extension: Option<String>,
    pub depend_mode: bool,
    pub direct_mode: bool,
    pub disable: bool,
    pub extra_files_to_hash: Vec<PathBuf>,
    pub file_clone: bool,
    pub hard_link: bool,
    pub hash_dir: bool,
    pub ignore_headers_in_manifest: Vec<PathBuf>,
    pub ignore_options: Vec<String>,
    pub inode_cache: bool,
    pub keep_comments_cpp: bool,
    pub max_files: u64,
    pub max_size: u64,
    pub msvc_dep_prefix: String,
    pub namespace: Option<String>,
    pub read_only: bool,
    pub read_only_direct: bool,
    pub recache: bool,
    pub reshare: bool,
    pub remote_only: bool,
    pub remote_storage: Option<String>,
    pub response_file_format: ResponseFileFormat,
    pub sloppiness: Sloppiness,
    pub stats: bool,
    pub stats_log: Option<PathBuf>,
    pub temporary_dir: PathBuf,
    pub umask: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: None,
            cache_dir: default_cache_dir(),
            compiler: None,
            compiler_check: CompilerCheck::Mtime,
            compiler_type: None,
            compression: true,
            compression_level: 0,
            cpp_extension: None,
            depend_mode: false,
            direct_mode: true,
            disable: false,
            extra_files_to_hash: Vec::new(),
            file_clone: false,
            hard_link: false,
            hash_dir: true,
            ignore_headers_in_manifest: Vec::new(),
            ignore_options: Vec::new(),
            inode_cache: true,
            keep_comments_cpp: false,
            max_files: 0,
            max_size: 5 * 1024 * 1024 * 1024,
            msvc_dep_prefix: "Note: including file:".to_string(),
            namespace: None,
            read_only: false,
            read_only_direct: false,
            recache: false,
            reshare: false,
            remote_only: false,
            remote_storage: None,
            response_file_format: ResponseFileFormat::Posix,
            sloppiness: Sloppiness::default(),
            stats: true,
            stats_log: None,
            temporary_dir: std::env::temp_dir(),
            umask: None,
        }
    }
}

/// Default cache dir, following `examples/original_source/src/ccache/config.cpp`'s
/// `default_cache_dir`: `$XDG_CACHE_HOME/ccache` if set, else `~/.cache/ccache`.
fn default_cache_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        if !xdg.is_empty() {
            return PathBuf::from(xdg).join("ccache");
        }
    }
    home_dir().join(".cache/ccache")
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/"))
}

/// Load the full cascade: system config, user config, environment,
/// then `overrides` (already-split `KEY=VALUE` command-line settings,
/// highest precedence).
pub fn load(
    system_config_path: Option<&Path>,
    user_config_path: Option<&Path>,
    env: &HashMap<String, String>,
    overrides: &[(String, String)],
) -> Result<Config> {
    let mut settings: HashMap<String, String> = HashMap::new();

    if let Some(path) = system_config_path {
        merge_file(path, &mut settings)?;
    }
    if let Some(path) = user_config_path {
        merge_file(path, &mut settings)?;
    }
    apply_env(env, &mut settings);
    for (key, value) in overrides {
        settings.insert(key.clone(), value.clone());
    }

    build(&settings)
}

/// Read one `key = value` config file, skipping blank lines and `#`
/// comments, and merge its settings into `out` (later files win, so
/// the caller passes system before user).
fn merge_file(path: &Path, out: &mut HashMap<String, String>) -> Result<()> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(Error::Config {
                message: e.to_string(),
                path: Some(path.to_path_buf()),
            });
        }
    };

    for (lineno, line) in content.lines().enumerate() {
        let Some((key, value)) = parse_line(line) else {
            continue;
        };
        if key.is_empty() {
            return Err(Error::Config {
                message: format!("malformed config line {}", lineno + 1),
                path: Some(path.to_path_buf()),
            });
        }
        out.insert(key.to_string(), value.to_string());
    }
    Ok(())
}

/// Parse one config-file line into `(key, value)`, trimmed. Returns
/// `None` for blank lines and `#`-comments; `Some(("", _))` for a
/// malformed non-blank line (the caller turns that into an error with
/// line-number context it alone has).
fn parse_line(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    match trimmed.split_once('=') {
        Some((k, v)) => Some((k.trim(), v.trim())),
        None => Some(("", "")),
    }
}

/// Merge `CCACHE_*` environment variables into `settings`. A bare
/// `CCACHE_NO<KEY>` (value ignored) forces a boolean key to `"false"`,
/// matching ccache's negation convention for flags.
fn apply_env(env: &HashMap<String, String>, settings: &mut HashMap<String, String>) {
    for (name, value) in env {
        let Some(rest) = name.strip_prefix("CCACHE_") else {
            continue;
        };
        if let Some(key) = rest.strip_prefix("NO") {
            settings.insert(key.to_ascii_lowercase(), "false".to_string());
        } else {
            settings.insert(rest.to_ascii_lowercase(), value.clone());
        }
    }
}

fn build(settings: &HashMap<String, String>) -> Result<Config> {
    let mut config = Config::default();

    let get = |key: &str| settings.get(key).map(String::as_str);
    let get_bool = |key: &str, default: bool| match get(key) {
        Some("true") | Some("yes") | Some("1") => true,
        Some("false") | Some("no") | Some("0") => false,
        Some(other) => {
            tracing::warn!(key, value = other, "expected a boolean, keeping default");
            default
        }
        None => default,
    };
    let get_paths = |key: &str| -> Vec<PathBuf> {
        get(key)
            .map(|v| v.split(':').filter(|s| !s.is_empty()).map(PathBuf::from).collect())
            .unwrap_or_default()
    };

    if let Some(v) = get("base_dir") {
        config.base_dir = Some(PathBuf::from(v));
    }
    if let Some(v) = get("cache_dir") {
        config.cache_dir = PathBuf::from(v);
    }
    if let Some(v) = get("compiler") {
        config.compiler = Some(v.to_string());
    }
    if let Some(v) = get("compiler_check") {
        config.compiler_check = parse_compiler_check(v);
    }
    if let Some(v) = get("compiler_type") {
        config.compiler_type = parse_compiler_type(v);
    }
    config.compression = get_bool("compression", config.compression);
    if let Some(v) = get("compression_level") {
        config.compression_level = v.parse().map_err(|_| Error::Config {
            message: format!("invalid compression_level: {v:?}"),
            path: None,
        })?;
    }
    if let Some(v) = get("cpp_extension") {
        config.cpp_extension = Some(v.to_string());
    }
    config.depend_mode = get_bool("depend_mode", config.depend_mode);
    config.direct_mode = get_bool("direct_mode", config.direct_mode);
    config.disable = get_bool("disable", config.disable);
    config.extra_files_to_hash = get_paths("extra_files_to_hash");
    config.file_clone = get_bool("file_clone", config.file_clone);
    config.hard_link = get_bool("hard_link", config.hard_link);
    config.hash_dir = get_bool("hash_dir", config.hash_dir);
    config.ignore_headers_in_manifest = get_paths("ignore_headers_in_manifest");
    if let Some(v) = get("ignore_options") {
        config.ignore_options = v.split_whitespace().map(str::to_string).collect();
    }
    config.inode_cache = get_bool("inode_cache", config.inode_cache);
    config.keep_comments_cpp = get_bool("keep_comments_cpp", config.keep_comments_cpp);
    if let Some(v) = get("max_files") {
        config.max_files = v.parse().map_err(|_| Error::Config {
            message: format!("invalid max_files: {v:?}"),
            path: None,
        })?;
    }
    if let Some(v) = get("max_size") {
        config.max_size = size::parse_size(v).map_err(|message| Error::Config { message, path: None })?;
    }
    if let Some(v) = get("msvc_dep_prefix") {
        config.msvc_dep_prefix = v.to_string();
    }
    if let Some(v) = get("namespace") {
        config.namespace = Some(v.to_string());
    }
    config.read_only = get_bool("read_only", config.read_only);
    config.read_only_direct = get_bool("read_only_direct", config.read_only_direct);
    config.recache = get_bool("recache", config.recache);
    config.reshare = get_bool("reshare", config.reshare);
    config.remote_only = get_bool("remote_only", config.remote_only);
    if let Some(v) = get("remote_storage") {
        config.remote_storage = Some(v.to_string());
    }
    if let Some(v) = get("response_file_format") {
        config.response_file_format = match v {
            "windows" => ResponseFileFormat::Windows,
            _ => ResponseFileFormat::Posix,
        };
    }
    if let Some(v) = get("sloppiness") {
        config.sloppiness = sloppiness::parse_sloppiness(v);
    }
    config.stats = get_bool("stats", config.stats);
    if let Some(v) = get("stats_log") {
        config.stats_log = Some(PathBuf::from(v));
    }
    if let Some(v) = get("temporary_dir") {
        config.temporary_dir = PathBuf::from(v);
    }
    if let Some(v) = get("umask") {
        config.umask = Some(u32::from_str_radix(v, 8).map_err(|_| Error::Config {
            message: format!("invalid umask: {v:?}"),
            path: None,
        })?);
    }

    Ok(config)
}

fn parse_compiler_check(value: &str) -> CompilerCheck {
    match value {
        "content" => CompilerCheck::Content,
        "none" => CompilerCheck::None,
        "mtime" => CompilerCheck::Mtime,
        other => {
            if let Some(cmd) = other.strip_prefix("string:") {
                CompilerCheck::String(cmd.to_string())
            } else {
                CompilerCheck::Command(other.to_string())
            }
        }
    }
}

fn parse_compiler_type(value: &str) -> Option<CompilerType> {
    match value {
        "auto" => None,
        "gcc" => Some(CompilerType::Gcc),
        "clang" => Some(CompilerType::Clang),
        "msvc" => Some(CompilerType::Msvc),
        "nvcc" => Some(CompilerType::Nvcc),
        _ => Some(CompilerType::Other),
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
