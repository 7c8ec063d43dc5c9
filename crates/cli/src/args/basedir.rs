//! Base-dir rewriting for path-valued options (spec §4.2).
//!
//! "If configured with a `base_dir`, any absolute path-valued option
//! whose path has `base_dir` as prefix is rewritten to a path relative to
//! the current working directory. ... Relative paths are normalized
//! lexically."

use std::path::{Path, PathBuf};

/// Rewrite `path` relative to `cwd` if `base_dir` is set and is a prefix
/// of `path`'s absolute form; otherwise normalize lexically and return
/// unchanged otherwise.
pub fn rewrite(path: &str, base_dir: Option<&Path>, cwd: &Path) -> String {
    let Some(base_dir) = base_dir else {
        return normalize_lexically(path);
    };

    let path_buf = PathBuf::from(path);
    let absolute = if path_buf.is_absolute() {
        path_buf
    } else {
        cwd.join(&path_buf)
    };

    if let Ok(relative_to_base) = absolute.strip_prefix(base_dir) {
        // Rewritten relative to cwd, per spec: a path under base_dir is
        // expressed relative to cwd so two checkouts of the same tree at
        // different absolute locations hash identically.
        let absolute_under_base = base_dir.join(relative_to_base);
        if let Ok(relative_to_cwd) = pathdiff(&absolute_under_base, cwd) {
            return normalize_lexically(&relative_to_cwd.to_string_lossy());
        }
    }

    normalize_lexically(path)
}

/// Lexical (no filesystem access) `..`/`.` normalization, matching the
/// "Relative paths are normalized lexically" rule.
fn normalize_lexically(path: &str) -> String {
    let is_absolute = path.starts_with('/');
    let mut out: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                if matches!(out.last(), Some(last) if *last != "..") {
                    out.pop();
                } else if !is_absolute {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    let joined = out.join("/");
    if is_absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Minimal lexical path-diff: how to express `target` relative to
/// `from`, without touching the filesystem.
fn pathdiff(target: &Path, from: &Path) -> Result<PathBuf, ()> {
    let target_components: Vec<_> = target.components().collect();
    let from_components: Vec<_> = from.components().collect();

    let common = target_components
        .iter()
        .zip(from_components.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = PathBuf::new();
    for _ in common..from_components.len() {
        result.push("..");
    }
    for component in &target_components[common..] {
        result.push(component.as_os_str());
    }
    if result.as_os_str().is_empty() {
        Ok(PathBuf::from("."))
    } else {
        Ok(result)
    }
}

#[cfg(test)]
#[path = "basedir_tests.rs"]
mod tests;
