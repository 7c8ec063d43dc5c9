// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Compiler invocation (spec §4.9, component K).
//!
//! Spawns the real compiler with stdout/stderr redirected to unique temp
//! files, resetting signal disposition in the child the way a POSIX
//! `posix_spawn` with `POSIX_SPAWN_SETSIGDEF`/`POSIX_SPAWN_SETSIGMASK`
//! would, so a compiler that ignores `SIGINT` in its parent doesn't
//! inherit that.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use nix::sys::signal::{SigSet, Signal};

use crate::error::{Error, Result};

/// One compiler run's captured output.
#[derive(Debug, Clone)]
pub struct CompilerOutput {
    pub exit_status: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Set if a GCC `-fdiagnostics-color` rejection triggered a retry
    /// without the flag (spec §4.9).
    pub diagnostics_color_failed: bool,
}

/// Run `argv` (`argv[0]` is the compiler), capturing stdout only when
/// `capture_stdout` is set (otherwise redirected to the null device), and
/// prepending `preprocessor_stderr` (if any) to the compiler's own
/// stderr.
pub fn run(
    argv: &[String],
    capture_stdout: bool,
    preprocessor_stderr: &[u8],
    temporary_dir: &Path,
    compiler_type: crate::args::CompilerType,
) -> Result<CompilerOutput> {
    run_inner(argv, capture_stdout, preprocessor_stderr, temporary_dir, compiler_type, false)
}

fn run_inner(
    argv: &[String],
    capture_stdout: bool,
    preprocessor_stderr: &[u8],
    temporary_dir: &Path,
    compiler_type: crate::args::CompilerType,
    is_retry: bool,
) -> Result<CompilerOutput> {
    let (exit_status, stdout, mut stderr) =
        spawn_and_wait(argv, capture_stdout, temporary_dir)?;

    if !is_retry
        && exit_status != 0
        && compiler_type == crate::args::CompilerType::Gcc
        && contains_subslice(&stderr, b"fdiagnostics-color")
    {
        let retried_argv: Vec<String> = argv
            .iter()
            .filter(|a| !a.starts_with("-fdiagnostics-color"))
            .cloned()
            .collect();
        let mut retried =
            run_inner(&retried_argv, capture_stdout, preprocessor_stderr, temporary_dir, compiler_type, true)?;
        retried.diagnostics_color_failed = true;
        return Ok(retried);
    }

    let mut full_stderr = preprocessor_stderr.to_vec();
    full_stderr.append(&mut stderr);

    Ok(CompilerOutput {
        exit_status,
        stdout,
        stderr: full_stderr,
        diagnostics_color_failed: false,
    })
}

fn spawn_and_wait(
    argv: &[String],
    capture_stdout: bool,
    temporary_dir: &Path,
) -> Result<(i32, Vec<u8>, Vec<u8>)> {
    if argv.is_empty() {
        return Err(Error::Internal("compiler_exec: empty argv".to_string()));
    }

    let stdout_path = unique_temp_path(temporary_dir, "stdout");
    let stderr_path = unique_temp_path(temporary_dir, "stderr");

    let stdout_file = std::fs::File::create(&stdout_path).map_err(|e| Error::Io {
        path: stdout_path.clone(),
        source: e,
    })?;
    let stderr_file = std::fs::File::create(&stderr_path).map_err(|e| Error::Io {
        path: stderr_path.clone(),
        source: e,
    })?;

    let mut command = Command::new(&argv[0]);
    command.args(&argv[1..]);
    command.stdin(Stdio::null());
    if capture_stdout {
        command.stdout(Stdio::from(stdout_file));
    } else {
        command.stdout(Stdio::null());
    }
    command.stderr(Stdio::from(stderr_file));

    // SAFETY: pre_exec runs in the forked child before exec, on the same
    // thread that called fork. Only async-signal-safe calls are made
    // here (sigprocmask via nix's SigSet), matching the narrow contract
    // `Command::pre_exec` documents.
    #[allow(unsafe_code)]
    unsafe {
        command.pre_exec(|| {
            let all = SigSet::all();
            let _ = all.thread_unblock();
            for sig in Signal::iterator() {
                let _ = nix::sys::signal::signal(sig, nix::sys::signal::SigHandler::SigDfl);
            }
            Ok(())
        });
    }

    let status = command.status().map_err(|e| Error::Internal(format!(
        "compiler_exec: failed to spawn {}: {e}",
        argv[0]
    )))?;

    let stdout = if capture_stdout {
        read_and_remove(&stdout_path)
    } else {
        let _ = std::fs::remove_file(&stdout_path);
        Vec::new()
    };
    let stderr = read_and_remove(&stderr_path);

    Ok((status.code().unwrap_or(-1), stdout, stderr))
}

fn read_and_remove(path: &Path) -> Vec<u8> {
    let mut bytes = Vec::new();
    if let Ok(mut f) = std::fs::File::open(path) {
        let _ = f.read_to_end(&mut bytes);
    }
    let _ = std::fs::remove_file(path);
    bytes
}

fn unique_temp_path(dir: &Path, label: &str) -> PathBuf {
    static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
    let unique = COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    dir.join(format!("ccache.{}.{}.{label}", std::process::id(), unique))
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

use std::os::unix::process::CommandExt as _;

#[cfg(test)]
#[path = "compiler_exec_tests.rs"]
mod tests;
