// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the compiler cache core.
//!
//! Every failure the engine can hit maps to one of these kinds, which in
//! turn maps to a statistics counter (see [`crate::store::stats`]) and a
//! recovery policy: fall through to plain compiler execution, surface to
//! the caller, or isolate a single remote backend and continue.

use std::path::PathBuf;

use crate::store::stats::StatCounter;

/// Core error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The invocation shape prevents caching (multiple sources, `-E`, `-o -`, ...).
    #[error("uncacheable: {reason}")]
    Uncacheable {
        reason: String,
        counter: StatCounter,
    },

    /// A known but unhandled compiler option was present.
    #[error("unsupported compiler option: {0}")]
    UnsupportedCompilerOption(String),

    /// Malformed argv (e.g. missing required argument to an option).
    #[error("bad compiler arguments: {0}")]
    BadCompilerArguments(String),

    /// Source or included file unreadable or malformed.
    #[error("bad input file: {path}: {message}")]
    BadInputFile { path: PathBuf, message: String },

    /// Cannot write the object output.
    #[error("bad output file: {path}: {message}")]
    BadOutputFile { path: PathBuf, message: String },

    /// A cache entry referenced a file that vanished mid-read.
    #[error("missing cache file: {0}")]
    MissingCacheFile(String),

    /// Invariant violated.
    #[error("internal error: {0}")]
    Internal(String),

    /// A remote backend failed outright.
    #[error("remote storage error ({shard}): {message}")]
    RemoteStorageError { shard: String, message: String },

    /// A remote backend call exceeded its configured timeout.
    #[error("remote storage timeout ({shard}) after {millis}ms")]
    RemoteStorageTimeout { shard: String, millis: u64 },

    /// The compiler itself exited non-zero; nothing is cached.
    #[error("compile failed with exit code {0}")]
    CompileFailed(i32),

    /// I/O error without a more specific classification above.
    #[error("io error: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file or value invalid.
    #[error("config error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Invalid command-line arguments to the wrapper itself.
    #[error("argument error: {0}")]
    Argument(String),
}

impl Error {
    /// The statistics counter this error should increment.
    ///
    /// Some variants (bad output file, internal error) are fatal to the
    /// invocation and are surfaced rather than silently swallowed, but we
    /// still record them so aggregate stats reflect how often builds hit
    /// the unhappy path.
    pub fn counter(&self) -> StatCounter {
        match self {
            Error::Uncacheable { counter, .. } => *counter,
            Error::UnsupportedCompilerOption(_) => StatCounter::UnsupportedCompilerOption,
            Error::BadCompilerArguments(_) => StatCounter::BadCompilerArguments,
            Error::BadInputFile { .. } => StatCounter::BadInputFile,
            Error::BadOutputFile { .. } => StatCounter::BadOutputFile,
            Error::MissingCacheFile(_) => StatCounter::MissingCacheFile,
            Error::Internal(_) => StatCounter::InternalError,
            Error::RemoteStorageError { .. } => StatCounter::RemoteStorageError,
            Error::RemoteStorageTimeout { .. } => StatCounter::RemoteStorageTimeout,
            Error::CompileFailed(_) => StatCounter::CompileFailed,
            Error::Io { .. } => StatCounter::InternalError,
            Error::Config { .. } | Error::Argument(_) => StatCounter::BadCompilerArguments,
        }
    }

    /// Whether this error means "fall back to running the original argv
    /// unchanged" (spec §7's user-visible failure policy) rather than
    /// being fatal to the invocation.
    pub fn falls_back_to_exec(&self) -> bool {
        matches!(
            self,
            Error::Uncacheable { .. }
                | Error::UnsupportedCompilerOption(_)
                | Error::BadCompilerArguments(_)
                | Error::BadInputFile { .. }
        )
    }
}

/// Result type using the core [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Process exit codes.
///
/// Per spec §6: the wrapped compiler's exit code on a compile, 0 on
/// successful administrative operations, distinct non-zero codes only on
/// internal errors of the wrapper itself (never the compiler).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    ConfigError = 2,
    InternalError = 3,
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err {
            Error::Config { .. } | Error::Argument(_) => ExitCode::ConfigError,
            _ => ExitCode::InternalError,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
