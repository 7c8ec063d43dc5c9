//! Compiler-type auto-detection from `argv[0]` (spec §4.2: "compiler
//! type, auto-guessed from argv[0] via filename token matching, with
//! symlink+hardlink resolution on POSIX").

use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerType {
    Gcc,
    Clang,
    Msvc,
    Nvcc,
    Other,
}

impl CompilerType {
    /// Guess from the basename of the compiler path, after resolving
    /// symlinks so wrapper installs (`cc -> ccforge -> actual gcc`) are
    /// classified by what they actually invoke, not the wrapper name.
    pub fn detect(compiler_path: &Path) -> Self {
        let resolved = std::fs::canonicalize(compiler_path).unwrap_or_else(|_| compiler_path.to_path_buf());
        let name = resolved
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        Self::from_filename_token(&name)
    }

    /// Pure filename-token classification, independent of filesystem
    /// resolution — exposed separately so it's testable without needing
    /// to fabricate real binaries on disk.
    pub fn from_filename_token(name: &str) -> Self {
        if name.contains("nvcc") {
            CompilerType::Nvcc
        } else if name.contains("clang") {
            CompilerType::Clang
        } else if name == "cl" || name.ends_with("cl.exe") {
            CompilerType::Msvc
        } else if name.contains("gcc")
            || name.contains("g++")
            || name == "cc"
            || name == "c++"
            || name.ends_with("-gcc")
            || name.ends_with("-g++")
        {
            CompilerType::Gcc
        } else {
            CompilerType::Other
        }
    }

    /// Whether this compiler uses MSVC-style `/`-prefixed options
    /// (spec §4.1 "A separate compiler-specific table exists for
    /// MSVC-style `/`-prefixed options").
    pub fn uses_slash_options(self) -> bool {
        matches!(self, CompilerType::Msvc)
    }
}

#[cfg(test)]
#[path = "compiler_type_tests.rs"]
mod tests;
