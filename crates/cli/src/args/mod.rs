//! Arg processor (spec §4.2, component B).
//!
//! Turns raw argv plus the detected compiler type into a
//! [`CompilationRequest`] and the three argument sequences the compile
//! engine needs: `preprocessor_args`, `compiler_args`,
//! `extra_args_to_hash`.

pub mod basedir;
pub mod compiler_type;

use std::path::{Path, PathBuf};

pub use compiler_type::CompilerType;

use crate::compopt::{self, OptionFlags};
use crate::error::Error;
use crate::store::stats::StatCounter;

/// Options that must be mixed into the direct-mode hash without
/// appearing in `preprocessor_args` (spec §4.2's explicit examples).
const EXTRA_HASH_PREFIXES: &[&str] =
    &["-Werror", "-Xlinker", "-Wa,", "-MD", "-MMD", "-MF", "-MT", "-MQ"];

/// The parsed, normalized shape of one compilation (spec §3
/// "CompilationRequest").
#[derive(Debug, Clone)]
pub struct CompilationRequest {
    pub compiler_path: PathBuf,
    pub compiler_type: CompilerType,
    pub source_path: PathBuf,
    pub output_obj: PathBuf,
    pub output_dep: Option<PathBuf>,
    pub actual_language: String,
    pub preprocessor_args: Vec<String>,
    pub compiler_args: Vec<String>,
    pub extra_args_to_hash: Vec<String>,
    pub generating_pch: bool,
    pub using_pch: Option<PathBuf>,
    pub expect_output_obj: bool,
    /// Set when any seen option is `TOO_HARD_DIRECT` (spec §4.8: "If any
    /// option is `TOO_HARD_DIRECT`, direct mode is skipped").
    pub direct_mode_disallowed: bool,
}

/// Guess a source language from its file extension, used when `-x` is
/// absent.
fn language_from_extension(path: &Path) -> String {
    match path.extension().and_then(|e| e.to_str()) {
        Some("c") => "c",
        Some("cc") | Some("cpp") | Some("cxx") | Some("C") => "c++",
        Some("m") => "objective-c",
        Some("mm") => "objective-c++",
        _ => "c",
    }
    .to_string()
}

/// Parse `argv` (excluding the compiler path itself, which is `argv[0]`)
/// into a [`CompilationRequest`]. Returns an uncacheable [`Error`] for
/// any of the shapes spec §4.2 rules out.
pub fn process(
    argv: &[String],
    compiler_type: CompilerType,
    base_dir: Option<&Path>,
    cwd: &Path,
) -> crate::error::Result<CompilationRequest> {
    if argv.is_empty() {
        return Err(Error::Argument("empty argv".to_string()));
    }
    let compiler_path = PathBuf::from(&argv[0]);
    let rest = &argv[1..];

    let mut source_path: Option<PathBuf> = None;
    let mut output_obj: Option<PathBuf> = None;
    let mut output_dep: Option<PathBuf> = None;
    let mut language_override: Option<String> = None;
    let mut saw_compile_only = false;
    let mut xarch_host = false;
    let mut xarch_device = false;
    let mut using_pch: Option<PathBuf> = None;

    let mut preprocessor_args = Vec::new();
    let mut compiler_args = Vec::new();
    let mut extra_args_to_hash = Vec::new();
    let mut direct_mode_disallowed = false;
    let mut msvc_generating_pch = false;
    let mut msvc_debug_flags: Vec<&str> = Vec::new();

    let mut i = 0;
    while i < rest.len() {
        let arg = &rest[i];

        if compiler_type.uses_slash_options() && arg.starts_with('/') {
            if let Some(rest_of) = arg.strip_prefix("/Yc") {
                msvc_generating_pch = true;
                compiler_args.push(arg.clone());
                if !rest_of.is_empty() {
                    let rewritten = basedir::rewrite(rest_of, base_dir, cwd);
                    preprocessor_args.push(format!("/Yc{rewritten}"));
                }
                i += 1;
                continue;
            }
            if let Some(rest_of) = arg.strip_prefix("/Yu") {
                if !rest_of.is_empty() {
                    using_pch = Some(PathBuf::from(basedir::rewrite(rest_of, base_dir, cwd)));
                }
                preprocessor_args.push(arg.clone());
                compiler_args.push(arg.clone());
                i += 1;
                continue;
            }
            if arg == "/Z7" || arg == "/Zi" || arg == "/ZI" {
                msvc_debug_flags.push(arg);
                compiler_args.push(arg.clone());
                i += 1;
                continue;
            }
            if let Some((name, flags)) = compopt::lookup_slash_prefix(arg) {
                classify_and_push(
                    arg,
                    name,
                    flags,
                    rest,
                    &mut i,
                    base_dir,
                    cwd,
                    &mut preprocessor_args,
                    &mut compiler_args,
                    &mut extra_args_to_hash,
                )?;
                continue;
            }
            preprocessor_args.push(arg.clone());
            compiler_args.push(arg.clone());
            i += 1;
            continue;
        }

        match arg.as_str() {
            "-c" => {
                saw_compile_only = true;
                compiler_args.push(arg.clone());
                i += 1;
                continue;
            }
            "-E" | "-M" | "-MM" => {
                return Err(uncacheable(
                    format!("{arg} produces preprocessor-only output"),
                    StatCounter::Uncacheable,
                ));
            }
            "-o" => {
                let value = rest.get(i + 1).ok_or_else(|| {
                    Error::BadCompilerArguments(format!("{arg} requires an argument"))
                })?;
                if value == "-" {
                    return Err(uncacheable(
                        "-o - writes output to stdout".to_string(),
                        StatCounter::Uncacheable,
                    ));
                }
                output_obj = Some(PathBuf::from(value));
                i += 2;
                continue;
            }
            "-x" => {
                let value = rest.get(i + 1).ok_or_else(|| {
                    Error::BadCompilerArguments("-x requires an argument".to_string())
                })?;
                // `-xCODE` (uppercase tail) is Intel's codegen option, not
                // a language selector.
                if !value.chars().next().map(|c| c.is_ascii_uppercase()).unwrap_or(false) {
                    language_override = Some(value.clone());
                }
                preprocessor_args.push(arg.clone());
                preprocessor_args.push(value.clone());
                compiler_args.push(arg.clone());
                compiler_args.push(value.clone());
                i += 2;
                continue;
            }
            "-Xarch_host" => {
                if xarch_device {
                    return Err(Error::UnsupportedCompilerOption(
                        "-Xarch_host and -Xarch_device cannot be combined".to_string(),
                    ));
                }
                xarch_host = true;
                compiler_args.push(arg.clone());
                i += 1;
                continue;
            }
            "-Xarch_device" => {
                if xarch_host {
                    return Err(Error::UnsupportedCompilerOption(
                        "-Xarch_host and -Xarch_device cannot be combined".to_string(),
                    ));
                }
                xarch_device = true;
                compiler_args.push(arg.clone());
                i += 1;
                continue;
            }
            "-include" if compiler_type != CompilerType::Msvc => {
                let value = rest.get(i + 1).ok_or_else(|| {
                    Error::BadCompilerArguments("-include requires an argument".to_string())
                })?;
                using_pch = detect_pch(value);
                let rewritten = basedir::rewrite(value, base_dir, cwd);
                preprocessor_args.push(arg.clone());
                preprocessor_args.push(rewritten.clone());
                compiler_args.push(arg.clone());
                compiler_args.push(rewritten);
                i += 2;
                continue;
            }
            "-fdiagnostics-color" | "-fdiagnostics-color=always" => {
                compiler_args.push(arg.clone());
                i += 1;
                continue;
            }
            _ => {}
        }

        if let Some((name, flags)) = compopt::lookup_concat_prefix(arg) {
            direct_mode_disallowed |= flags.contains(OptionFlags::TOO_HARD_DIRECT);
            classify_and_push(
                arg,
                name,
                flags,
                rest,
                &mut i,
                base_dir,
                cwd,
                &mut preprocessor_args,
                &mut compiler_args,
                &mut extra_args_to_hash,
            )?;
            continue;
        }

        if let Some(flags) = compopt::lookup(arg) {
            if flags.contains(OptionFlags::TOO_HARD) {
                return Err(uncacheable(
                    format!("unsupported option {arg}"),
                    StatCounter::UnsupportedCompilerOption,
                ));
            }
            direct_mode_disallowed |= flags.contains(OptionFlags::TOO_HARD_DIRECT);
            classify_and_push(
                arg,
                arg,
                flags,
                rest,
                &mut i,
                base_dir,
                cwd,
                &mut preprocessor_args,
                &mut compiler_args,
                &mut extra_args_to_hash,
            )?;
            continue;
        }

        if EXTRA_HASH_PREFIXES.iter().any(|p| arg.starts_with(p)) {
            extra_args_to_hash.push(arg.clone());
            compiler_args.push(arg.clone());
            i += 1;
            continue;
        }

        if !arg.starts_with('-') {
            if source_path.is_some() {
                return Err(uncacheable(
                    "multiple source files".to_string(),
                    StatCounter::Uncacheable,
                ));
            }
            source_path = Some(PathBuf::from(arg));
            i += 1;
            continue;
        }

        // Unclassified option: keep it in both streams, matching the
        // original's conservative default for options the table doesn't
        // name explicitly.
        preprocessor_args.push(arg.clone());
        compiler_args.push(arg.clone());
        i += 1;
    }

    if !validate_msvc_debug_format(&msvc_debug_flags) {
        return Err(Error::UnsupportedCompilerOption(
            "/Z7 cannot be combined with /Zi or /ZI unless /Zi precedes /Z7".to_string(),
        ));
    }

    let source_path = source_path
        .ok_or_else(|| Error::BadCompilerArguments("no input source file".to_string()))?;
    if !saw_compile_only {
        compiler_args.push("-c".to_string());
    }

    let actual_language = language_override.unwrap_or_else(|| language_from_extension(&source_path));
    let generating_pch = actual_language.ends_with("-header") || msvc_generating_pch;

    let output_obj = output_obj.unwrap_or_else(|| {
        let mut p = source_path.clone();
        p.set_extension("o");
        p
    });

    if output_dep.is_none() {
        if let Some(pos) = extra_args_to_hash.iter().position(|a| a == "-MF") {
            if let Some(path) = extra_args_to_hash.get(pos + 1) {
                output_dep = Some(PathBuf::from(path));
            }
        }
    }

    Ok(CompilationRequest {
        compiler_path,
        compiler_type,
        source_path,
        output_obj,
        output_dep,
        actual_language,
        preprocessor_args,
        compiler_args,
        extra_args_to_hash,
        generating_pch,
        using_pch,
        expect_output_obj: true,
        direct_mode_disallowed,
    })
}

#[allow(clippy::too_many_arguments)]
fn classify_and_push(
    raw_arg: &str,
    table_name: &str,
    flags: OptionFlags,
    rest: &[String],
    i: &mut usize,
    base_dir: Option<&Path>,
    cwd: &Path,
    preprocessor_args: &mut Vec<String>,
    compiler_args: &mut Vec<String>,
    extra_args_to_hash: &mut Vec<String>,
) -> crate::error::Result<()> {
    let (rendered_arg, advance) = if flags.contains(OptionFlags::TAKES_CONCAT_ARG) {
        if raw_arg.len() > table_name.len() {
            let value = &raw_arg[table_name.len()..];
            let value = normalize_value(table_name, value);
            let rewritten = if flags.contains(OptionFlags::TAKES_PATH) {
                basedir::rewrite(&value, base_dir, cwd)
            } else {
                value
            };
            (format!("{table_name}{rewritten}"), 1)
        } else {
            let value = rest.get(*i + 1).ok_or_else(|| {
                Error::BadCompilerArguments(format!("{table_name} requires an argument"))
            })?;
            let rewritten = if flags.contains(OptionFlags::TAKES_PATH) {
                basedir::rewrite(value, base_dir, cwd)
            } else {
                value.clone()
            };
            (format!("{table_name}{rewritten}"), 2)
        }
    } else if flags.contains(OptionFlags::TAKES_ARG) {
        let value = rest.get(*i + 1).ok_or_else(|| {
            Error::BadCompilerArguments(format!("{table_name} requires an argument"))
        })?;
        let rewritten = if flags.contains(OptionFlags::TAKES_PATH) {
            basedir::rewrite(value, base_dir, cwd)
        } else {
            value.clone()
        };
        let joined = format!("{raw_arg} {rewritten}");
        (joined, 2)
    } else {
        (raw_arg.to_string(), 1)
    };

    if flags.contains(OptionFlags::AFFECTS_CPP) {
        for piece in rendered_arg.split(' ') {
            preprocessor_args.push(piece.to_string());
        }
    } else if EXTRA_HASH_PREFIXES.iter().any(|p| table_name.starts_with(p)) {
        for piece in rendered_arg.split(' ') {
            extra_args_to_hash.push(piece.to_string());
        }
    }
    for piece in rendered_arg.split(' ') {
        compiler_args.push(piece.to_string());
    }

    *i += advance;
    Ok(())
}

/// `-MF=foo` normalizes to `-MFfoo` (spec §4.2).
fn normalize_value(table_name: &str, value: &str) -> String {
    if table_name == "-MF" {
        value.strip_prefix('=').unwrap_or(value).to_string()
    } else {
        value.to_string()
    }
}

/// MSVC debug-format conflict check (spec §4.2: "`/Z7` plus `/Zi`/`/ZI`
/// is unsupported unless `/Zi` precedes `/Z7`"). `seen` holds `/Z7`,
/// `/Zi`, `/ZI` tokens in the order they appeared in argv.
fn validate_msvc_debug_format(seen: &[&str]) -> bool {
    let z7 = seen.iter().position(|&s| s == "/Z7");
    let Some(z7) = z7 else {
        return true;
    };
    if seen.iter().any(|&s| s == "/ZI") {
        return false;
    }
    match seen.iter().position(|&s| s == "/Zi") {
        Some(zi) => zi < z7,
        None => true,
    }
}

fn detect_pch(included: &str) -> Option<PathBuf> {
    let path = Path::new(included);
    let ext_is_pch = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "gch" || e == "pch")
        .unwrap_or(false);
    if ext_is_pch {
        Some(path.to_path_buf())
    } else {
        None
    }
}

fn uncacheable(reason: String, counter: StatCounter) -> Error {
    Error::Uncacheable { reason, counter }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
