// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency-file parsing (spec §4.8: "parse the depfile to get the
//! included-files list").
//!
//! Compiler-emitted `.d` files are Make rules: a target, a colon, then a
//! whitespace-separated (backslash-escaped, backslash-newline-continued)
//! list of prerequisites. We only need the prerequisite side.

use std::path::PathBuf;

/// Extract every prerequisite path named in a Makefile-style dependency
/// file, across all rules it contains, deduplicated in first-seen order.
pub fn parse_included_files(contents: &str, source_path: &std::path::Path) -> Vec<PathBuf> {
    let joined = join_continuations(contents);

    let mut seen = std::collections::HashSet::new();
    let mut included = Vec::new();

    for rule in joined.lines() {
        let Some(colon) = find_rule_colon(rule) else {
            continue;
        };
        let prereqs = &rule[colon + 1..];
        for token in split_unescaped_whitespace(prereqs) {
            let path = PathBuf::from(unescape(&token));
            if path == *source_path {
                continue;
            }
            if seen.insert(path.clone()) {
                included.push(path);
            }
        }
    }

    included
}

/// Join `\`-newline continuations into single logical lines.
fn join_continuations(contents: &str) -> String {
    contents.replace("\\\r\n", " ").replace("\\\n", " ")
}

/// Find the `:` that separates the target from prerequisites, skipping a
/// Windows drive-letter colon (`C:\path`).
fn find_rule_colon(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b':' {
            let is_drive_letter = i == 1 && bytes[0].is_ascii_alphabetic();
            if !is_drive_letter {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// Split on unescaped whitespace, treating `\ ` as a literal space inside
/// a token rather than a separator.
fn split_unescaped_whitespace(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                current.push('\\');
                current.push(next);
                chars.next();
                continue;
            }
        }
        if c.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Undo Make's `\ ` and `\#` escaping.
fn unescape(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next == ' ' || next == '#' {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
#[path = "depfile_tests.rs"]
mod tests;
