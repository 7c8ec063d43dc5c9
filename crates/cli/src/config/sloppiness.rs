// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `sloppiness` comma-list parsing into [`crate::manifest::Sloppiness`]
//! (spec §4.4, spec §6).

use crate::manifest::Sloppiness;

/// Parse a comma-separated `sloppiness` value. Unknown tags are ignored
/// rather than rejected, matching ccache's forward-compatible stance on
/// this setting (a newer tag in an older binary's config shouldn't be
/// fatal).
pub fn parse_sloppiness(value: &str) -> Sloppiness {
    let mut sloppiness = Sloppiness::default();
    for tag in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match tag {
            "file_stat_matches" => sloppiness.file_stat_matches = true,
            "file_stat_matches_ctime" => sloppiness.file_stat_matches_ctime = true,
            "include_file_mtime" => sloppiness.include_file_mtime = true,
            "include_file_ctime" => sloppiness.include_file_ctime = true,
            _ => {}
        }
    }
    sloppiness
}

#[cfg(test)]
#[path = "sloppiness_tests.rs"]
mod tests;
