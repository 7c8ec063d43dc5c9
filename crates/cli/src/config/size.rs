// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Size string parsing for `max_size` (spec §6).
//!
//! Grounded in `examples/original_source/src/ccache/util/string.cpp`'s
//! `parse_size`: a bare number with no suffix means gibibytes; a
//! suffix's second character of `i` (`Gi`, `Mi`, `Ki`) selects a binary
//! (1024-based) multiplier, otherwise the multiplier is decimal
//! (1000-based). Case of the unit letter doesn't matter.
//!
//! - `"5"` → 5 GiB
//! - `"512M"` → 512,000,000 bytes
//! - `"512Mi"` → 512 MiB
//! - `"1.5G"` → 1,500,000,000 bytes

/// Parse a `max_size`-style string into a byte count.
pub fn parse_size(value: &str) -> Result<u64, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("empty size string".to_string());
    }

    let split_at = value
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split_at);

    let number: f64 = number
        .parse()
        .map_err(|_| format!("invalid size: {value:?}"))?;
    if number < 0.0 {
        return Err(format!("negative size: {value:?}"));
    }

    let unit = unit.trim();
    if unit.is_empty() {
        return Ok((number * 1024.0 * 1024.0 * 1024.0) as u64);
    }

    let mut chars = unit.chars();
    let letter = chars.next().ok_or_else(|| format!("invalid size: {value:?}"))?;
    let binary = matches!(chars.next(), Some('i') | Some('I'));
    let multiplier = if binary { 1024.0 } else { 1000.0 };

    let scale = match letter.to_ascii_uppercase() {
        'K' => multiplier,
        'M' => multiplier * multiplier,
        'G' => multiplier * multiplier * multiplier,
        'T' => multiplier * multiplier * multiplier * multiplier,
        _ => return Err(format!("invalid size unit in {value:?}")),
    };

    Ok((number * scale) as u64)
}

#[cfg(test)]
#[path = "size_tests.rs"]
mod tests;
