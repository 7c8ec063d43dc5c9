#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;

#[test]
fn age_in_days_converts_to_seconds() {
    assert_eq!(parse_age_secs("5d").unwrap(), 5 * 86_400);
}

#[test]
fn age_in_seconds_passes_through() {
    assert_eq!(parse_age_secs("3600s").unwrap(), 3600);
}

#[test]
fn age_without_suffix_is_seconds() {
    assert_eq!(parse_age_secs("42").unwrap(), 42);
}

#[test]
fn bad_age_is_rejected() {
    assert!(parse_age_secs("soon").is_err());
}

#[test]
fn recompress_level_uncompressed_is_zero() {
    assert_eq!(parse_recompress_level("uncompressed").unwrap(), 0);
}

#[test]
fn recompress_level_parses_integer() {
    assert_eq!(parse_recompress_level("5").unwrap(), 5);
}

#[test]
fn set_config_splits_key_value() {
    let (k, v) = parse_set_config("max_size=10G").unwrap();
    assert_eq!(k, "max_size");
    assert_eq!(v, "10G");
}

#[test]
fn set_config_rejects_missing_equals() {
    assert!(parse_set_config("max_size").is_err());
}

#[test]
fn bare_cli_is_not_an_admin_invocation() {
    let cli = Cli::parse_from(["ccforge"]);
    assert!(!cli.is_admin_invocation());
}

#[test]
fn show_stats_flag_is_an_admin_invocation() {
    let cli = Cli::parse_from(["ccforge", "--show-stats"]);
    assert!(cli.is_admin_invocation());
}
