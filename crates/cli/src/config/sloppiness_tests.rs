#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;

#[test]
fn empty_string_is_all_false() {
    assert_eq!(parse_sloppiness(""), Sloppiness::default());
}

#[test]
fn single_tag_sets_one_field() {
    let s = parse_sloppiness("file_stat_matches");
    assert!(s.file_stat_matches);
    assert!(!s.file_stat_matches_ctime);
}

#[test]
fn comma_list_sets_multiple_fields() {
    let s = parse_sloppiness("file_stat_matches,include_file_mtime");
    assert!(s.file_stat_matches);
    assert!(s.include_file_mtime);
    assert!(!s.include_file_ctime);
}

#[test]
fn whitespace_around_tags_is_trimmed() {
    let s = parse_sloppiness(" file_stat_matches , include_file_ctime ");
    assert!(s.file_stat_matches);
    assert!(s.include_file_ctime);
}

#[test]
fn unknown_tag_is_ignored_not_rejected() {
    let s = parse_sloppiness("not_a_real_tag,file_stat_matches");
    assert!(s.file_stat_matches);
}
