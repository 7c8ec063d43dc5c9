#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use std::path::Path;

#[test]
fn simple_rule_extracts_prerequisites() {
    let contents = "hello.o: hello.c hello.h common.h\n";
    let got = parse_included_files(contents, Path::new("hello.c"));
    assert_eq!(got, vec![PathBuf::from("hello.h"), PathBuf::from("common.h")]);
}

#[test]
fn backslash_newline_continuation_is_joined() {
    let contents = "hello.o: hello.c \\\n  hello.h \\\n  common.h\n";
    let got = parse_included_files(contents, Path::new("hello.c"));
    assert_eq!(got, vec![PathBuf::from("hello.h"), PathBuf::from("common.h")]);
}

#[test]
fn escaped_space_in_path_is_preserved() {
    let contents = "hello.o: hello.c /usr/include/my\\ lib/foo.h\n";
    let got = parse_included_files(contents, Path::new("hello.c"));
    assert_eq!(got, vec![PathBuf::from("/usr/include/my lib/foo.h")]);
}

#[test]
fn duplicate_prerequisites_across_rules_are_deduplicated() {
    let contents = "a.o: a.c common.h\nb.o: b.c common.h\n";
    let got = parse_included_files(contents, Path::new("a.c"));
    assert_eq!(
        got.iter().filter(|p| **p == PathBuf::from("common.h")).count(),
        1
    );
    assert_eq!(got, vec![PathBuf::from("common.h"), PathBuf::from("b.c")]);
}

#[test]
fn source_file_itself_is_excluded() {
    let contents = "hello.o: hello.c hello.h\n";
    let got = parse_included_files(contents, Path::new("hello.c"));
    assert!(!got.contains(&PathBuf::from("hello.c")));
}

#[test]
fn windows_drive_letter_colon_is_not_treated_as_rule_separator() {
    let contents = "hello.o: hello.c C:\\include\\foo.h\n";
    let got = parse_included_files(contents, Path::new("hello.c"));
    assert_eq!(got, vec![PathBuf::from("C:\\include\\foo.h")]);
}
