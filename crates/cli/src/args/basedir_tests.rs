#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use std::path::Path;

#[test]
fn sysroot_under_root_base_dir_rewrites_relative_to_cwd() {
    let base_dir = Path::new("/");
    let cwd = Path::new("/home/user/project");
    let rewritten = rewrite("/home/user/project/foo", Some(base_dir), cwd);
    assert_eq!(rewritten, "foo");
}

#[test]
fn path_outside_base_dir_is_left_unrewritten_but_normalized() {
    let base_dir = Path::new("/tmp/proj");
    let cwd = Path::new("/tmp/proj/build");
    let rewritten = rewrite("/other/place/foo", Some(base_dir), cwd);
    assert_eq!(rewritten, "/other/place/foo");
}

#[test]
fn no_base_dir_configured_normalizes_lexically_only() {
    let rewritten = rewrite("foo/../bar/./baz", None, Path::new("/tmp/proj"));
    assert_eq!(rewritten, "bar/baz");
}

#[test]
fn lexical_normalization_collapses_dot_and_dotdot() {
    assert_eq!(normalize_lexically("a/b/../c/./d"), "a/c/d");
    assert_eq!(normalize_lexically("/a/b/../../c"), "/c");
    assert_eq!(normalize_lexically("../a"), "../a");
}

#[test]
fn two_checkouts_at_different_absolute_paths_produce_same_rewritten_form() {
    let cwd_a = Path::new("/tmp/proj/build");
    let cwd_b = Path::new("/home/u/proj/build");

    let rewritten_a = rewrite(
        "/tmp/proj/include",
        Some(Path::new("/tmp/proj")),
        cwd_a,
    );
    let rewritten_b = rewrite(
        "/home/u/proj/include",
        Some(Path::new("/home/u/proj")),
        cwd_b,
    );
    assert_eq!(rewritten_a, rewritten_b);
}
