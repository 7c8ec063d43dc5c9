#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;

#[test]
fn config_error_display_includes_message() {
    let err = Error::Config {
        message: "invalid max_files".into(),
        path: Some(PathBuf::from("ccache.conf")),
    };
    assert!(err.to_string().contains("invalid max_files"));
}

#[test]
fn exit_code_from_config_error() {
    let err = Error::Config {
        message: "test".into(),
        path: None,
    };
    assert_eq!(ExitCode::from(&err), ExitCode::ConfigError);
}

#[test]
fn exit_code_from_argument_error() {
    let err = Error::Argument("unknown flag".into());
    assert_eq!(ExitCode::from(&err), ExitCode::ConfigError);
}

#[test]
fn exit_code_from_internal_error() {
    let err = Error::Internal("bug".into());
    assert_eq!(ExitCode::from(&err), ExitCode::InternalError);
}

#[test]
fn exit_code_from_compile_failed_is_internal() {
    let err = Error::CompileFailed(1);
    assert_eq!(ExitCode::from(&err), ExitCode::InternalError);
}

#[test]
fn uncacheable_falls_back_to_exec() {
    let err = Error::Uncacheable {
        reason: "multiple source files".into(),
        counter: StatCounter::Uncacheable,
    };
    assert!(err.falls_back_to_exec());
}

#[test]
fn remote_storage_error_does_not_fall_back() {
    let err = Error::RemoteStorageError {
        shard: "s3".into(),
        message: "connection refused".into(),
    };
    assert!(!err.falls_back_to_exec());
}

#[test]
fn counter_mapping_matches_variant() {
    let err = Error::BadInputFile {
        path: PathBuf::from("foo.c"),
        message: "not found".into(),
    };
    assert_eq!(err.counter(), StatCounter::BadInputFile);
}
