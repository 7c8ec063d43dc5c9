#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use crate::args::{process, CompilerType};
use crate::result_entry::{FileType, ResultEntry};

fn request(dir: &Path) -> CompilationRequest {
    let argv: Vec<String> = ["gcc", "-c", "hello.c", "-o"]
        .iter()
        .map(|s| s.to_string())
        .chain(std::iter::once(dir.join("hello.o").to_string_lossy().to_string()))
        .collect();
    process(&argv, CompilerType::Gcc, None, dir).unwrap()
}

#[test]
fn materialize_writes_object_file() {
    let dir = tempfile::tempdir().unwrap();
    let req = request(dir.path());
    let mut result = ResultEntry::new();
    result.insert(FileType::Object, b"object-bytes".to_vec());

    materialize(&Config::default(), &req, &result).unwrap();

    assert_eq!(fs::read(&req.output_obj).unwrap(), b"object-bytes");
}

#[test]
fn materialize_fails_without_mandatory_object() {
    let dir = tempfile::tempdir().unwrap();
    let req = request(dir.path());
    let result = ResultEntry::new();

    let err = materialize(&Config::default(), &req, &result).unwrap_err();
    assert!(matches!(err, Error::Internal(_)));
}

#[test]
fn materialize_writes_dependency_file_with_object_mtime() {
    let dir = tempfile::tempdir().unwrap();
    let mut req = request(dir.path());
    req.output_dep = Some(dir.path().join("hello.d"));
    let mut result = ResultEntry::new();
    result.insert(FileType::Object, b"obj".to_vec());
    result.insert(FileType::Dependency, b"hello.o: hello.c\n".to_vec());

    materialize(&Config::default(), &req, &result).unwrap();

    let dep_path = req.output_dep.unwrap();
    assert_eq!(fs::read(&dep_path).unwrap(), b"hello.o: hello.c\n");
    let obj_mtime = fs::metadata(&req.output_obj).unwrap().modified().unwrap();
    let dep_mtime = fs::metadata(&dep_path).unwrap().modified().unwrap();
    assert_eq!(obj_mtime, dep_mtime);
}

#[test]
fn materialize_writes_side_files_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let req = request(dir.path());
    let mut result = ResultEntry::new();
    result.insert(FileType::Object, b"obj".to_vec());
    result.insert(FileType::DwarfObject, b"dwo-bytes".to_vec());

    materialize(&Config::default(), &req, &result).unwrap();

    let dwo_path = req.output_obj.with_extension("dwo");
    assert_eq!(fs::read(&dwo_path).unwrap(), b"dwo-bytes");
}
