#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;

#[test]
fn detects_gcc_variants() {
    assert_eq!(CompilerType::from_filename_token("gcc"), CompilerType::Gcc);
    assert_eq!(CompilerType::from_filename_token("g++"), CompilerType::Gcc);
    assert_eq!(CompilerType::from_filename_token("cc"), CompilerType::Gcc);
    assert_eq!(
        CompilerType::from_filename_token("x86_64-linux-gnu-gcc"),
        CompilerType::Gcc
    );
}

#[test]
fn detects_clang() {
    assert_eq!(CompilerType::from_filename_token("clang"), CompilerType::Clang);
    assert_eq!(CompilerType::from_filename_token("clang++"), CompilerType::Clang);
}

#[test]
fn detects_msvc() {
    assert_eq!(CompilerType::from_filename_token("cl"), CompilerType::Msvc);
    assert_eq!(CompilerType::from_filename_token("cl.exe"), CompilerType::Msvc);
}

#[test]
fn detects_nvcc() {
    assert_eq!(CompilerType::from_filename_token("nvcc"), CompilerType::Nvcc);
}

#[test]
fn unknown_compiler_is_other() {
    assert_eq!(CompilerType::from_filename_token("tcc"), CompilerType::Other);
}

#[test]
fn only_msvc_uses_slash_options() {
    assert!(CompilerType::Msvc.uses_slash_options());
    assert!(!CompilerType::Gcc.uses_slash_options());
    assert!(!CompilerType::Clang.uses_slash_options());
}
