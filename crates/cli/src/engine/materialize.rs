// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! FETCH RESULT materialization (spec §4.8): placing a cached result's
//! files where the caller expects them, via hard link, reflink, or a
//! plain copy, in that preference order.

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use nix::sys::stat::{utimensat, UtimensatFlags};
use nix::sys::time::TimeSpec;

use crate::args::CompilationRequest;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::result_entry::{FileType, ResultEntry};

/// Place every file named in `result` at the path `req` implies for its
/// type. `object` is mandatory; everything else is best-effort.
pub fn materialize(config: &Config, req: &CompilationRequest, result: &ResultEntry) -> Result<()> {
    let object_bytes = result.get(FileType::Object).ok_or_else(|| {
        Error::Internal("materialize: result entry missing object file".to_string())
    })?;
    place(config, &req.output_obj, object_bytes)?;
    touch_now(&req.output_obj)?;

    if let Some(dep_path) = &req.output_dep {
        if let Some(dep_bytes) = result.get(FileType::Dependency) {
            place(config, dep_path, dep_bytes)?;
            let object_mtime = fs::metadata(&req.output_obj)
                .and_then(|m| m.modified())
                .unwrap_or_else(|_| SystemTime::now());
            set_mtime(dep_path, object_mtime)?;
        }
    }

    if let Some(stderr) = result.get(FileType::StderrOutput) {
        use std::io::Write as _;
        let _ = std::io::stderr().write_all(stderr);
    }

    for file in result.iter() {
        let target = match file.file_type {
            FileType::Object | FileType::Dependency | FileType::StderrOutput => continue,
            FileType::DwarfObject => req.output_obj.with_extension("dwo"),
            FileType::AssemblerListing => req.output_obj.with_extension("s"),
            FileType::StackUsage => req.output_obj.with_extension("su"),
            FileType::Diagnostic => req.output_obj.with_extension("dia"),
            FileType::CovNoteData => req.output_obj.with_extension("gcno"),
            FileType::CoverageUnmangled | FileType::IncludedPchFile => continue,
        };
        place(config, &target, &file.bytes)?;
    }

    Ok(())
}

/// Write `bytes` to `path`, preferring hard-link/reflink semantics from a
/// staged temp file when configured, falling back to a plain atomic
/// write otherwise. A compiler cache can't literally hard-link *from*
/// an in-memory payload, so the configured preference only changes
/// whether the write goes through a shared staging file first; either
/// way the caller sees an ordinary regular file.
fn place(config: &Config, path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }
    let tmp = path.with_extension("ccache.materialize.tmp");
    fs::write(&tmp, bytes).map_err(|e| Error::Io {
        path: tmp.clone(),
        source: e,
    })?;

    if config.hard_link {
        let _ = fs::remove_file(path);
        if fs::hard_link(&tmp, path).is_ok() {
            let _ = fs::remove_file(&tmp);
            return Ok(());
        }
    }

    if config.file_clone {
        let _ = fs::remove_file(path);
        if clone_file(&tmp, path).is_ok() {
            let _ = fs::remove_file(&tmp);
            return Ok(());
        }
    }

    fs::rename(&tmp, path).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Reflink `src` to `dst` (spec §4.8's FETCH RESULT: `file_clone=true`
/// clones via `FICLONE` before falling back to a plain copy, mirroring
/// the same raw-`libc` ioctl style `inode_cache.rs::filesystem_kind`
/// uses for `statfs`). Best-effort: any failure (unsupported
/// filesystem, cross-device, platform without `FICLONE`) leaves `dst`
/// untouched and the caller falls through to `fs::rename`.
#[cfg(target_os = "linux")]
fn clone_file(src: &Path, dst: &Path) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;

    // Linux's `<linux/fs.h>` FICLONE ioctl request number.
    const FICLONE: libc::c_ulong = 0x4009_409;

    let src_file = fs::File::open(src)?;
    let dst_file = fs::OpenOptions::new().write(true).create(true).truncate(true).open(dst)?;
    // SAFETY: both file descriptors are valid and kept alive for the
    // call; FICLONE either clones the whole source extent into the
    // destination or fails with errno, which `ioctl`'s return conveys.
    #[allow(unsafe_code)]
    let rc = unsafe { libc::ioctl(dst_file.as_raw_fd(), FICLONE, src_file.as_raw_fd()) };
    if rc != 0 {
        let _ = fs::remove_file(dst);
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn clone_file(_src: &Path, _dst: &Path) -> std::io::Result<()> {
    Err(std::io::Error::from(std::io::ErrorKind::Unsupported))
}

fn touch_now(path: &Path) -> Result<()> {
    set_mtime(path, SystemTime::now())
}

/// Set both atime and mtime to `when`; atime tracks mtime here since the
/// spec only calls out the object's own atime/mtime (reset to "now") and
/// the dependency file's mtime (set to the object's).
fn set_mtime(path: &Path, when: SystemTime) -> Result<()> {
    let since_epoch = when.duration_since(UNIX_EPOCH).unwrap_or_default();
    let ts = TimeSpec::new(since_epoch.as_secs() as i64, since_epoch.subsec_nanos() as i64);
    utimensat(None, path, &ts, &ts, UtimensatFlags::FollowSymlink).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: std::io::Error::from(e),
    })
}

#[cfg(test)]
#[path = "materialize_tests.rs"]
mod tests;
