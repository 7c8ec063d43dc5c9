// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared-memory inode cache (spec §4.6 continued, component D).
//!
//! A single mmap'd file shared by every invocation against a cache
//! directory, keyed by `(key_digest)` and recording the file digest and
//! hasher result bitmask observed the last few times that key was hashed.
//! Avoids rehashing a header file's bytes when its inode metadata hasn't
//! moved since the last invocation.
//!
//! This is the one module in the crate that needs raw unsafe pointer
//! access: the bucket array lives in memory mapped `MAP_SHARED` across
//! unrelated processes, so normal `&mut` aliasing rules don't apply —
//! synchronization is via the per-bucket `owner_pid` CAS lock and atomic
//! slot reads/writes described below, not Rust's borrow checker.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use memmap2::MmapMut;

use crate::digest::Digest;
use crate::error::{Error, Result};

/// Bump whenever the layout or key semantics below change; a mismatch on
/// open causes unlink-and-recreate rather than trying to migrate.
pub const VERSION: u32 = 2;

pub const NUM_BUCKETS: usize = 32768;
const NUM_SLOTS: usize = 4;

/// A file whose ctime/mtime is newer than `now - MIN_AGE` is never
/// consulted or inserted: its timestamp doesn't yet have the granularity
/// to prove the content hasn't changed since.
pub const MIN_AGE: Duration = Duration::from_secs(2);

const LOCK_SPIN_ITERATIONS: u32 = 10_000;
const LOCK_CORRUPTION_TIMEOUT: Duration = Duration::from_secs(5);
const FREE_SPACE_CHECK_INTERVAL: Duration = Duration::from_secs(1);
const MIN_FREE_SPACE_BYTES: u64 = 100 * 1024 * 1024;

#[repr(C)]
struct Header {
    version: u32,
    hits: u64,
    misses: u64,
    errors: u64,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct Slot {
    key_digest: [u8; 20],
    file_digest: [u8; 20],
    return_value: i32,
}

#[repr(C)]
struct Bucket {
    owner_pid: i32,
    entries: [Slot; NUM_SLOTS],
}

const HEADER_SIZE: usize = std::mem::size_of::<Header>();
const BUCKET_SIZE: usize = std::mem::size_of::<Bucket>();
const REGION_SIZE: usize = HEADER_SIZE + NUM_BUCKETS * BUCKET_SIZE;

/// One cached observation: the file's content digest and the hasher
/// result bitmask (e.g. "contains `__DATE__`") recorded alongside it.
#[derive(Debug, Clone, Copy)]
pub struct CacheEntry {
    pub file_digest: Digest,
    pub return_value: i32,
}

/// A single bucket's hits may legitimately fail the spin-lock under
/// contention; `Corrupt` means the 5-second wall-clock timeout fired and
/// the caller should disable the cache for this invocation.
#[derive(Debug)]
enum LockError {
    Corrupt,
}

/// A process-local handle onto the shared region. `Some(None)` and
/// `None` are collapsed by callers going through [`InodeCache::open`],
/// which returns `None` outright when the cache should be silently
/// disabled (unknown filesystem, construction failure, low free space).
pub struct InodeCache {
    path: PathBuf,
    mmap: Mutex<MmapMut>,
    last_free_space_check: Mutex<Instant>,
}

impl InodeCache {
    /// Open (creating if absent) the shared cache file at `path`. Returns
    /// `None` when the cache should be disabled for this filesystem —
    /// this is not an error the caller needs to report, per spec §4.6
    /// "Remote/unknown filesystems disable the cache silently."
    pub fn open(path: &Path) -> Option<Self> {
        if !probe_known_good_filesystem(path) {
            return None;
        }

        match Self::open_or_recreate(path) {
            Ok(cache) => Some(cache),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "inode cache disabled: open failed");
                None
            }
        }
    }

    fn open_or_recreate(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| Error::Io { path: path.to_path_buf(), source: e })?;
        file.set_len(REGION_SIZE as u64).map_err(|e| Error::Io { path: path.to_path_buf(), source: e })?;

        // SAFETY: `file` stays open for the mmap's lifetime (it's dropped
        // right after, which is fine on POSIX: the mapping keeps the
        // underlying inode alive independent of the fd). The file was
        // just sized to exactly `REGION_SIZE`, matching our layout.
        #[allow(unsafe_code)]
        let mmap = unsafe { MmapMut::map_mut(&file) }
            .map_err(|e| Error::Io { path: path.to_path_buf(), source: e })?;

        let version = header_ref(&mmap).version.load(Ordering::Acquire);
        if version != VERSION {
            drop(mmap);
            drop(file);
            return Self::recreate(path);
        }

        Ok(Self {
            path: path.to_path_buf(),
            mmap: Mutex::new(mmap),
            last_free_space_check: Mutex::new(Instant::now() - FREE_SPACE_CHECK_INTERVAL),
        })
    }

    fn recreate(path: &Path) -> Result<Self> {
        let _ = std::fs::remove_file(path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| Error::Io { path: path.to_path_buf(), source: e })?;
        file.set_len(REGION_SIZE as u64).map_err(|e| Error::Io { path: path.to_path_buf(), source: e })?;

        // SAFETY: see open_or_recreate; file was just sized to REGION_SIZE.
        #[allow(unsafe_code)]
        let mut mmap = unsafe { MmapMut::map_mut(&file) }
            .map_err(|e| Error::Io { path: path.to_path_buf(), source: e })?;
        mmap.fill(0);
        header_ref(&mmap).version.store(VERSION, Ordering::Release);

        Ok(Self {
            path: path.to_path_buf(),
            mmap: Mutex::new(mmap),
            last_free_space_check: Mutex::new(Instant::now() - FREE_SPACE_CHECK_INTERVAL),
        })
    }

    /// A file whose ctime/mtime falls within `MIN_AGE` of now must not be
    /// consulted or inserted (spec §4.6 "min_age rule").
    pub fn should_consult(mtime: std::time::SystemTime, ctime: std::time::SystemTime) -> bool {
        let now = std::time::SystemTime::now();
        let fresh = |t: std::time::SystemTime| now.duration_since(t).map(|age| age < MIN_AGE).unwrap_or(true);
        !fresh(mtime) && !fresh(ctime)
    }

    fn bucket_index(key: &Digest) -> usize {
        let bytes = key.as_bytes();
        let word = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        (word as usize) % NUM_BUCKETS
    }

    /// Low-on-space and filesystem-probe checks are done at construction
    /// time; this one is re-run at most once per `FREE_SPACE_CHECK_INTERVAL`
    /// since it's a property of the whole filesystem, not this file.
    fn has_enough_free_space(&self) -> bool {
        let mut last = self.last_free_space_check.lock().unwrap_or_else(|e| e.into_inner());
        if last.elapsed() < FREE_SPACE_CHECK_INTERVAL {
            return true;
        }
        *last = Instant::now();
        drop(last);
        free_space_bytes(&self.path).map(|free| free >= MIN_FREE_SPACE_BYTES).unwrap_or(true)
    }

    pub fn get(&self, key: &Digest) -> Option<CacheEntry> {
        if !self.has_enough_free_space() {
            return None;
        }
        let mut found = None;
        let corrupt = {
            let mmap = self.mmap.lock().unwrap_or_else(|e| e.into_inner());
            let header = header_ref(&mmap);
            let bucket = bucket_ref(&mmap, Self::bucket_index(key));

            match lock_bucket(bucket) {
                Ok(guard) => {
                    for slot_index in 0..NUM_SLOTS {
                        let slot = &bucket.entries[slot_index];
                        if slot.key_digest == *key.as_bytes() {
                            found = Some(CacheEntry {
                                file_digest: Digest::from_bytes(slot.file_digest),
                                return_value: slot.return_value_raw(),
                            });
                            guard.promote(slot_index);
                            break;
                        }
                    }
                    if found.is_some() {
                        header.hits.fetch_add(1, Ordering::Relaxed);
                    } else {
                        header.misses.fetch_add(1, Ordering::Relaxed);
                    }
                    false
                }
                Err(LockError::Corrupt) => {
                    header.errors.fetch_add(1, Ordering::Relaxed);
                    true
                }
            }
        };
        if corrupt {
            self.recover_corruption();
            return None;
        }
        found
    }

    pub fn put(&self, key: &Digest, file_digest: Digest, return_value: i32) {
        if !self.has_enough_free_space() {
            return;
        }
        let corrupt = {
            let mmap = self.mmap.lock().unwrap_or_else(|e| e.into_inner());
            let header = header_ref(&mmap);
            let bucket = bucket_ref(&mmap, Self::bucket_index(key));

            match lock_bucket(bucket) {
                Ok(guard) => {
                    guard.insert_front(*key.as_bytes(), *file_digest.as_bytes(), return_value);
                    false
                }
                Err(LockError::Corrupt) => {
                    header.errors.fetch_add(1, Ordering::Relaxed);
                    true
                }
            }
        };
        if corrupt {
            self.recover_corruption();
        }
    }

    /// Stats-only snapshot, used by the administrative `--show-stats` path.
    pub fn stats(&self) -> (u64, u64, u64) {
        let mmap = self.mmap.lock().unwrap_or_else(|e| e.into_inner());
        let header = header_ref(&mmap);
        (
            header.hits.load(Ordering::Relaxed),
            header.misses.load(Ordering::Relaxed),
            header.errors.load(Ordering::Relaxed),
        )
    }

    /// Unmap, unlink, recreate, remap — the corruption-recovery path
    /// triggered when a bucket lock can't be acquired within
    /// `LOCK_CORRUPTION_TIMEOUT` (spec §4.6 "Bucket lock").
    fn recover_corruption(&self) {
        tracing::info!(path = %self.path.display(), "inode cache corrupt, recreating");
        let mut guard = self.mmap.lock().unwrap_or_else(|e| e.into_inner());
        match Self::recreate(&self.path) {
            Ok(fresh) => {
                *guard = fresh.mmap.into_inner().unwrap_or_else(|e| e.into_inner());
            }
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "inode cache recreate failed");
            }
        }
    }
}

impl Slot {
    fn return_value_raw(&self) -> i32 {
        self.return_value
    }
}

fn header_ref(mmap: &MmapMut) -> &HeaderAtomics {
    // SAFETY: `mmap` is exactly REGION_SIZE bytes, laid out as
    // `Header` followed by `NUM_BUCKETS` `Bucket`s; `HeaderAtomics` is
    // `Header`'s atomic-field view over the same bytes and is
    // `repr(C)`-compatible with it.
    #[allow(unsafe_code)]
    unsafe {
        &*(mmap.as_ptr() as *const HeaderAtomics)
    }
}

fn bucket_ref(mmap: &MmapMut, index: usize) -> &Bucket {
    debug_assert!(index < NUM_BUCKETS);
    // SAFETY: offset is within REGION_SIZE by the `debug_assert` above
    // and the invariant that `mmap` is exactly REGION_SIZE bytes.
    #[allow(unsafe_code)]
    unsafe {
        let base = mmap.as_ptr().add(HEADER_SIZE + index * BUCKET_SIZE);
        &*(base as *const Bucket)
    }
}

/// Atomic-typed overlay of [`Header`]'s fields, used only through
/// [`header_ref`] so every read/write goes through an atomic op even
/// though other processes hold the same bytes mapped `MAP_SHARED`.
#[repr(C)]
struct HeaderAtomics {
    version: AtomicU32,
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
}

fn owner_pid_atomic(bucket: &Bucket) -> &AtomicI32 {
    // SAFETY: `Bucket::owner_pid` and `AtomicI32` share layout; this cast
    // only ever produces atomic-qualified accesses to that field.
    #[allow(unsafe_code)]
    unsafe {
        &*(&bucket.owner_pid as *const i32 as *const AtomicI32)
    }
}

struct BucketGuard<'a> {
    bucket: &'a Bucket,
}

impl Drop for BucketGuard<'_> {
    fn drop(&mut self) {
        owner_pid_atomic(self.bucket).store(0, Ordering::Release);
    }
}

impl BucketGuard<'_> {
    /// Move the hit slot to index 0, shifting slots 0..index up by one
    /// (spec §4.6 "on hit, promote to slot 0").
    fn promote(&self, hit_index: usize) {
        if hit_index == 0 {
            return;
        }
        // SAFETY: we hold the bucket's CAS lock (this guard's existence
        // proves it), so exclusive mutation of its slot array is safe
        // even though other processes may be spinning to acquire it.
        #[allow(unsafe_code)]
        unsafe {
            let slots = self.bucket.entries.as_ptr() as *mut Slot;
            let hit = std::ptr::read(slots.add(hit_index));
            std::ptr::copy(slots, slots.add(1), hit_index);
            std::ptr::write(slots, hit);
        }
    }

    /// Shift slots 0..2 into 1..3 (discarding slot 3) and write the new
    /// entry into slot 0 (spec §4.6 "Put").
    fn insert_front(&self, key_digest: [u8; 20], file_digest: [u8; 20], return_value: i32) {
        // SAFETY: see `promote`.
        #[allow(unsafe_code)]
        unsafe {
            let slots = self.bucket.entries.as_ptr() as *mut Slot;
            std::ptr::copy(slots, slots.add(1), NUM_SLOTS - 1);
            std::ptr::write(slots, Slot { key_digest, file_digest, return_value });
        }
    }
}

/// Acquire a bucket's spin lock: CAS `owner_pid` 0 -> our pid. Spins for
/// `LOCK_SPIN_ITERATIONS`, then switches to a wall-clock wait with ABA
/// detection (the timer resets whenever the observed holder changes);
/// if 5 seconds elapse with no progress the bucket is deemed corrupt.
fn lock_bucket(bucket: &Bucket) -> std::result::Result<BucketGuard<'_>, LockError> {
    let pid = std::process::id() as i32;
    let owner = owner_pid_atomic(bucket);

    for _ in 0..LOCK_SPIN_ITERATIONS {
        if owner
            .compare_exchange(0, pid, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            return Ok(BucketGuard { bucket });
        }
        std::hint::spin_loop();
    }

    let mut last_seen = owner.load(Ordering::Relaxed);
    let mut wait_started = Instant::now();
    loop {
        if owner
            .compare_exchange(0, pid, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            return Ok(BucketGuard { bucket });
        }
        let current = owner.load(Ordering::Relaxed);
        if current != last_seen {
            last_seen = current;
            wait_started = Instant::now();
        }
        if wait_started.elapsed() >= LOCK_CORRUPTION_TIMEOUT {
            return Err(LockError::Corrupt);
        }
        std::thread::yield_now();
    }
}

/// Query the filesystem type under `path`'s parent directory; only
/// known-good filesystems are accepted (spec §4.6 "Filesystem probe").
fn probe_known_good_filesystem(path: &Path) -> bool {
    let probe_dir = path.parent().unwrap_or(path);
    match filesystem_kind(probe_dir) {
        Some(kind) => matches!(
            kind,
            "tmpfs" | "btrfs" | "ext2" | "ext3" | "ext4" | "xfs" | "apfs" | "ufs" | "zfs"
        ),
        None => false,
    }
}

#[cfg(target_os = "linux")]
fn filesystem_kind(path: &Path) -> Option<&'static str> {
    use std::os::unix::ffi::OsStrExt;

    let c_path = std::ffi::CString::new(path.as_os_str().as_bytes()).ok()?;
    // SAFETY: `c_path` is NUL-terminated and `buf` is a valid, fully
    // zeroed `statfs` the kernel fills in on success.
    #[allow(unsafe_code)]
    let mut buf: libc::statfs = unsafe { std::mem::zeroed() };
    #[allow(unsafe_code)]
    let rc = unsafe { libc::statfs(c_path.as_ptr(), &mut buf) };
    if rc != 0 {
        return None;
    }
    // Magic numbers per Linux's statfs(2) / magic.h.
    match buf.f_type as i64 {
        0x0102_1994 => Some("tmpfs"),
        0x9123_683e => Some("btrfs"),
        0xef53 => Some("ext4"),
        0x5846_5342 => Some("xfs"),
        _ => None,
    }
}

#[cfg(any(target_os = "macos", target_os = "freebsd", target_os = "netbsd", target_os = "openbsd"))]
fn filesystem_kind(path: &Path) -> Option<&'static str> {
    use std::os::unix::ffi::OsStrExt;

    let c_path = std::ffi::CString::new(path.as_os_str().as_bytes()).ok()?;
    // SAFETY: see the Linux variant above; this platform's `statfs`
    // additionally carries a NUL-terminated `f_fstypename` on success.
    #[allow(unsafe_code)]
    let mut buf: libc::statfs = unsafe { std::mem::zeroed() };
    #[allow(unsafe_code)]
    let rc = unsafe { libc::statfs(c_path.as_ptr(), &mut buf) };
    if rc != 0 {
        return None;
    }
    let name_bytes: Vec<u8> = buf.f_fstypename.iter().take_while(|&&c| c != 0).map(|&c| c as u8).collect();
    match std::str::from_utf8(&name_bytes).ok()? {
        "apfs" => Some("apfs"),
        "ufs" => Some("ufs"),
        "zfs" => Some("zfs"),
        "hfs" => Some("apfs"),
        _ => None,
    }
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd"
)))]
fn filesystem_kind(_path: &Path) -> Option<&'static str> {
    None
}

fn free_space_bytes(path: &Path) -> Option<u64> {
    let stat = nix::sys::statvfs::statvfs(path).ok()?;
    Some(stat.blocks_available() as u64 * stat.fragment_size())
}

#[cfg(test)]
#[path = "inode_cache_tests.rs"]
mod tests;
