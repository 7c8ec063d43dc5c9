#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use crate::digest::Digest;

fn digest(byte: u8) -> Digest {
    Digest::from_bytes([byte; 20])
}

#[test]
fn find_match_returns_none_on_empty_manifest() {
    let manifest = Manifest::new();
    let observed = [];
    assert!(manifest.find_match(&observed, Sloppiness::default()).is_none());
}

#[test]
fn find_match_hits_on_content_hash_under_default_sloppiness() {
    let mut manifest = Manifest::new();
    manifest.upsert(
        vec![IncludedFile {
            path: "a.h".to_string(),
            mtime: 100,
            ctime: 100,
            size: 10,
            content_hash: [7; 20],
        }],
        digest(1),
    );

    let observed = [ObservedFile {
        path: "a.h",
        size: 10,
        mtime: 999, // mtime changed, but content hash still matches
        ctime: 999,
        content_hash: [7; 20],
    }];
    assert_eq!(
        manifest.find_match(&observed, Sloppiness::default()),
        Some(digest(1))
    );
}

#[test]
fn find_match_misses_on_content_hash_change() {
    let mut manifest = Manifest::new();
    manifest.upsert(
        vec![IncludedFile {
            path: "a.h".to_string(),
            mtime: 100,
            ctime: 100,
            size: 10,
            content_hash: [7; 20],
        }],
        digest(1),
    );
    let observed = [ObservedFile {
        path: "a.h",
        size: 10,
        mtime: 100,
        ctime: 100,
        content_hash: [8; 20],
    }];
    assert!(manifest
        .find_match(&observed, Sloppiness::default())
        .is_none());
}

#[test]
fn file_stat_matches_sloppiness_ignores_content_hash() {
    let mut manifest = Manifest::new();
    manifest.upsert(
        vec![IncludedFile {
            path: "a.h".to_string(),
            mtime: 100,
            ctime: 100,
            size: 10,
            content_hash: [7; 20],
        }],
        digest(1),
    );
    let sloppiness = Sloppiness {
        file_stat_matches: true,
        file_stat_matches_ctime: false,
        ..Default::default()
    };
    let observed = [ObservedFile {
        path: "a.h",
        size: 10,
        mtime: 100,
        ctime: 999, // ctime differs but ctime check not required
        content_hash: [0xff; 20], // content differs, should be ignored
    }];
    assert_eq!(manifest.find_match(&observed, sloppiness), Some(digest(1)));
}

#[test]
fn upsert_prunes_oldest_entry_at_capacity() {
    let mut manifest = Manifest::new();
    for i in 0..MAX_MANIFEST_ENTRIES {
        manifest.upsert(
            vec![IncludedFile {
                path: format!("f{i}.h"),
                mtime: 0,
                ctime: 0,
                size: 0,
                content_hash: [0; 20],
            }],
            digest(0),
        );
    }
    assert_eq!(manifest.entries().len(), MAX_MANIFEST_ENTRIES);
    manifest.upsert(
        vec![IncludedFile {
            path: "new.h".to_string(),
            mtime: 0,
            ctime: 0,
            size: 0,
            content_hash: [0; 20],
        }],
        digest(9),
    );
    assert_eq!(manifest.entries().len(), MAX_MANIFEST_ENTRIES);
    assert_eq!(manifest.entries()[0].files[0].path, "f1.h");
}

#[test]
fn serialize_deserialize_round_trip() {
    let mut manifest = Manifest::new();
    manifest.upsert(
        vec![IncludedFile {
            path: "a.h".to_string(),
            mtime: 1,
            ctime: 2,
            size: 3,
            content_hash: [4; 20],
        }],
        digest(5),
    );
    let bytes = manifest.serialize().unwrap();
    let restored = Manifest::deserialize(&bytes).unwrap();
    assert_eq!(restored.entries().len(), 1);
    assert_eq!(restored.entries()[0].result_key, digest(5));
}
