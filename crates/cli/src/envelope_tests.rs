#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use proptest::prelude::*;

#[test]
fn round_trip_preserves_payload_and_metadata() {
    let env = Envelope::new(EntryType::Result, "default".to_string(), b"hello world".to_vec());
    let encoded = env.encode().unwrap();
    let decoded = Envelope::decode(&encoded).unwrap();
    assert_eq!(decoded.payload, b"hello world");
    assert_eq!(decoded.entry_type, EntryType::Result);
    assert_eq!(decoded.namespace, "default");
}

#[test]
fn manifest_entry_type_survives_round_trip() {
    let env = Envelope::new(EntryType::Manifest, String::new(), vec![1, 2, 3]);
    let decoded = Envelope::decode(&env.encode().unwrap()).unwrap();
    assert_eq!(decoded.entry_type, EntryType::Manifest);
}

#[test]
fn uncompressed_payload_round_trips() {
    let mut env = Envelope::new(EntryType::Result, "ns".to_string(), b"raw bytes".to_vec());
    env.compression_type = CompressionType::None;
    let decoded = Envelope::decode(&env.encode().unwrap()).unwrap();
    assert_eq!(decoded.payload, b"raw bytes");
}

#[test]
fn bit_flip_in_compressed_payload_is_detected() {
    let env = Envelope::new(EntryType::Result, "ns".to_string(), vec![7u8; 200]);
    let mut encoded = env.encode().unwrap();
    let flip_at = encoded.len() - 16;
    encoded[flip_at] ^= 0x01;
    let err = Envelope::decode(&encoded).unwrap_err();
    assert!(matches!(err, Error::MissingCacheFile(_)));
}

#[test]
fn bad_magic_is_reported_as_missing_cache_file() {
    let env = Envelope::new(EntryType::Result, "ns".to_string(), vec![1]);
    let mut encoded = env.encode().unwrap();
    encoded[0] = b'X';
    let err = Envelope::decode(&encoded).unwrap_err();
    assert!(matches!(err, Error::MissingCacheFile(_)));
}

#[test]
fn compression_level_zero_means_default() {
    assert_eq!(
        normalize_compression_level(0),
        zstd::DEFAULT_COMPRESSION_LEVEL
    );
}

#[test]
fn compression_level_is_clamped_to_library_range() {
    assert_eq!(normalize_compression_level(999), ZSTD_MAX_LEVEL);
    assert_eq!(normalize_compression_level(-5), ZSTD_MIN_LEVEL);
}

proptest! {
    #[test]
    fn round_trip_is_identity_for_arbitrary_payloads(payload in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let env = Envelope::new(EntryType::Result, "ns".to_string(), payload.clone());
        let decoded = Envelope::decode(&env.encode().unwrap()).unwrap();
        prop_assert_eq!(decoded.payload, payload);
    }
}
