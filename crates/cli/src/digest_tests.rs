#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use proptest::prelude::*;

#[test]
fn base16_round_trip_known_value() {
    let bytes: [u8; DIGEST_BYTES] = [
        0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee,
        0xff, 0x01, 0x02, 0x03, 0x04,
    ];
    let d = Digest::from_bytes(bytes);
    let hex = d.format_base16();
    assert_eq!(hex.len(), 40);
    assert_eq!(hex, "00112233445566778899aabbccddeeff01020304");
    let parsed = Digest::parse_base16(&hex).unwrap();
    assert_eq!(parsed, d);
}

#[test]
fn path_form_shard_is_first_two_hex_chars() {
    let mut bytes = [0u8; DIGEST_BYTES];
    bytes[0] = 0xab;
    bytes[1] = 0xcd;
    let d = Digest::from_bytes(bytes);
    let path = d.format_path();
    assert!(path.starts_with("abcd"));
    assert_eq!(d.shard(), "ab");
    assert_eq!(&path[..2], d.shard());
}

#[test]
fn path_form_has_no_padding_characters() {
    let d = Digest::from_bytes([0u8; DIGEST_BYTES]);
    assert!(!d.format_path().contains('='));
}

proptest! {
    #[test]
    fn base16_is_inverse_of_parse(bytes in proptest::array::uniform20(any::<u8>())) {
        let d = Digest::from_bytes(bytes);
        let round_tripped = Digest::parse_base16(&d.format_base16()).unwrap();
        prop_assert_eq!(round_tripped, d);
    }

    #[test]
    fn path_form_is_inverse_of_parse(bytes in proptest::array::uniform20(any::<u8>())) {
        let d = Digest::from_bytes(bytes);
        let round_tripped = Digest::parse_path(&d.format_path()).unwrap();
        prop_assert_eq!(round_tripped, d);
    }
}
