//! 160-bit content digest and its two on-disk string forms.
//!
//! Spec §3 "Digest": a 20-byte value with a lowercase base16 form (40
//! chars) used for display/checksums, and a hybrid **path form** used for
//! cache layout — the first 2 bytes as 4 base16 digits, the remainder as
//! lowercase base32hex without padding. The first 2 characters of the
//! path form name the level-1 shard directory (spec §3 "Local layout").

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of bytes in a digest.
pub const DIGEST_BYTES: usize = 20;

const BASE32HEX_ALPHABET: &[u8; 32] = b"0123456789abcdefghijklmnopqrstuv";

/// A 160-bit content digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Digest([u8; DIGEST_BYTES]);

impl Digest {
    pub fn from_bytes(bytes: [u8; DIGEST_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_BYTES] {
        &self.0
    }

    /// Lowercase base16 (hex) representation, 40 characters.
    pub fn format_base16(&self) -> String {
        let mut s = String::with_capacity(DIGEST_BYTES * 2);
        for b in self.0 {
            s.push_str(&format!("{b:02x}"));
        }
        s
    }

    /// Parse a 40-character lowercase (or mixed-case) base16 string.
    pub fn parse_base16(s: &str) -> Result<Self> {
        if s.len() != DIGEST_BYTES * 2 {
            return Err(Error::Internal(format!(
                "digest: expected {} hex chars, got {}",
                DIGEST_BYTES * 2,
                s.len()
            )));
        }
        let mut out = [0u8; DIGEST_BYTES];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk)
                .map_err(|_| Error::Internal("digest: invalid utf-8 in hex".to_string()))?;
            out[i] = u8::from_str_radix(pair, 16)
                .map_err(|_| Error::Internal(format!("digest: invalid hex byte {pair:?}")))?;
        }
        Ok(Self(out))
    }

    /// Hybrid path form: first 2 bytes as 4 hex digits, remaining 18 bytes
    /// as unpadded lowercase base32hex.
    pub fn format_path(&self) -> String {
        let mut s = String::with_capacity(4 + 29);
        s.push_str(&format!("{:02x}{:02x}", self.0[0], self.0[1]));
        s.push_str(&base32hex_encode(&self.0[2..]));
        s
    }

    /// The level-1 shard directory name: the first 2 characters of the
    /// path form.
    pub fn shard(&self) -> String {
        format!("{:02x}", self.0[0])
    }

    /// Parse a path-form string back into a digest.
    pub fn parse_path(s: &str) -> Result<Self> {
        if s.len() < 4 {
            return Err(Error::Internal("digest: path form too short".to_string()));
        }
        let (head, tail) = s.split_at(4);
        let mut out = [0u8; DIGEST_BYTES];
        out[0] = u8::from_str_radix(&head[0..2], 16)
            .map_err(|_| Error::Internal("digest: bad path-form head".to_string()))?;
        out[1] = u8::from_str_radix(&head[2..4], 16)
            .map_err(|_| Error::Internal("digest: bad path-form head".to_string()))?;
        let rest = base32hex_decode(tail)?;
        if rest.len() != DIGEST_BYTES - 2 {
            return Err(Error::Internal(format!(
                "digest: path form decoded to {} bytes, expected {}",
                rest.len(),
                DIGEST_BYTES - 2
            )));
        }
        out[2..].copy_from_slice(&rest);
        Ok(Self(out))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.format_base16())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_base16())
    }
}

/// Encode bytes as unpadded lowercase base32hex (RFC 4648 "Base 32
/// Encoding with Extended Hex Alphabet", no `=` padding).
fn base32hex_encode(bytes: &[u8]) -> String {
    let mut out = String::new();
    let mut buffer: u64 = 0;
    let mut bits = 0u32;
    for &b in bytes {
        buffer = (buffer << 8) | b as u64;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            let idx = ((buffer >> bits) & 0x1f) as usize;
            out.push(BASE32HEX_ALPHABET[idx] as char);
        }
    }
    if bits > 0 {
        let idx = ((buffer << (5 - bits)) & 0x1f) as usize;
        out.push(BASE32HEX_ALPHABET[idx] as char);
    }
    out
}

fn base32hex_decode(s: &str) -> Result<Vec<u8>> {
    let mut buffer: u64 = 0;
    let mut bits = 0u32;
    let mut out = Vec::new();
    for c in s.chars() {
        let val = BASE32HEX_ALPHABET
            .iter()
            .position(|&a| a as char == c)
            .ok_or_else(|| Error::Internal(format!("digest: invalid base32hex char {c:?}")))?;
        buffer = (buffer << 5) | val as u64;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push(((buffer >> bits) & 0xff) as u8);
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "digest_tests.rs"]
mod tests;
