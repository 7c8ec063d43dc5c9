//! Cache entry envelope: the framed, compressed, checksummed container
//! that local and remote storage both read and write (spec §3 "Cache
//! entry envelope").
//!
//! On-disk layout:
//! `magic(4) | entry_format_version(1) | entry_type(1) | compression_type(1)
//! | compression_level(1) | self_contained(1) | creation_time(8) |
//! ccache_version(string) | namespace(string) | entry_size(8) |
//! payload(compressed) | checksum(8)`.
//!
//! Strings are length-prefixed with a `u16` byte count, little-endian,
//! matching the rest of the envelope's fixed-width integers.

use std::io::Write as _;

use crate::error::{Error, Result};

pub const MAGIC: [u8; 4] = *b"CCF1";
pub const FORMAT_VERSION: u8 = 1;

/// What the envelope's payload, once decompressed, actually contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EntryType {
    Manifest = 0,
    Result = 1,
}

impl EntryType {
    fn from_u8(v: u8) -> Result<Self> {
        match v {
            0 => Ok(EntryType::Manifest),
            1 => Ok(EntryType::Result),
            other => Err(Error::Internal(format!(
                "envelope: unknown entry_type byte {other}"
            ))),
        }
    }
}

/// Payload compression scheme (spec §6: `none` or `zstd`, streaming).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressionType {
    None = 0,
    Zstd = 1,
}

impl CompressionType {
    fn from_u8(v: u8) -> Result<Self> {
        match v {
            0 => Ok(CompressionType::None),
            1 => Ok(CompressionType::Zstd),
            other => Err(Error::Internal(format!(
                "envelope: unknown compression_type byte {other}"
            ))),
        }
    }
}

/// zstd's own supported level range; levels outside this are clamped per
/// spec §4.6 ("a level exceeding the library maximum is clamped with a
/// one-line warning; a level below the library minimum is raised to the
/// minimum").
pub const ZSTD_MIN_LEVEL: i32 = 1;
pub const ZSTD_MAX_LEVEL: i32 = 22;

/// Clamp a requested compression level into zstd's supported range,
/// treating `0` as "use the default level".
pub fn normalize_compression_level(requested: i32) -> i32 {
    if requested == 0 {
        return zstd::DEFAULT_COMPRESSION_LEVEL;
    }
    if requested > ZSTD_MAX_LEVEL {
        tracing::warn!(
            requested,
            clamped = ZSTD_MAX_LEVEL,
            "compression_level exceeds zstd maximum, clamping"
        );
        return ZSTD_MAX_LEVEL;
    }
    if requested < ZSTD_MIN_LEVEL {
        tracing::warn!(
            requested,
            raised = ZSTD_MIN_LEVEL,
            "compression_level below zstd minimum, raising"
        );
        return ZSTD_MIN_LEVEL;
    }
    requested
}

/// A decoded envelope header plus its (decompressed) payload.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub entry_type: EntryType,
    pub compression_type: CompressionType,
    pub compression_level: i32,
    pub self_contained: bool,
    pub creation_time: u64,
    pub ccache_version: String,
    pub namespace: String,
    pub payload: Vec<u8>,
}

impl Envelope {
    pub fn new(entry_type: EntryType, namespace: String, payload: Vec<u8>) -> Self {
        Self {
            entry_type,
            compression_type: CompressionType::Zstd,
            compression_level: 0,
            self_contained: true,
            creation_time: 0,
            ccache_version: env!("CARGO_PKG_VERSION").to_string(),
            namespace,
            payload,
        }
    }

    /// Encode the envelope to its on-disk byte form.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let level = normalize_compression_level(self.compression_level);
        let compressed = match self.compression_type {
            CompressionType::None => self.payload.clone(),
            CompressionType::Zstd => zstd::encode_all(self.payload.as_slice(), level)
                .map_err(|e| Error::Internal(format!("envelope: zstd encode failed: {e}")))?,
        };
        let checksum = xxhash_rust::xxh3::xxh3_64(&self.payload);

        let mut out = Vec::with_capacity(compressed.len() + 64);
        out.extend_from_slice(&MAGIC);
        out.push(FORMAT_VERSION);
        out.push(self.entry_type as u8);
        out.push(self.compression_type as u8);
        out.push(clamp_level_byte(level));
        out.push(self.self_contained as u8);
        out.extend_from_slice(&self.creation_time.to_le_bytes());
        write_string(&mut out, &self.ccache_version)?;
        write_string(&mut out, &self.namespace)?;
        out.extend_from_slice(&(compressed.len() as u64).to_le_bytes());
        out.extend_from_slice(&compressed);
        out.extend_from_slice(&checksum.to_le_bytes());
        Ok(out)
    }

    /// Decode and verify an envelope, returning the decompressed payload.
    ///
    /// Any structural or checksum failure is reported as
    /// [`Error::MissingCacheFile`] so callers treat it exactly like a
    /// cache miss (spec §4.6: "on any check failure, remove the file and
    /// return not-found").
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);

        let magic = cursor.take(4)?;
        if magic != MAGIC {
            return Err(Error::MissingCacheFile("bad magic".to_string()));
        }
        let format_version = cursor.take_u8()?;
        if format_version != FORMAT_VERSION {
            return Err(Error::MissingCacheFile(format!(
                "unsupported entry_format_version {format_version}"
            )));
        }
        let entry_type = EntryType::from_u8(cursor.take_u8()?)
            .map_err(|e| Error::MissingCacheFile(e.to_string()))?;
        let compression_type = CompressionType::from_u8(cursor.take_u8()?)
            .map_err(|e| Error::MissingCacheFile(e.to_string()))?;
        let compression_level = cursor.take_u8()? as i32;
        let self_contained = cursor.take_u8()? != 0;
        let creation_time = cursor.take_u64()?;
        let ccache_version = cursor.take_string()?;
        let namespace = cursor.take_string()?;
        let entry_size = cursor.take_u64()? as usize;
        let compressed = cursor.take(entry_size)?.to_vec();
        let stored_checksum = u64::from_le_bytes(
            cursor
                .take(8)?
                .try_into()
                .map_err(|_| Error::MissingCacheFile("truncated checksum".to_string()))?,
        );

        let payload = match compression_type {
            CompressionType::None => compressed,
            CompressionType::Zstd => zstd::decode_all(compressed.as_slice())
                .map_err(|_| Error::MissingCacheFile("zstd decode failed".to_string()))?,
        };

        let computed_checksum = xxhash_rust::xxh3::xxh3_64(&payload);
        if computed_checksum != stored_checksum {
            return Err(Error::MissingCacheFile("checksum mismatch".to_string()));
        }

        Ok(Self {
            entry_type,
            compression_type,
            compression_level,
            self_contained,
            creation_time,
            ccache_version,
            namespace,
            payload,
        })
    }
}

fn clamp_level_byte(level: i32) -> u8 {
    level.clamp(0, u8::MAX as i32) as u8
}

fn write_string(out: &mut Vec<u8>, s: &str) -> Result<()> {
    if s.len() > u16::MAX as usize {
        return Err(Error::Internal("envelope: string field too long".to_string()));
    }
    out.write_all(&(s.len() as u16).to_le_bytes())
        .map_err(|e| Error::Internal(format!("envelope: write failed: {e}")))?;
    out.write_all(s.as_bytes())
        .map_err(|e| Error::Internal(format!("envelope: write failed: {e}")))?;
    Ok(())
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.bytes.len() {
            return Err(Error::MissingCacheFile("truncated envelope".to_string()));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn take_u64(&mut self) -> Result<u64> {
        let bytes: [u8; 8] = self
            .take(8)?
            .try_into()
            .map_err(|_| Error::MissingCacheFile("truncated u64".to_string()))?;
        Ok(u64::from_le_bytes(bytes))
    }

    fn take_string(&mut self) -> Result<String> {
        let len_bytes: [u8; 2] = self
            .take(2)?
            .try_into()
            .map_err(|_| Error::MissingCacheFile("truncated string length".to_string()))?;
        let len = u16::from_le_bytes(len_bytes) as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| Error::MissingCacheFile("invalid utf-8 in envelope string".to_string()))
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
