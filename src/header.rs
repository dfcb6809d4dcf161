//! Binary file format constants, header and index-entry codecs.
//!
//! A database file is laid out as:
//!
//! ```text
//! [header: 64 bytes][index: N * 24 bytes][blob area: keys and values]
//! ```
//!
//! All integers are little-endian. The header occupies the first 64 bytes:
//!
//! ```text
//! offset  0..8   magic        "QWICK\xAB\xCD\xEF"
//! offset  8..12  version      u32, currently 1
//! offset 12..16  reserved     u32, written as zero
//! offset 16..24  num_entries  u64
//! offset 24..32  index_offset u64, always 64
//! offset 32..40  blob_offset  u64, always 64 + 24 * num_entries
//! offset 40..44  value_format u32, 100 = opaque bytes
//! offset 44..48  compression  u32, 0 = auto, 1 = zstd, 2 = s2
//! offset 48..64  padding      written as zero
//! ```

use crate::error::{QwickError, Result};
use serde::{Deserialize, Serialize};

/// Magic number identifying database files.
pub const MAGIC: [u8; 8] = *b"QWICK\xAB\xCD\xEF";

/// Current format version.
pub const VERSION: u32 = 1;

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 64;

/// Size of one index entry in bytes: koff (8) + klen (4) + voff (8) + vlen (4).
pub const INDEX_ENTRY_SIZE: u64 = 24;

/// Value-format tag for opaque byte values, the only format in version 1.
pub const VALUE_FORMAT_OPAQUE: u32 = 100;

/// Compression code stored in the file header.
///
/// `Auto` is written as `0`: the builder picks s2 or zstd per value by
/// size, and the reader recovers the codec by trial decoding. This is
/// probabilistic — an arbitrary byte string may incidentally parse as a
/// valid s2 frame — but is kept for format compatibility.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compression {
    /// Per-value choice at build time, trial decoding at read time.
    Auto = 0,
    /// Every value is a zstd frame.
    Zstd = 1,
    /// Every value is an s2 (snappy-family) block.
    S2 = 2,
}

impl Compression {
    /// Parse a compression code from the header.
    ///
    /// # Errors
    ///
    /// Returns [`QwickError::UnsupportedCompression`] for unknown codes.
    pub fn from_u32(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Compression::Auto),
            1 => Ok(Compression::Zstd),
            2 => Ok(Compression::S2),
            other => Err(QwickError::UnsupportedCompression(other)),
        }
    }
}

impl Default for Compression {
    fn default() -> Self {
        Compression::Auto
    }
}

/// Parsed file header.
#[derive(Debug, Clone, Copy)]
pub struct FileHeader {
    /// Format version (always 1 after validation).
    pub version: u32,

    /// Number of index entries in the file.
    pub num_entries: u64,

    /// Absolute offset of the index table (always 64).
    pub index_offset: u64,

    /// Absolute offset of the blob area.
    pub blob_offset: u64,

    /// Value-format tag (100 = opaque bytes).
    pub value_format: u32,

    /// File-wide compression code.
    pub compression: Compression,
}

impl FileHeader {
    /// Create a header for a file with `num_entries` entries.
    pub fn new(num_entries: u64, compression: Compression) -> Self {
        FileHeader {
            version: VERSION,
            num_entries,
            index_offset: HEADER_SIZE as u64,
            blob_offset: HEADER_SIZE as u64 + num_entries * INDEX_ENTRY_SIZE,
            value_format: VALUE_FORMAT_OPAQUE,
            compression,
        }
    }

    /// Serialize the header to its 64-byte on-disk form.
    ///
    /// Reserved and padding bytes are written as zero.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..8].copy_from_slice(&MAGIC);
        bytes[8..12].copy_from_slice(&self.version.to_le_bytes());
        bytes[16..24].copy_from_slice(&self.num_entries.to_le_bytes());
        bytes[24..32].copy_from_slice(&self.index_offset.to_le_bytes());
        bytes[32..40].copy_from_slice(&self.blob_offset.to_le_bytes());
        bytes[40..44].copy_from_slice(&self.value_format.to_le_bytes());
        bytes[44..48].copy_from_slice(&(self.compression as u32).to_le_bytes());
        bytes
    }

    /// Parse and validate a header from the first bytes of a mapped file.
    ///
    /// Checks, in order: buffer length, magic, version, compression code.
    /// Index bounds depend on the total file size and are checked by the
    /// reader at open time.
    ///
    /// # Errors
    ///
    /// [`QwickError::ShortFile`], [`QwickError::BadMagic`],
    /// [`QwickError::UnsupportedVersion`] or
    /// [`QwickError::UnsupportedCompression`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(QwickError::ShortFile("header"));
        }

        if bytes[0..8] != MAGIC {
            return Err(QwickError::BadMagic);
        }

        let version = read_u32_le(bytes, 8);
        if version != VERSION {
            return Err(QwickError::UnsupportedVersion(version));
        }

        let compression = Compression::from_u32(read_u32_le(bytes, 44))?;

        Ok(FileHeader {
            version,
            num_entries: read_u64_le(bytes, 16),
            index_offset: read_u64_le(bytes, 24),
            blob_offset: read_u64_le(bytes, 32),
            value_format: read_u32_le(bytes, 40),
            compression,
        })
    }
}

/// One 24-byte index record locating a key and its encoded value.
///
/// Offsets are absolute file offsets into the blob area; lengths are the
/// on-disk byte counts (for values, the post-encoding length).
#[derive(Debug, Clone, Copy)]
pub struct IndexEntry {
    pub key_offset: u64,
    pub key_len: u32,
    pub value_offset: u64,
    pub value_len: u32,
}

impl IndexEntry {
    /// Serialize to the 24-byte on-disk form.
    pub fn to_bytes(&self) -> [u8; INDEX_ENTRY_SIZE as usize] {
        let mut bytes = [0u8; INDEX_ENTRY_SIZE as usize];
        bytes[0..8].copy_from_slice(&self.key_offset.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.key_len.to_le_bytes());
        bytes[12..20].copy_from_slice(&self.value_offset.to_le_bytes());
        bytes[20..24].copy_from_slice(&self.value_len.to_le_bytes());
        bytes
    }

    /// Parse from a 24-byte on-disk record.
    ///
    /// The caller guarantees `bytes` holds at least one full record; the
    /// reader validates the whole index region against the file size at
    /// open time.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        IndexEntry {
            key_offset: read_u64_le(bytes, 0),
            key_len: read_u32_le(bytes, 8),
            value_offset: read_u64_le(bytes, 12),
            value_len: read_u32_le(bytes, 20),
        }
    }
}

fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn read_u64_le(bytes: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
        bytes[offset + 4],
        bytes[offset + 5],
        bytes[offset + 6],
        bytes[offset + 7],
    ])
}
