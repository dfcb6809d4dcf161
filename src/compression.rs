//! Per-value compression for database blobs.
//!
//! Two codecs are supported: s2 (snappy-family, fast) and zstd (better
//! ratio). In [`Compression::Auto`] mode the builder picks s2 for short
//! values and zstd for long ones, split at a byte-size cutover, and the
//! file header records code 0; the reader then recovers the codec per
//! value by trial decoding (s2 first, then zstd, else the bytes are
//! taken verbatim).

use crate::error::{QwickError, Result};
use crate::header::Compression;
use serde::{Deserialize, Serialize};

/// Default cutover between s2 (short values) and zstd (long values) in
/// auto mode.
pub const DEFAULT_SIZE_CUTOVER: usize = 256;

/// Zstd encoder speed knob.
///
/// The coarse 1/2/3 scale maps onto native zstd compression levels.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZstdLevel {
    /// Fastest encoding, lowest ratio (zstd level 1).
    Fastest = 1,
    /// Balanced speed and ratio (zstd level 3).
    Default = 2,
    /// Slower encoding, better ratio (zstd level 7).
    Better = 3,
}

impl ZstdLevel {
    /// Native zstd compression level for this knob position.
    pub fn to_native(self) -> i32 {
        match self {
            ZstdLevel::Fastest => 1,
            ZstdLevel::Default => 3,
            ZstdLevel::Better => 7,
        }
    }
}

impl Default for ZstdLevel {
    fn default() -> Self {
        ZstdLevel::Fastest
    }
}

/// Encode one value for storage.
///
/// With a fixed code the matching codec is applied unconditionally. With
/// [`Compression::Auto`], values up to `size_cutover` bytes are
/// s2-encoded and longer ones zstd-encoded; a cutover of 0 disables the
/// size split and s2-encodes everything.
pub fn encode_value(
    value: &[u8],
    compression: Compression,
    level: ZstdLevel,
    size_cutover: usize,
) -> Result<Vec<u8>> {
    let codec = match compression {
        Compression::Auto => {
            if size_cutover > 0 && value.len() > size_cutover {
                Compression::Zstd
            } else {
                Compression::S2
            }
        }
        fixed => fixed,
    };

    match codec {
        Compression::Zstd => Ok(zstd::bulk::compress(value, level.to_native())?),
        _ => snap::raw::Encoder::new()
            .compress_vec(value)
            .map_err(|e| QwickError::CorruptData(format!("s2 encoding failed: {e}"))),
    }
}

/// Decode one stored value into `scratch`, returning the decoded slice.
///
/// The returned slice points into `scratch` when a codec ran, or into
/// `value` itself on the auto-mode raw fallthrough. `scratch` is reused
/// across calls; its previous contents are overwritten.
///
/// # Errors
///
/// With a fixed file compression, [`QwickError::DecompressionFailed`]
/// when the codec rejects the bytes. In auto mode decoding never fails:
/// bytes that are neither valid s2 nor valid zstd are returned verbatim.
pub fn decode_value_into<'a>(
    value: &'a [u8],
    compression: Compression,
    scratch: &'a mut Vec<u8>,
) -> Result<&'a [u8]> {
    let decoded_len = match compression {
        Compression::Zstd => Some(
            zstd_decompress_into(value, scratch)
                .map_err(|e| QwickError::DecompressionFailed(format!("zstd: {e}")))?,
        ),
        Compression::S2 => Some(
            s2_decompress_into(value, scratch)
                .map_err(|e| QwickError::DecompressionFailed(format!("s2: {e}")))?,
        ),
        Compression::Auto => {
            // Trial order matters for compatibility: s2 first, then zstd.
            if let Ok(n) = s2_decompress_into(value, scratch) {
                Some(n)
            } else if let Ok(n) = zstd_decompress_into(value, scratch) {
                Some(n)
            } else {
                None
            }
        }
    };

    match decoded_len {
        Some(n) => Ok(&scratch[..n]),
        None => Ok(value),
    }
}

pub(crate) fn s2_decompress_into(
    value: &[u8],
    scratch: &mut Vec<u8>,
) -> std::result::Result<usize, snap::Error> {
    let len = snap::raw::decompress_len(value)?;
    scratch.resize(len, 0);
    snap::raw::Decoder::new().decompress(value, scratch)
}

fn zstd_decompress_into(value: &[u8], scratch: &mut Vec<u8>) -> std::io::Result<usize> {
    scratch.clear();
    zstd::stream::copy_decode(value, &mut *scratch)?;
    Ok(scratch.len())
}
