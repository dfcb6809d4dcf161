//! Chunked authenticated archive codec.
//!
//! Converts a plaintext file into a sequence of self-authenticated,
//! compressed chunks and back:
//!
//! - s2 compression per chunk (1 MiB of plaintext each)
//! - AES-256-CTR encryption, the fresh 16-byte random nonce doubling as
//!   the initial counter block
//! - Poly1305 tag over the ciphertext, keyed by a one-time key derived
//!   with HKDF-SHA256 from (master key, nonce), so master-key reuse
//!   across chunks and archives is safe
//! - chunk framing: `[nonce: 16][ciphertext len: u32 LE][ciphertext][tag: 16]`
//!
//! The archive has no magic and no trailer; it is exactly a sequence of
//! chunks and must end on a chunk boundary. Decryption verifies each tag
//! in constant time before touching the ciphertext and stops at the
//! first failing chunk without emitting its plaintext.

use crate::compression::s2_decompress_into;
use crate::error::{QwickError, Result};
use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};
use hkdf::Hkdf;
use memmap2::Mmap;
use poly1305::{universal_hash::KeyInit, Poly1305};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use subtle::ConstantTimeEq;

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// Master key length (AES-256).
pub const KEY_SIZE: usize = 32;

/// Per-chunk nonce length; the nonce is used directly as the CTR
/// initial counter block.
pub const NONCE_SIZE: usize = 16;

/// Poly1305 tag length.
pub const TAG_SIZE: usize = 16;

/// Plaintext bytes per chunk.
pub const CHUNK_SIZE: usize = 1 << 20;

/// Fixed-size chunk prefix: nonce + ciphertext length.
const CHUNK_HEADER_SIZE: usize = NONCE_SIZE + 4;

/// HKDF info string for the one-time MAC key.
const MAC_INFO: &[u8] = b"poly1305";

/// Compress and encrypt `src` into `dst`.
///
/// The source is read through a read-only memory map; an empty source
/// produces an empty archive. Source and destination must be distinct
/// files.
///
/// # Errors
///
/// [`QwickError::InvalidKey`] if `master_key` is not 32 bytes, or
/// [`QwickError::Io`] on any file operation.
pub fn encrypt(dst: impl AsRef<Path>, src: impl AsRef<Path>, master_key: &[u8]) -> Result<()> {
    let key = check_key(master_key)?;

    let src = File::open(src.as_ref())?;
    let src_len = src.metadata()?.len();
    let mut out = BufWriter::new(File::create(dst.as_ref())?);
    if src_len == 0 {
        out.flush()?;
        return Ok(());
    }

    let map = unsafe { Mmap::map(&src)? };
    let mut encoder = snap::raw::Encoder::new();
    let mut compressed = vec![0u8; snap::raw::max_compress_len(CHUNK_SIZE)];
    let mut nonce = [0u8; NONCE_SIZE];

    for chunk in map.chunks(CHUNK_SIZE) {
        let len = encoder
            .compress(chunk, &mut compressed)
            .map_err(|e| QwickError::CorruptData(format!("s2 encoding failed: {e}")))?;

        OsRng.fill_bytes(&mut nonce);
        let mac_key = derive_mac_key(&key, &nonce);

        let mut cipher = Aes256Ctr::new(&key.into(), &nonce.into());
        cipher.apply_keystream(&mut compressed[..len]);

        let tag = Poly1305::new(&mac_key.into()).compute_unpadded(&compressed[..len]);

        out.write_all(&nonce)?;
        out.write_all(&(len as u32).to_le_bytes())?;
        out.write_all(&compressed[..len])?;
        out.write_all(tag.as_slice())?;
    }

    out.flush()?;
    Ok(())
}

/// Authenticate, decrypt and decompress `src` into `dst`.
///
/// Chunks are processed in order; verification happens before
/// decryption, so a tampered chunk contributes no plaintext. On failure
/// the destination holds the plaintext of the chunks that preceded the
/// failing one.
///
/// # Errors
///
/// [`QwickError::InvalidKey`], [`QwickError::Truncated`] for a short
/// chunk header or body, [`QwickError::AuthenticationFailed`] on tag
/// mismatch, [`QwickError::DecompressionFailed`] if the decrypted bytes
/// are not a valid s2 block, or [`QwickError::Io`].
pub fn decrypt(dst: impl AsRef<Path>, src: impl AsRef<Path>, master_key: &[u8]) -> Result<()> {
    let key = check_key(master_key)?;

    let src = File::open(src.as_ref())?;
    let src_len = src.metadata()?.len();
    let mut out = BufWriter::new(File::create(dst.as_ref())?);
    if src_len == 0 {
        out.flush()?;
        return Ok(());
    }

    let map = unsafe { Mmap::map(&src)? };
    let data: &[u8] = &map;
    let mut cipher_buf = Vec::new();
    let mut plain = Vec::new();
    let mut offset = 0usize;

    while offset < data.len() {
        if data.len() - offset < CHUNK_HEADER_SIZE {
            return Err(QwickError::Truncated("chunk header"));
        }
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&data[offset..offset + NONCE_SIZE]);
        let len = u32::from_le_bytes([
            data[offset + NONCE_SIZE],
            data[offset + NONCE_SIZE + 1],
            data[offset + NONCE_SIZE + 2],
            data[offset + NONCE_SIZE + 3],
        ]) as usize;
        offset += CHUNK_HEADER_SIZE;

        if data.len() - offset < len + TAG_SIZE {
            return Err(QwickError::Truncated("chunk body"));
        }
        let ciphertext = &data[offset..offset + len];
        let provided_tag = &data[offset + len..offset + len + TAG_SIZE];
        offset += len + TAG_SIZE;

        let mac_key = derive_mac_key(&key, &nonce);
        let expected = Poly1305::new(&mac_key.into()).compute_unpadded(ciphertext);
        if !bool::from(expected.as_slice().ct_eq(provided_tag)) {
            return Err(QwickError::AuthenticationFailed);
        }

        cipher_buf.clear();
        cipher_buf.extend_from_slice(ciphertext);
        let mut cipher = Aes256Ctr::new(&key.into(), &nonce.into());
        cipher.apply_keystream(&mut cipher_buf);

        let plain_len = s2_decompress_into(&cipher_buf, &mut plain)
            .map_err(|e| QwickError::DecompressionFailed(format!("s2: {e}")))?;
        out.write_all(&plain[..plain_len])?;
    }

    out.flush()?;
    Ok(())
}

fn check_key(master_key: &[u8]) -> Result<[u8; KEY_SIZE]> {
    master_key
        .try_into()
        .map_err(|_| QwickError::InvalidKey(master_key.len()))
}

/// One-time Poly1305 key: HKDF-SHA256 with the master key as input key
/// material and the chunk nonce as salt.
fn derive_mac_key(master: &[u8; KEY_SIZE], nonce: &[u8; NONCE_SIZE]) -> [u8; KEY_SIZE] {
    let hkdf = Hkdf::<Sha256>::new(Some(nonce.as_slice()), master);
    let mut okm = [0u8; KEY_SIZE];
    hkdf.expand(MAC_INFO, &mut okm)
        .expect("32-byte output is within HKDF-SHA256 limits");
    okm
}
