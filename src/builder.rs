//! Database construction.
//!
//! The builder walks an [`OrderedSource`] twice: once to count entries
//! (which fixes the index size and therefore the blob-area offset), once
//! to write keys and encoded values. Everything goes into a `<target>.tmp`
//! sibling first; the finished file is fsynced and renamed over the
//! target, so a concurrently opened reader sees either the old file or
//! the new one, never a partial write.
//!
//! On failure the temporary file is left behind and the target is
//! untouched.

use crate::compression::{encode_value, ZstdLevel, DEFAULT_SIZE_CUTOVER};
use crate::error::{QwickError, Result};
use crate::header::{Compression, FileHeader, IndexEntry, HEADER_SIZE, INDEX_ENTRY_SIZE};
use crate::source::OrderedSource;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

/// Build-time knobs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BuildOptions {
    /// File-wide compression code. [`Compression::Auto`] picks s2 or
    /// zstd per value by size and stores code 0 in the header.
    pub compression: Compression,

    /// Zstd speed knob, used whenever a value is zstd-encoded.
    pub zstd_level: ZstdLevel,

    /// Auto-mode size split: values up to this many bytes use s2,
    /// longer ones zstd. 0 disables the split (everything s2).
    pub size_cutover: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            compression: Compression::Auto,
            zstd_level: ZstdLevel::Fastest,
            size_cutover: DEFAULT_SIZE_CUTOVER,
        }
    }
}

/// Build a database file with default options (auto compression,
/// fastest zstd, 256-byte cutover).
pub fn build<S: OrderedSource>(source: &S, path: impl AsRef<Path>) -> Result<()> {
    build_with_options(source, path, BuildOptions::default())
}

/// Build a database file at `path` from `source`.
///
/// The source must yield keys in strictly ascending byte order with no
/// duplicates; the builder writes entries as visited and does not sort.
/// Missing parent directories of `path` are created.
///
/// # Errors
///
/// Any I/O failure aborts the build, leaving `<path>.tmp` behind and the
/// target unchanged.
pub fn build_with_options<S: OrderedSource>(
    source: &S,
    path: impl AsRef<Path>,
    opts: BuildOptions,
) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let num = source.len() as u64;
    let header = FileHeader::new(num, opts.compression);

    let tmp = {
        let mut os = path.as_os_str().to_os_string();
        os.push(".tmp");
        std::path::PathBuf::from(os)
    };

    let mut w = BufWriter::new(File::create(&tmp)?);
    w.write_all(&[0u8; HEADER_SIZE])?;
    w.seek(SeekFrom::Start(header.blob_offset))?;

    let mut entries = Vec::with_capacity(num as usize);
    let mut offset = header.blob_offset;
    let mut failure: Option<QwickError> = None;

    source.for_each_sorted(&mut |key, value| {
        let step = (|| -> Result<()> {
            let plain = value.to_bytes();
            let encoded = encode_value(&plain, opts.compression, opts.zstd_level, opts.size_cutover)?;

            let key_offset = offset;
            w.write_all(key)?;
            offset += key.len() as u64;

            let value_offset = offset;
            w.write_all(&encoded)?;
            offset += encoded.len() as u64;

            entries.push(IndexEntry {
                key_offset,
                key_len: key.len() as u32,
                value_offset,
                value_len: encoded.len() as u32,
            });
            Ok(())
        })();
        match step {
            Ok(()) => true,
            Err(e) => {
                failure = Some(e);
                false
            }
        }
    });
    if let Some(e) = failure {
        return Err(e);
    }
    if entries.len() as u64 != num {
        return Err(QwickError::CorruptData(format!(
            "source yielded {} entries, expected {num}",
            entries.len()
        )));
    }

    w.seek(SeekFrom::Start(header.index_offset))?;
    for entry in &entries {
        w.write_all(&entry.to_bytes())?;
    }

    w.seek(SeekFrom::Start(0))?;
    w.write_all(&header.to_bytes())?;
    w.flush()?;

    let file = w.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, path)?;
    tracing::debug!("built {} entries into {}", num, path.display());
    Ok(())
}
