//! Read-only database handle backed by a memory-mapped file.
//!
//! [`Database::open`] maps the file once and validates the header; every
//! lookup after that is a binary search over the index region followed by
//! a bounds-checked slice into the mapping. Returned key and value slices
//! borrow from the mapping, so the borrow checker ties their lifetime to
//! the handle: a `Database` cannot be closed or dropped while a returned
//! slice is live.
//!
//! The handle holds no mutable state, so a single `Database` can serve
//! lookups from any number of threads in parallel.

use crate::compression::decode_value_into;
use crate::error::{QwickError, Result};
use crate::header::{Compression, FileHeader, IndexEntry, HEADER_SIZE, INDEX_ENTRY_SIZE, VALUE_FORMAT_OPAQUE};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// A read-only database file.
pub struct Database {
    map: Mmap,
    header: FileHeader,
}

impl Database {
    /// Open and validate a database file.
    ///
    /// # Validation
    ///
    /// - The file must be at least 64 bytes (header size).
    /// - The magic must match and the version must be 1.
    /// - The compression code must be 0, 1 or 2.
    /// - The index region (`index_offset + 24 * num_entries`) must lie
    ///   inside the file.
    /// - The value-format tag must be 100 (opaque bytes).
    ///
    /// # Errors
    ///
    /// Returns an error if any validation fails or an I/O operation
    /// (open, stat, mmap) fails.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        // Checked before mapping: a zero-length file cannot be mapped at
        // all, and anything under 64 bytes has no header.
        if file.metadata()?.len() < HEADER_SIZE as u64 {
            return Err(QwickError::ShortFile("header"));
        }
        let map = unsafe { Mmap::map(&file)? };
        let header = FileHeader::from_bytes(&map)?;

        let index_end = header
            .num_entries
            .checked_mul(INDEX_ENTRY_SIZE)
            .and_then(|size| size.checked_add(header.index_offset))
            .ok_or(QwickError::ShortFile("invalid index size"))?;
        if index_end > map.len() as u64 {
            return Err(QwickError::ShortFile("invalid index size"));
        }

        if header.value_format != VALUE_FORMAT_OPAQUE {
            return Err(QwickError::CorruptData(format!(
                "unsupported value format {}",
                header.value_format
            )));
        }

        tracing::debug!(
            "opened {} ({} entries, compression {:?})",
            path.as_ref().display(),
            header.num_entries,
            header.compression
        );
        Ok(Database { map, header })
    }

    /// Number of entries in the file.
    pub fn len(&self) -> usize {
        self.header.num_entries as usize
    }

    pub fn is_empty(&self) -> bool {
        self.header.num_entries == 0
    }

    /// The compression code recorded in the header.
    pub fn compression(&self) -> Compression {
        self.header.compression
    }

    /// Close the database, unmapping the file.
    ///
    /// Consuming the handle makes any later use a compile error, and
    /// outstanding slices borrowed from the mapping keep it open until
    /// they are dropped.
    pub fn close(self) {}

    /// Look up `key` and return the stored (possibly compressed) value
    /// bytes as a slice into the mapping. Zero-copy.
    ///
    /// # Errors
    ///
    /// [`QwickError::CorruptData`] if an on-disk offset or length falls
    /// outside the file.
    pub fn get_raw(&self, key: &[u8]) -> Result<Option<&[u8]>> {
        let (index, found) = self.lower_bound(key)?;
        if !found {
            return Ok(None);
        }
        let entry = self.entry(index);
        Ok(Some(self.value_slice(&entry)?))
    }

    /// Look up `key` and return the decoded value.
    ///
    /// The value is decoded into `scratch` according to the file's
    /// compression code; the returned slice points into `scratch`, or
    /// into the mapping when the auto decoder passes the bytes through
    /// verbatim. `scratch` is reused across calls.
    ///
    /// # Errors
    ///
    /// [`QwickError::CorruptData`] for out-of-bounds on-disk ranges,
    /// [`QwickError::DecompressionFailed`] when a fixed codec rejects
    /// the stored bytes.
    pub fn find<'a>(&'a self, key: &[u8], scratch: &'a mut Vec<u8>) -> Result<Option<&'a [u8]>> {
        let raw = match self.get_raw(key)? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        decode_value_into(raw, self.header.compression, scratch).map(Some)
    }

    /// Visit every entry whose key starts with `prefix`, in ascending
    /// key order, with raw (stored) value bytes. Returning `false` from
    /// `visit` stops the walk.
    ///
    /// # Errors
    ///
    /// [`QwickError::CorruptData`] if an on-disk range is out of bounds;
    /// entries before the corrupt one will already have been visited.
    pub fn prefix_raw<F>(&self, prefix: &[u8], mut visit: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]) -> bool,
    {
        let (start, _) = self.lower_bound(prefix)?;
        for index in start..self.header.num_entries {
            let entry = self.entry(index);
            let key = self.key_slice(&entry)?;
            if !key.starts_with(prefix) {
                break;
            }
            let value = self.value_slice(&entry)?;
            if !visit(key, value) {
                break;
            }
        }
        Ok(())
    }

    /// Like [`prefix_raw`](Self::prefix_raw), but decodes each value
    /// into `scratch` before calling `visit`.
    ///
    /// `scratch` is overwritten on every iteration step, so callers must
    /// consume or copy the value before returning from `visit`. The walk
    /// stops at, and propagates, the first decode error.
    pub fn prefix<F>(&self, prefix: &[u8], scratch: &mut Vec<u8>, mut visit: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]) -> bool,
    {
        let (start, _) = self.lower_bound(prefix)?;
        for index in start..self.header.num_entries {
            let entry = self.entry(index);
            let key = self.key_slice(&entry)?;
            if !key.starts_with(prefix) {
                break;
            }
            let raw = self.value_slice(&entry)?;
            let value = decode_value_into(raw, self.header.compression, scratch)?;
            if !visit(key, value) {
                break;
            }
        }
        Ok(())
    }

    /// Binary search for `key` over `[0, num_entries)`.
    ///
    /// Returns `(index, true)` on an exact hit, or `(insertion index,
    /// false)` on a miss; the insertion index is the lower bound used to
    /// start prefix walks.
    fn lower_bound(&self, key: &[u8]) -> Result<(u64, bool)> {
        let mut lo = 0u64;
        let mut hi = self.header.num_entries;
        while lo < hi {
            let mid = (lo + hi) >> 1;
            let entry = self.entry(mid);
            match self.key_slice(&entry)?.cmp(key) {
                std::cmp::Ordering::Equal => return Ok((mid, true)),
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
            }
        }
        Ok((lo, false))
    }

    /// Read the `i`-th index entry. The whole index region was verified
    /// to be in bounds at open time.
    fn entry(&self, i: u64) -> IndexEntry {
        let offset = (self.header.index_offset + i * INDEX_ENTRY_SIZE) as usize;
        IndexEntry::from_bytes(&self.map[offset..offset + INDEX_ENTRY_SIZE as usize])
    }

    fn key_slice(&self, entry: &IndexEntry) -> Result<&[u8]> {
        self.slice(entry.key_offset, entry.key_len)
    }

    fn value_slice(&self, entry: &IndexEntry) -> Result<&[u8]> {
        self.slice(entry.value_offset, entry.value_len)
    }

    /// Bounds-checked slice into the mapping. On-disk offsets are
    /// untrusted input; a range outside the file is corruption, not a
    /// panic.
    fn slice(&self, offset: u64, len: u32) -> Result<&[u8]> {
        let end = offset
            .checked_add(len as u64)
            .filter(|&end| end <= self.map.len() as u64)
            .ok_or_else(|| {
                QwickError::CorruptData(format!("range {offset}+{len} outside file"))
            })?;
        Ok(&self.map[offset as usize..end as usize])
    }
}
