//! Qwick Static Key-Value Store
//!
//! A read-optimized, immutable key-value store backed by a single
//! memory-mapped file, plus a chunked authenticated archive codec for
//! whole-file compress+encrypt round trips.
//!
//! ## Features
//!
//! - **Zero-copy reads**: lookups return slices pointing straight into
//!   the mapping
//! - **Binary-search index** with ordered prefix iteration
//! - **Per-value compression**: s2 for short values, zstd for long ones,
//!   with automatic codec detection at read time
//! - **Atomic builds**: write to a temporary file, fsync, rename
//! - **Authenticated archives**: s2 + AES-256-CTR + Poly1305 per 1 MiB
//!   chunk
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use qwick::{build, Database, MemTable};
//!
//! let mut table = MemTable::new();
//! table.insert("user:1", "Alice");
//! table.insert("user:2", "Bob");
//! build(&table, "users.qwick").unwrap();
//!
//! let db = Database::open("users.qwick").unwrap();
//! let mut scratch = Vec::new();
//! let value = db.find(b"user:2", &mut scratch).unwrap();
//! assert_eq!(value, Some(&b"Bob"[..]));
//!
//! db.prefix_raw(b"user:", |key, _raw| {
//!     println!("{}", String::from_utf8_lossy(key));
//!     true
//! })
//! .unwrap();
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             Qwick Database File             │
//! ├─────────────────────────────────────────────┤
//! │ Header (64 B)                               │
//! │  - Magic: "QWICK\xAB\xCD\xEF", version 1    │
//! │  - Entry count, index/blob offsets          │
//! │  - Compression code (0 auto, 1 zstd, 2 s2)  │
//! ├─────────────────────────────────────────────┤
//! │ Index (N x 24 B, sorted by key bytes)       │
//! │  - key offset/len, value offset/len         │
//! ├─────────────────────────────────────────────┤
//! │ Blob area                                   │
//! │  - keys and encoded values, interleaved     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Readers map the file once and serve any number of threads; builders
//! serialize an ordered source in a single pass and publish the file
//! with an atomic rename.

pub mod archive;
pub mod builder;
pub mod compression;
pub mod error;
pub mod header;
pub mod reader;
pub mod source;

// Re-export commonly used types
pub use archive::{decrypt, encrypt};
pub use builder::{build, build_with_options, BuildOptions};
pub use compression::{ZstdLevel, DEFAULT_SIZE_CUTOVER};
pub use error::{QwickError, Result};
pub use header::Compression;
pub use reader::Database;
pub use source::{MemTable, OrderedSource, Value};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Database file magic number.
pub const MAGIC: &[u8; 8] = &header::MAGIC;
