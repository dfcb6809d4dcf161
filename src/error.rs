use thiserror::Error;

#[derive(Error, Debug)]
pub enum QwickError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid magic number in header")]
    BadMagic,

    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u32),

    #[error("unsupported compression code: {0}")]
    UnsupportedCompression(u32),

    #[error("file too short: {0}")]
    ShortFile(&'static str),

    #[error("corrupt data: {0}")]
    CorruptData(String),

    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("archive key must be 32 bytes, got {0}")]
    InvalidKey(usize),

    #[error("truncated archive: {0}")]
    Truncated(&'static str),

    #[error("archive chunk authentication failed")]
    AuthenticationFailed,
}

pub type Result<T> = std::result::Result<T, QwickError>;
