//! DTA error types

use thiserror::Error;

/// DTA-specific error type
#[derive(Debug, Error)]
pub enum DtaError {
    /// The stream does not start with the `ISD0` signature
    #[error("invalid archive signature: expected [49 53 44 30], got {0:02X?}")]
    BadSignature([u8; 4]),

    /// A read or seek ran past the end of the stream
    #[error("truncated archive: {what} at offset {offset} needs {needed} bytes")]
    Truncated {
        /// Structure being read
        what: &'static str,
        /// Stream offset where the read started
        offset: u64,
        /// Number of bytes the read required
        needed: u64,
    },

    /// No catalog entry has the requested name
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// No catalog entry has the requested index
    #[error("entry index {index} out of range (archive has {count} entries)")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of entries in the catalog
        count: usize,
    },

    /// DPCM audio with a channel layout the decoder does not handle
    #[error("unsupported audio layout: {channels} channels (only mono is decoded)")]
    UnsupportedAudioLayout {
        /// Channel count from the embedded audio header
        channels: u16,
    },

    /// Block payload is inconsistent with its codec
    #[error("corrupt block: {0}")]
    CorruptBlock(String),

    /// Block type tag not handled by any codec
    #[error("unknown block type: 0x{0:02X}")]
    UnknownBlockType(u8),

    /// Decoded length differs from the size declared in the file header
    #[error("size mismatch for {name}: header declares {expected} bytes, decoded {actual}")]
    SizeMismatch {
        /// Entry name
        name: String,
        /// Size from the data file header
        expected: u64,
        /// Number of bytes actually decoded
        actual: u64,
    },

    /// Decoded output exceeded the configured ceiling
    #[error("decoded output exceeds limit of {limit} bytes")]
    OutputTooLarge {
        /// Configured limit in bytes
        limit: usize,
    },

    /// Delta table resource has the wrong shape
    #[error("invalid delta tables: expected {expected} bytes, got {actual}")]
    InvalidDeltaTables {
        /// Expected resource size in bytes
        expected: usize,
        /// Actual resource size in bytes
        actual: usize,
    },

    /// DPCM block met while only the placeholder delta tables are loaded
    #[error("DPCM audio needs loaded delta tables; the built-in tables are placeholders")]
    PlaceholderDeltaTables,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}

/// Result type for DTA operations
pub type DtaResult<T> = Result<T, DtaError>;

/// Fill `buf` from `reader`, reporting a short read as [`DtaError::Truncated`]
pub(crate) fn read_exact_or_truncated<R: std::io::Read>(
    reader: &mut R,
    buf: &mut [u8],
    what: &'static str,
    offset: u64,
) -> DtaResult<()> {
    let needed = buf.len() as u64;
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            DtaError::Truncated {
                what,
                offset,
                needed,
            }
        } else {
            DtaError::Io(e)
        }
    })
}
