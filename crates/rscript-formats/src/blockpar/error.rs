//! BlockPar error types

use rscript_crypto::CryptoError;
use thiserror::Error;

/// BlockPar-specific error type
#[derive(Debug, Error)]
pub enum BlockParError {
    /// No entry carries the requested name
    #[error("key not found: {0:?}")]
    KeyNotFound(String),

    /// A dotted path could not be followed down to its last segment
    #[error("path not found: {path:?} (at segment {segment:?})")]
    PathNotFound {
        /// Full dotted path requested
        path: String,
        /// Segment that was missing or not a block
        segment: String,
    },

    /// Path resolved to a block where a parameter was expected
    #[error("not a parameter: {0:?}")]
    NotAParameter(String),

    /// Path resolved to a parameter where a block was expected
    #[error("not a block: {0:?}")]
    NotABlock(String),

    /// Operation the document model does not provide
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// Entry kind byte other than 1 (param) or 2 (block)
    #[error("invalid entry kind: {0}")]
    InvalidEntryKind(u8),

    /// Entry with no content cannot be serialized
    #[error("entry {0:?} has undefined content")]
    UndefinedEntry(String),

    /// Wide string is not valid UTF-16
    #[error("invalid UTF-16 string at offset {0}")]
    InvalidWideString(u64),

    /// Stream ended inside a structure
    #[error("unexpected end of data: {0}")]
    UnexpectedEof(&'static str),

    /// Nesting exceeded the configured limit
    #[error("nesting depth exceeds limit of {0}")]
    NestingTooDeep(usize),

    /// Heredoc value without its closing marker
    #[error("heredoc starting at line {line} is not terminated")]
    UnterminatedHeredoc {
        /// Line holding the `<<<` marker
        line: usize,
    },

    /// Parameter value the text format cannot hold, such as a heredoc
    /// containing its own `>>>` terminator line
    #[error("value of {0:?} cannot be written as text")]
    UnrepresentableValue(String),

    /// Text could not be decoded or encoded in the configured encoding
    #[error("text encoding error: {0}")]
    Encoding(String),

    /// Compressed frame magic is neither `ZL01` nor `ZL02`
    #[error("invalid compression magic: expected ZL01 or ZL02, got {0:02X?}")]
    InvalidMagic([u8; 4]),

    /// Archive shorter than its fixed header
    #[error("archive too short: {0} bytes")]
    ArchiveTooShort(usize),

    /// Decompression failed
    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    /// Compression failed
    #[error("compression error: {0}")]
    CompressionError(String),

    /// Archive payload failed its integrity check
    #[error("integrity check failed: {0}")]
    Integrity(#[from] CryptoError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}

impl BlockParError {
    /// Whether the error comes from looking up or traversing a document,
    /// as opposed to reading or writing one
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            Self::KeyNotFound(_)
                | Self::PathNotFound { .. }
                | Self::NotAParameter(_)
                | Self::NotABlock(_)
        )
    }
}

/// Result type for BlockPar operations
pub type BlockParResult<T> = Result<T, BlockParError>;
