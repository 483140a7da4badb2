//! Error types for cryptographic operations

use thiserror::Error;

/// Errors that can occur during cryptographic operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Content hash stored in a container does not match the decrypted payload
    #[error("Checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Hash recorded in the container header
        expected: u32,
        /// Hash computed over the decrypted payload
        actual: u32,
    },
}
