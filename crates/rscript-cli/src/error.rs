//! Error types for the converter.

use rscript_formats::blockpar::BlockParError;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Encoding label not known to the WHATWG encoding standard
    #[error("Unknown text encoding: {0}")]
    UnknownEncoding(String),

    /// Log level string that is not a tracing level
    #[error("Invalid log level '{0}': expected trace, debug, info, warn or error")]
    InvalidLogLevel(String),

    /// Input file does not exist
    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// Output would overwrite the input
    #[error("Output path is the same as the input: {}", .0.display())]
    SameInputOutput(PathBuf),
}

/// Conversion errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Reading or writing a document failed
    #[error("Failed to convert {}: {source}", path.display())]
    Convert {
        /// File being read or written
        path: PathBuf,
        /// Underlying document error
        #[source]
        source: BlockParError,
    },

    /// Failed to read a code listing
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        /// File being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ConfigError::UnknownEncoding("klingon".to_string());
        assert_eq!(err.to_string(), "Unknown text encoding: klingon");

        let err: CliError = ConfigError::MissingInput(PathBuf::from("main.dat")).into();
        assert_eq!(
            err.to_string(),
            "Configuration error: Input file not found: main.dat"
        );
    }

    #[test]
    fn test_convert_error_keeps_source() {
        let err = CliError::Convert {
            path: PathBuf::from("main.dat"),
            source: BlockParError::ArchiveTooShort(3),
        };
        assert!(err.to_string().contains("archive too short"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
