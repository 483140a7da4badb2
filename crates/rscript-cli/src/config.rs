//! Command-line configuration.
//!
//! Options can be given as CLI arguments or through environment variables
//! (`RSCRIPT_ENCODING`, `RSCRIPT_LOG_LEVEL`, `RSCRIPT_SEED`). Defaults match
//! the game's own files: Windows-1251 text dumps and seed 0.
//!
//! # Example
//!
//! ```
//! use clap::Parser;
//! use rscript_cli::{CliConfig, Command};
//!
//! let config = CliConfig::try_parse_from(["rscript", "pack", "ship.txt", "ship.dat", "--seed", "-7"])
//!     .expect("Test operation should succeed");
//!
//! assert!(matches!(config.command, Command::Pack { seed: -7, .. }));
//! assert_eq!(config.encoding, "windows-1251");
//! ```

use crate::error::ConfigError;
use clap::{Parser, Subcommand};
use encoding_rs::Encoding;
use std::path::{Path, PathBuf};

/// Converter configuration loaded from CLI args and environment variables.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rscript",
    about = "Convert Space Rangers BlockPar documents between .dat, binary and text forms",
    version
)]
pub struct CliConfig {
    /// Encoding of text dumps and code listings
    #[arg(
        long,
        global = true,
        env = "RSCRIPT_ENCODING",
        default_value = "windows-1251"
    )]
    pub encoding: String,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, env = "RSCRIPT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Conversion to perform
    #[command(subcommand)]
    pub command: Command,
}

/// Conversions between the on-disk forms.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Decrypt a .dat archive into a text dump
    Unpack {
        /// Archive to read
        input: PathBuf,
        /// Text file to write
        output: PathBuf,
    },

    /// Build a .dat archive from a text dump
    Pack {
        /// Text file to read
        input: PathBuf,
        /// Archive to write
        output: PathBuf,
        /// Keystream seed stored in the archive header
        #[arg(long, env = "RSCRIPT_SEED", default_value_t = 0, allow_negative_numbers = true)]
        seed: i32,
    },

    /// Convert a binary document into a text dump
    Decode {
        /// Binary document to read
        input: PathBuf,
        /// Text file to write
        output: PathBuf,
        /// Input carries group headers (archive payload layout)
        #[arg(long)]
        grouped: bool,
    },

    /// Convert a text dump into a binary document
    Encode {
        /// Text file to read
        input: PathBuf,
        /// Binary document to write
        output: PathBuf,
        /// Write group headers (archive payload layout)
        #[arg(long)]
        grouped: bool,
    },

    /// Split a brace-structured code listing into a text dump
    Code {
        /// Code listing to read
        input: PathBuf,
        /// Text file to write
        output: PathBuf,
    },
}

impl Command {
    /// Input and output paths of the conversion
    pub fn paths(&self) -> (&Path, &Path) {
        match self {
            Self::Unpack { input, output }
            | Self::Pack { input, output, .. }
            | Self::Decode { input, output, .. }
            | Self::Encode { input, output, .. }
            | Self::Code { input, output } => (input.as_path(), output.as_path()),
        }
    }

    /// Subcommand name, for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unpack { .. } => "unpack",
            Self::Pack { .. } => "pack",
            Self::Decode { .. } => "decode",
            Self::Encode { .. } => "encode",
            Self::Code { .. } => "code",
        }
    }
}

impl CliConfig {
    /// Parse configuration from command-line arguments.
    #[must_use]
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Resolve the configured text encoding.
    pub fn text_encoding(&self) -> Result<&'static Encoding, ConfigError> {
        Encoding::for_label(self.encoding.trim().as_bytes())
            .ok_or_else(|| ConfigError::UnknownEncoding(self.encoding.clone()))
    }

    /// Validate configuration before any file is touched.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The encoding label is unknown
    /// - The log level is not a tracing level
    /// - The input file doesn't exist
    /// - The output path equals the input path
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.text_encoding()?;

        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::InvalidLogLevel(self.log_level.clone()));
        }

        let (input, output) = self.command.paths();
        if !input.exists() {
            return Err(ConfigError::MissingInput(input.to_path_buf()));
        }
        if input == output {
            return Err(ConfigError::SameInputOutput(input.to_path_buf()));
        }

        Ok(())
    }
}
