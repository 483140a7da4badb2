//! Space Rangers document converter.
//!
//! This crate drives the `rscript-formats` codecs from the command line,
//! converting between the three on-disk forms of a BlockPar document:
//! - encrypted `.dat` archives
//! - binary documents (plain or grouped layout)
//! - Windows-1251 text dumps
//!
//! It can also split brace-structured code listings into text dumps.
//!
//! # Architecture
//!
//! - `config`: argument and environment parsing, validation
//! - `commands`: one conversion per subcommand
//! - `error`: configuration and conversion errors
//!
//! # Example
//!
//! ```no_run
//! use rscript_cli::{CliConfig, commands};
//!
//! fn main() -> anyhow::Result<()> {
//!     tracing_subscriber::fmt::init();
//!
//!     let config = CliConfig::from_args();
//!     config.validate()?;
//!
//!     let document = commands::run(&config)?;
//!     println!("{} top-level entries", document.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod commands;
pub mod config;
pub mod error;

pub use config::{CliConfig, Command};
pub use error::{CliError, ConfigError};
