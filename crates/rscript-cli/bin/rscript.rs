//! Converter binary entry point.
//!
//! This is a thin wrapper around the rscript-cli library that:
//! 1. Parses command-line arguments
//! 2. Initializes logging
//! 3. Validates configuration
//! 4. Runs the conversion

use anyhow::Result;
use rscript_cli::{CliConfig, commands};

fn main() -> Result<()> {
    let config = CliConfig::from_args();

    // RUST_LOG wins over --log-level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    config.validate()?;

    let (input, output) = config.command.paths();
    tracing::info!(
        "Converting {} into {} ({})",
        input.display(),
        output.display(),
        config.command.name()
    );

    commands::run(&config)?;
    Ok(())
}
