//! Conversion commands.

use crate::config::{CliConfig, Command};
use crate::error::CliError;
use encoding_rs::Encoding;
use rscript_formats::blockpar::{
    BinaryLayout, BlockParError, Document, TextOptions, archive, binary, from_code, text,
};
use std::path::Path;
use tracing::{debug, info};

/// Run the configured conversion, returning the document that was written.
pub fn run(config: &CliConfig) -> Result<Document, CliError> {
    let encoding = config.text_encoding()?;
    let (input, output) = config.command.paths();
    debug!(
        "Running {} with {} text",
        config.command.name(),
        encoding.name()
    );

    let document = match &config.command {
        Command::Unpack { .. } => {
            let document = archive::read_file(input).map_err(convert(input))?;
            write_text(output, &document, encoding)?;
            document
        }
        Command::Pack { seed, .. } => {
            let document = read_text(input, encoding)?;
            archive::write_file(output, &document, *seed).map_err(convert(output))?;
            document
        }
        Command::Decode { grouped, .. } => {
            let document = binary::read_file(input, layout(*grouped)).map_err(convert(input))?;
            write_text(output, &document, encoding)?;
            document
        }
        Command::Encode { grouped, .. } => {
            let document = read_text(input, encoding)?;
            binary::write_file(output, &document, layout(*grouped)).map_err(convert(output))?;
            document
        }
        Command::Code { .. } => {
            let listing = read_listing(input, encoding)?;
            let document = from_code(&listing).map_err(convert(input))?;
            write_text(output, &document, encoding)?;
            document
        }
    };

    info!(
        "{} -> {}: {} top-level entries",
        input.display(),
        output.display(),
        document.len()
    );
    Ok(document)
}

fn layout(grouped: bool) -> BinaryLayout {
    if grouped {
        BinaryLayout::Grouped
    } else {
        BinaryLayout::Plain
    }
}

fn convert(path: &Path) -> impl FnOnce(BlockParError) -> CliError + '_ {
    move |source| CliError::Convert {
        path: path.to_path_buf(),
        source,
    }
}

fn read_text(path: &Path, encoding: &'static Encoding) -> Result<Document, CliError> {
    text::read_file_with(path, TextOptions::default().with_encoding(encoding))
        .map_err(convert(path))
}

fn write_text(path: &Path, document: &Document, encoding: &'static Encoding) -> Result<(), CliError> {
    text::write_file(path, document, encoding).map_err(convert(path))
}

fn read_listing(path: &Path, encoding: &'static Encoding) -> Result<String, CliError> {
    let bytes = std::fs::read(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let (listing, _, had_errors) = encoding.decode(&bytes);
    if had_errors {
        return Err(CliError::Convert {
            path: path.to_path_buf(),
            source: BlockParError::Encoding(format!("not valid {}", encoding.name())),
        });
    }
    Ok(listing.into_owned())
}
