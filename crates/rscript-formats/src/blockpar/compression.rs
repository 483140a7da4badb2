//! `ZL01`/`ZL02` compression frame used inside archives.
//!
//! ```text
//! magic "ZL01" | u32 uncompressed_size (LE) | zlib stream
//! ```

use binrw::{BinRead, BinWrite};
use flate2::Compression;
use flate2::read::{ZlibDecoder, ZlibEncoder};
use std::io::{Cursor, Read};
use tracing::warn;

use crate::blockpar::error::{BlockParError, BlockParResult};

/// Maximum allowed decompression size (256 MB)
///
/// Decoded documents are a few megabytes at most; the cap keeps a crafted
/// frame from inflating without bound.
pub const MAX_DECOMPRESSION_SIZE: usize = 256 * 1024 * 1024;

/// Frame magic written by [`compress`]
pub const MAGIC_ZL01: [u8; 4] = *b"ZL01";

/// Alternate frame magic accepted on read
pub const MAGIC_ZL02: [u8; 4] = *b"ZL02";

/// Frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct FrameHeader {
    /// `ZL01` or `ZL02`
    pub magic: [u8; 4],
    /// Declared size of the decompressed payload
    pub uncompressed_size: u32,
}

impl FrameHeader {
    /// Encoded header size
    pub const SIZE: usize = 8;
}

/// Compress `data` into a `ZL01` frame
pub fn compress(data: &[u8]) -> BlockParResult<Vec<u8>> {
    let size = u32::try_from(data.len()).map_err(|_| {
        BlockParError::CompressionError(format!("payload of {} bytes is too large", data.len()))
    })?;

    let mut frame = Cursor::new(Vec::with_capacity(FrameHeader::SIZE + data.len() / 2));
    FrameHeader {
        magic: MAGIC_ZL01,
        uncompressed_size: size,
    }
    .write(&mut frame)?;

    let mut frame = frame.into_inner();
    let mut encoder = ZlibEncoder::new(data, Compression::best());
    encoder
        .read_to_end(&mut frame)
        .map_err(|e| BlockParError::CompressionError(format!("ZLib compression failed: {e}")))?;
    Ok(frame)
}

/// Decompress a `ZL01`/`ZL02` frame
pub fn decompress(frame: &[u8]) -> BlockParResult<Vec<u8>> {
    if frame.len() < FrameHeader::SIZE {
        return Err(BlockParError::UnexpectedEof("compression frame header"));
    }
    let header = FrameHeader::read(&mut Cursor::new(&frame[..FrameHeader::SIZE]))?;
    if header.magic != MAGIC_ZL01 && header.magic != MAGIC_ZL02 {
        return Err(BlockParError::InvalidMagic(header.magic));
    }

    let expected = header.uncompressed_size as usize;
    let mut decoder = ZlibDecoder::new(&frame[FrameHeader::SIZE..]);
    let mut decompressed = Vec::with_capacity(expected.min(MAX_DECOMPRESSION_SIZE));

    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = decoder
            .read(&mut buffer)
            .map_err(|e| BlockParError::DecompressionFailed(format!("ZLib: {e}")))?;
        if bytes_read == 0 {
            break;
        }
        if decompressed.len() + bytes_read > MAX_DECOMPRESSION_SIZE {
            return Err(BlockParError::DecompressionFailed(format!(
                "decompressed size exceeds limit of {MAX_DECOMPRESSION_SIZE} bytes"
            )));
        }
        decompressed.extend_from_slice(&buffer[..bytes_read]);
    }

    if decompressed.len() != expected {
        warn!(
            "Compression frame declares {} bytes but holds {}",
            expected,
            decompressed.len()
        );
    }
    Ok(decompressed)
}
