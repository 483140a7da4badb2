//! Encrypted `.dat` archive container.
//!
//! ```text
//! u32 content_hash | [u8; 4] masked_seed | ciphertext
//! ```
//!
//! The seed is stored XOR-ed with [`SEED_KEY`] and read back as a signed
//! little-endian integer. It seeds a [`Rand31pmCipher`] whose keystream
//! covers everything after the header. The plaintext is a compression frame
//! (see [`compression`](super::compression)) holding a binary document in
//! grouped layout, and its CRC32 must equal `content_hash` before anything
//! is decoded.

use binrw::{BinRead, BinWrite};
use rscript_crypto::{ContentHash, Rand31pmCipher};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

use crate::blockpar::binary::{self, BinaryLayout};
use crate::blockpar::compression;
use crate::blockpar::document::Document;
use crate::blockpar::error::{BlockParError, BlockParResult};

/// Mask applied to the stored seed bytes
pub const SEED_KEY: [u8; 4] = [0x89, 0xC6, 0xE8, 0xB1];

/// Fixed archive header
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct ArchiveHeader {
    /// CRC32 of the decrypted payload
    pub content_hash: ContentHash,
    /// Keystream seed, masked with [`SEED_KEY`]
    pub masked_seed: [u8; 4],
}

impl ArchiveHeader {
    /// Encoded header size
    pub const SIZE: usize = 8;

    /// Header for a payload with the given hash and seed
    pub fn new(content_hash: ContentHash, seed: i32) -> Self {
        Self {
            content_hash,
            masked_seed: mask(seed.to_le_bytes()),
        }
    }

    /// Unmasked keystream seed
    pub fn seed(&self) -> i32 {
        i32::from_le_bytes(mask(self.masked_seed))
    }
}

fn mask(bytes: [u8; 4]) -> [u8; 4] {
    let mut out = bytes;
    for (byte, key) in out.iter_mut().zip(SEED_KEY) {
        *byte ^= key;
    }
    out
}

/// Decrypt an archive and verify its hash, returning the compression frame.
///
/// Nothing is returned unless the hash matches.
pub fn unseal(data: &[u8]) -> BlockParResult<Vec<u8>> {
    if data.len() < ArchiveHeader::SIZE {
        return Err(BlockParError::ArchiveTooShort(data.len()));
    }
    let header = ArchiveHeader::read(&mut Cursor::new(&data[..ArchiveHeader::SIZE]))?;
    debug!(
        "Archive header: hash {}, seed {}",
        header.content_hash,
        header.seed()
    );

    let mut payload = data[ArchiveHeader::SIZE..].to_vec();
    Rand31pmCipher::new(header.seed()).apply_keystream(&mut payload);
    header.content_hash.verify(&payload)?;
    Ok(payload)
}

/// Encrypt a compression frame under `seed` and prepend the header
pub fn seal(frame: &[u8], seed: i32) -> BlockParResult<Vec<u8>> {
    let header = ArchiveHeader::new(ContentHash::from_data(frame), seed);

    let mut out = Cursor::new(Vec::with_capacity(ArchiveHeader::SIZE + frame.len()));
    header.write(&mut out)?;
    let mut out = out.into_inner();

    let start = out.len();
    out.extend_from_slice(frame);
    Rand31pmCipher::new(seed).apply_keystream(&mut out[start..]);
    Ok(out)
}

/// Decode an archive held in memory
pub fn parse(data: &[u8]) -> BlockParResult<Document> {
    let frame = unseal(data)?;
    let payload = compression::decompress(&frame)?;
    binary::parse(&payload, BinaryLayout::Grouped)
}

/// Encode a document as an archive keyed by `seed`
pub fn build(document: &Document, seed: i32) -> BlockParResult<Vec<u8>> {
    let payload = binary::build(document, BinaryLayout::Grouped)?;
    let frame = compression::compress(&payload)?;
    seal(&frame, seed)
}

/// Read an archive file
pub fn read_file<P: AsRef<Path>>(path: P) -> BlockParResult<Document> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let document = parse(&data)?;
    info!(
        "Loaded archive {} ({} bytes, {} top-level entries)",
        path.display(),
        data.len(),
        document.len()
    );
    Ok(document)
}

/// Write an archive file
pub fn write_file<P: AsRef<Path>>(path: P, document: &Document, seed: i32) -> BlockParResult<()> {
    let path = path.as_ref();
    let data = build(document, seed)?;
    std::fs::write(path, &data)?;
    info!("Wrote archive {} ({} bytes)", path.display(), data.len());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rscript_crypto::CryptoError;

    fn sample() -> Document {
        let mut weapons = Document::unsorted();
        weapons.set("slot", "laser");
        weapons.set("slot", "missile");
        let mut doc = Document::new();
        doc.set("name", "Rigel");
        doc.set("weapons", weapons);
        doc.set("hull", "200");
        doc
    }

    #[test]
    fn test_seed_masking() {
        let header = ArchiveHeader::new(ContentHash::from_u32(0), 0);
        assert_eq!(header.masked_seed, SEED_KEY);
        assert_eq!(header.seed(), 0);

        let header = ArchiveHeader::new(ContentHash::from_u32(0), -12345);
        assert_eq!(header.seed(), -12345);
    }

    #[test]
    fn test_archive_round_trip() {
        let doc = sample();
        let data = build(&doc, 0x1234_5678).unwrap();

        let mut cursor = Cursor::new(&data[..ArchiveHeader::SIZE]);
        let header = ArchiveHeader::read(&mut cursor).unwrap();
        assert_eq!(header.seed(), 0x1234_5678);

        assert_eq!(parse(&data).unwrap(), doc);
    }

    #[test]
    fn test_unseal_exposes_zl01_frame() {
        let data = build(&sample(), -7).unwrap();
        let frame = unseal(&data).unwrap();
        assert_eq!(&frame[..4], b"ZL01");
    }

    #[test]
    fn test_hash_field_tamper() {
        let mut data = build(&sample(), 99).unwrap();
        data[0] ^= 0x01;
        assert!(matches!(
            parse(&data),
            Err(BlockParError::Integrity(CryptoError::ChecksumMismatch { .. }))
        ));
    }

    #[test]
    fn test_short_archive() {
        assert!(matches!(
            parse(&[0u8; 5]),
            Err(BlockParError::ArchiveTooShort(5))
        ));
    }

    #[test]
    fn test_verified_frame_with_bad_magic() {
        let sealed = seal(b"XXXXpayload", 5).unwrap();
        assert!(matches!(
            parse(&sealed),
            Err(BlockParError::InvalidMagic(magic)) if &magic == b"XXXX"
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.dat");
        write_file(&path, &sample(), 42).unwrap();
        assert_eq!(read_file(&path).unwrap(), sample());
    }

    proptest! {
        #[test]
        fn any_payload_bit_flip_is_rejected(
            seed in any::<i32>(),
            position in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let mut data = build(&sample(), seed).unwrap();
            let index = ArchiveHeader::SIZE + position.index(data.len() - ArchiveHeader::SIZE);
            data[index] ^= 1 << bit;

            let result = parse(&data);
            prop_assert!(
                matches!(result, Err(BlockParError::Integrity(_))),
                "flip at byte {} bit {} gave {:?}", index, bit, result
            );
        }
    }
}
