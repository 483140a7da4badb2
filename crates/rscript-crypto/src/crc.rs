//! CRC32 content hash guarding archive payloads

use binrw::{BinRead, BinWrite};
use std::fmt;

use crate::error::CryptoError;

/// CRC32 (IEEE) of a decrypted archive payload
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[brw(little)]
pub struct ContentHash(u32);

impl ContentHash {
    /// Wrap a raw hash value read from a container header
    pub fn from_u32(value: u32) -> Self {
        Self(value)
    }

    /// Compute the hash of data
    pub fn from_data(data: &[u8]) -> Self {
        Self(crc32fast::hash(data))
    }

    /// Raw hash value
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Check that `data` hashes to this value
    pub fn verify(&self, data: &[u8]) -> Result<(), CryptoError> {
        let actual = crc32fast::hash(data);
        if actual != self.0 {
            return Err(CryptoError::ChecksumMismatch {
                expected: self.0,
                actual,
            });
        }
        Ok(())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use binrw::BinReaderExt;
    use std::io::Cursor;

    #[test]
    fn test_check_value() {
        // Standard CRC-32 check value
        let hash = ContentHash::from_data(b"123456789");
        assert_eq!(hash.as_u32(), 0xCBF4_3926);
        assert_eq!(hash.to_string(), "cbf43926");
    }

    #[test]
    fn test_verify() {
        let hash = ContentHash::from_data(b"payload");
        assert!(hash.verify(b"payload").is_ok());

        let err = hash.verify(b"Payload").unwrap_err();
        assert!(matches!(err, CryptoError::ChecksumMismatch { expected, .. } if expected == hash.as_u32()));
    }

    #[test]
    fn test_reads_little_endian() {
        let mut cursor = Cursor::new([0x26, 0x39, 0xF4, 0xCB]);
        let hash: ContentHash = cursor.read_le().unwrap();
        assert_eq!(hash, ContentHash::from_u32(0xCBF4_3926));
    }
}
