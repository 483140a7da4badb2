//! Cryptographic operations for Space Rangers data archives
//!
//! This crate provides the primitives behind the game's `.dat` containers:
//!
//! - **Encryption**: the rand31pm stream cipher (Park-Miller generator)
//! - **Integrity**: CRC32 content hashes over the decrypted payload
//!
//! # Examples
//!
//! ```
//! use rscript_crypto::{ContentHash, Rand31pmCipher};
//!
//! let payload = b"ZL01....".to_vec();
//! let hash = ContentHash::from_data(&payload);
//!
//! let mut data = payload.clone();
//! Rand31pmCipher::new(1234).apply_keystream(&mut data);
//! Rand31pmCipher::new(1234).apply_keystream(&mut data);
//!
//! assert!(hash.verify(&data).is_ok());
//! ```

#![warn(missing_docs)]

pub mod crc;
pub mod error;
pub mod rand31pm;

pub use crc::ContentHash;
pub use error::CryptoError;
pub use rand31pm::{Rand31pm, Rand31pmCipher};
