//! BlockPar document format support
//!
//! BlockPar is the nested key/value document format behind Space Rangers
//! data files. A document is an ordered multi-map: names may repeat, and
//! every document can be walked either in insertion order or alphabetically
//! with equal names kept in insertion order. Values are strings or nested
//! documents.
//!
//! # Formats
//!
//! - **Binary** ([`binary`]): length-prefixed UTF-16 encoding, with an
//!   optional grouped layout that records runs of equal names
//! - **Text** ([`text`]): brace-delimited dump format with heredoc values
//!   and file includes
//! - **Archive** ([`archive`]): `.dat` container wrapping the grouped binary
//!   form in zlib, a CRC32 check and a stream cipher
//! - **Code** ([`code`]): splits brace-structured listings into documents
//!
//! # Example
//!
//! ```
//! use rscript_formats::blockpar::{BinaryLayout, Document, binary, text};
//!
//! let mut weapons = Document::unsorted();
//! weapons.set("Slot", "Laser");
//! weapons.set("Slot", "Missile");
//!
//! let mut ship = Document::new();
//! ship.set("Name", "Rigel");
//! ship.set("Weapons", weapons);
//!
//! assert_eq!(ship.get_param("Name").expect("Test operation should succeed"), "Rigel");
//! assert_eq!(ship.get_block("Weapons").expect("Test operation should succeed").count("Slot"), 2);
//!
//! let bytes = binary::build(&ship, BinaryLayout::Plain).expect("Test operation should succeed");
//! assert_eq!(binary::parse(&bytes, BinaryLayout::Plain).expect("Test operation should succeed"), ship);
//!
//! let dump = text::format(&ship).expect("Test operation should succeed");
//! assert!(dump.starts_with("Name=Rigel\r\nWeapons~{\r\n"));
//! assert_eq!(text::parse(&dump).expect("Test operation should succeed"), ship);
//! ```

pub mod archive;
pub mod binary;
pub mod code;
pub mod compression;
mod document;
mod error;
pub mod list;
pub mod text;
pub mod tree;

/// Default nesting cap for every codec
pub const MAX_DEPTH: usize = 1024;

pub use binary::{BinaryLayout, BinaryReader, BinaryWriter};
pub use code::from_code;
pub use document::{Document, Entry, EntryKind, GroupPosition, Grouped, Iter, Value};
pub use error::{BlockParError, BlockParResult};
pub use list::InsertionList;
pub use text::{TextOptions, TextReader, TextWriter};
pub use tree::OrderedMultiMap;
