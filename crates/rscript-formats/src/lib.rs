//! File format parsers and builders for Space Rangers data files
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_possible_wrap)] // Seed bytes are reinterpreted as signed
#![allow(clippy::doc_markdown)] // Game-specific terms don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::return_self_not_must_use)] // Builder patterns
//! The crate currently covers BlockPar, the nested key/value document format
//! the game uses for its configuration, string tables and script dumps,
//! together with its binary, text and encrypted `.dat` container encodings.
//!
//! # Design Principles
//!
//! - **Symmetric Operations**: every format can be parsed and built
//! - **Iterative Walks**: nesting depth never turns into call-stack depth
//! - **Fail Closed**: a document is returned only after the whole input decoded
//! - **Round-Trip Guarantee**: parse(build(doc)) == doc

#![warn(missing_docs)]

pub mod blockpar;
