//! Binary BlockPar encoding.
//!
//! ```text
//! Document := u8 sorted, u32 entry_count, Entry * entry_count
//! Entry    := [u32 group_index, u32 group_count]   (grouped layout, sorted parents only)
//!             u8 kind (1 = param, 2 = block), WideStr name,
//!             WideStr value | Document
//! WideStr  := UTF-16LE code units, terminated by 0x0000
//! ```
//!
//! All integers are little-endian. `group_count` is only written on the first
//! entry of a run of equal names and is zero elsewhere. Both directions walk
//! the tree with an explicit stack so hostile nesting cannot exhaust the call
//! stack.

use binrw::io::{Read, Seek, Write};
use binrw::{BinRead, BinWrite};
use std::io::{BufReader, BufWriter, Cursor};
use std::path::Path;
use tracing::debug;

use crate::blockpar::MAX_DEPTH;
use crate::blockpar::document::{Document, EntryKind, Grouped, Value};
use crate::blockpar::error::{BlockParError, BlockParResult};

/// Entry framing variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinaryLayout {
    /// Entries carry no run header
    #[default]
    Plain,
    /// Entries of sorted documents are prefixed with their run position
    /// and run length. This is the layout found inside `.dat` archives.
    Grouped,
}

/// Binary document reader
pub struct BinaryReader<R> {
    reader: R,
    layout: BinaryLayout,
    max_depth: usize,
}

impl<R: Read + Seek> BinaryReader<R> {
    /// Create a reader over a seekable source
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            layout: BinaryLayout::default(),
            max_depth: MAX_DEPTH,
        }
    }

    /// Select the entry framing
    #[must_use]
    pub fn layout(mut self, layout: BinaryLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Override the nesting limit
    #[must_use]
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Read one document starting at the current position
    pub fn read_document(&mut self) -> BlockParResult<Document> {
        struct Frame {
            document: Document,
            remaining: u32,
            name: String,
        }

        let sorted = self.read_bool("document header")?;
        let count = self.read_u32("document header")?;
        let mut current = Frame {
            document: Document::with_sorted(sorted),
            remaining: count,
            name: String::new(),
        };
        let mut stack: Vec<Frame> = Vec::new();

        loop {
            if current.remaining == 0 {
                let Some(mut parent) = stack.pop() else {
                    break;
                };
                parent.document.set(current.name, current.document);
                parent.remaining -= 1;
                current = parent;
                continue;
            }

            if self.layout == BinaryLayout::Grouped && current.document.is_sorted() {
                // run position and length; the arena needs no pre-sizing
                self.read_u32("group header")?;
                self.read_u32("group header")?;
            }

            let kind = self.read_u8("entry kind")?;
            let name = self.read_wide_string()?;
            match EntryKind::from_byte(kind) {
                Some(EntryKind::Param) => {
                    let value = self.read_wide_string()?;
                    current.document.set(name, value);
                    current.remaining -= 1;
                }
                Some(EntryKind::Block) => {
                    if stack.len() + 1 >= self.max_depth {
                        return Err(BlockParError::NestingTooDeep(self.max_depth));
                    }
                    let sorted = self.read_bool("block header")?;
                    let count = self.read_u32("block header")?;
                    let child = Frame {
                        document: Document::with_sorted(sorted),
                        remaining: count,
                        name,
                    };
                    stack.push(std::mem::replace(&mut current, child));
                }
                _ => return Err(BlockParError::InvalidEntryKind(kind)),
            }
        }

        debug!(
            "Decoded BlockPar document with {} top-level entries",
            current.document.len()
        );
        Ok(current.document)
    }

    /// Consume the reader, returning the underlying source
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn read_u8(&mut self, context: &'static str) -> BlockParResult<u8> {
        u8::read_le(&mut self.reader).map_err(|e| map_eof(e, context))
    }

    fn read_bool(&mut self, context: &'static str) -> BlockParResult<bool> {
        Ok(self.read_u8(context)? == 1)
    }

    fn read_u32(&mut self, context: &'static str) -> BlockParResult<u32> {
        u32::read_le(&mut self.reader).map_err(|e| map_eof(e, context))
    }

    fn read_wide_string(&mut self) -> BlockParResult<String> {
        let start = self.reader.stream_position()?;
        let mut units = Vec::new();
        loop {
            let unit = u16::read_le(&mut self.reader).map_err(|e| map_eof(e, "wide string"))?;
            if unit == 0 {
                break;
            }
            units.push(unit);
        }
        String::from_utf16(&units).map_err(|_| BlockParError::InvalidWideString(start))
    }
}

impl BinaryReader<BufReader<std::fs::File>> {
    /// Create a reader from a file path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let file = std::fs::File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

fn map_eof(err: binrw::Error, context: &'static str) -> BlockParError {
    match err {
        binrw::Error::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            BlockParError::UnexpectedEof(context)
        }
        other => BlockParError::BinRw(other),
    }
}

/// Binary document writer
pub struct BinaryWriter<W> {
    writer: W,
    layout: BinaryLayout,
    max_depth: usize,
}

impl<W: Write + Seek> BinaryWriter<W> {
    /// Create a writer over a seekable sink
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            layout: BinaryLayout::default(),
            max_depth: MAX_DEPTH,
        }
    }

    /// Select the entry framing
    #[must_use]
    pub fn layout(mut self, layout: BinaryLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Override the nesting limit
    #[must_use]
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Write a complete document
    pub fn write_document(&mut self, document: &Document) -> BlockParResult<()> {
        struct Frame<'a> {
            entries: Grouped<'a>,
            sorted: bool,
        }

        self.write_header(document)?;
        let mut stack = vec![Frame {
            entries: self.entries(document),
            sorted: document.is_sorted(),
        }];

        while let Some(frame) = stack.last_mut() {
            let Some((entry, position)) = frame.entries.next() else {
                stack.pop();
                continue;
            };

            if self.layout == BinaryLayout::Grouped && frame.sorted {
                let count = if position.index == 0 { position.count } else { 0 };
                (position.index as u32).write_le(&mut self.writer)?;
                (count as u32).write_le(&mut self.writer)?;
            }

            match entry.value() {
                Value::Param(value) => {
                    EntryKind::Param.as_byte().write_le(&mut self.writer)?;
                    self.write_wide_string(entry.name())?;
                    self.write_wide_string(value)?;
                }
                Value::Block(child) => {
                    if stack.len() >= self.max_depth {
                        return Err(BlockParError::NestingTooDeep(self.max_depth));
                    }
                    EntryKind::Block.as_byte().write_le(&mut self.writer)?;
                    self.write_wide_string(entry.name())?;
                    self.write_header(child)?;
                    let entries = self.entries(child);
                    stack.push(Frame {
                        entries,
                        sorted: child.is_sorted(),
                    });
                }
                Value::Undef => {
                    return Err(BlockParError::UndefinedEntry(entry.name().to_string()));
                }
            }
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Consume the writer, returning the underlying sink
    pub fn into_inner(self) -> W {
        self.writer
    }

    // Grouped payloads need each sorted block's name runs together. The
    // plain layout keeps insertion order; the reader rebuilds the name index.
    fn entries<'a>(&self, document: &'a Document) -> Grouped<'a> {
        match self.layout {
            BinaryLayout::Plain => document.iter_insertion_grouped(),
            BinaryLayout::Grouped => document.iter_grouped(),
        }
    }

    fn write_header(&mut self, document: &Document) -> BlockParResult<()> {
        u8::from(document.is_sorted()).write_le(&mut self.writer)?;
        (document.len() as u32).write_le(&mut self.writer)?;
        Ok(())
    }

    fn write_wide_string(&mut self, value: &str) -> BlockParResult<()> {
        let mut bytes = Vec::with_capacity(value.len() * 2 + 2);
        for unit in value.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes.extend_from_slice(&[0, 0]);
        self.writer.write_all(&bytes)?;
        Ok(())
    }
}

/// Decode a document from bytes
pub fn parse(data: &[u8], layout: BinaryLayout) -> BlockParResult<Document> {
    BinaryReader::new(Cursor::new(data))
        .layout(layout)
        .read_document()
}

/// Encode a document to bytes
pub fn build(document: &Document, layout: BinaryLayout) -> BlockParResult<Vec<u8>> {
    let mut writer = BinaryWriter::new(Cursor::new(Vec::new())).layout(layout);
    writer.write_document(document)?;
    Ok(writer.into_inner().into_inner())
}

/// Read a binary document from a file
pub fn read_file<P: AsRef<Path>>(path: P, layout: BinaryLayout) -> BlockParResult<Document> {
    BinaryReader::from_path(path)?.layout(layout).read_document()
}

/// Write a binary document to a file
pub fn write_file<P: AsRef<Path>>(
    path: P,
    document: &Document,
    layout: BinaryLayout,
) -> BlockParResult<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = BinaryWriter::new(BufWriter::new(file)).layout(layout);
    writer.write_document(document)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn wide(s: &str) -> Vec<u8> {
        let mut out: Vec<u8> = s.encode_utf16().flat_map(u16::to_le_bytes).collect();
        out.extend_from_slice(&[0, 0]);
        out
    }

    #[test]
    fn test_plain_wire_layout() {
        let mut doc = Document::unsorted();
        doc.set("k", "v");

        let bytes = build(&doc, BinaryLayout::Plain).unwrap();

        let mut expected = vec![0u8, 1, 0, 0, 0, 1];
        expected.extend(wide("k"));
        expected.extend(wide("v"));
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_grouped_wire_layout() {
        let mut doc = Document::new();
        doc.set("a", "1");
        doc.set("a", "2");

        let bytes = build(&doc, BinaryLayout::Grouped).unwrap();

        let mut expected = vec![1u8, 2, 0, 0, 0];
        expected.extend([0, 0, 0, 0, 2, 0, 0, 0, 1]);
        expected.extend(wide("a"));
        expected.extend(wide("1"));
        expected.extend([1, 0, 0, 0, 0, 0, 0, 0, 1]);
        expected.extend(wide("a"));
        expected.extend(wide("2"));
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_grouped_layout_skips_unsorted_children() {
        let mut child = Document::unsorted();
        child.set("x", "1");
        let mut doc = Document::new();
        doc.set("child", child);

        let bytes = build(&doc, BinaryLayout::Grouped).unwrap();
        let parsed = parse(&bytes, BinaryLayout::Grouped).unwrap();
        assert_eq!(parsed, doc);

        // root entry carries 8 header bytes, the unsorted child's entry none
        let plain = build(&doc, BinaryLayout::Plain).unwrap();
        assert_eq!(bytes.len(), plain.len() + 8);
    }

    #[test]
    fn test_nested_round_trip_preserves_flags() {
        let mut inner = Document::unsorted();
        inner.set("z", "last");
        inner.set("a", "first");
        let mut doc = Document::new();
        doc.set("b", "2");
        doc.set("block", inner);
        doc.set("a", "1");

        for layout in [BinaryLayout::Plain, BinaryLayout::Grouped] {
            let bytes = build(&doc, layout).unwrap();
            let parsed = parse(&bytes, layout).unwrap();
            assert_eq!(parsed, doc);
            assert!(!parsed.get_block("block").unwrap().is_sorted());
        }
    }

    #[test]
    fn test_plain_layout_keeps_insertion_order() {
        let mut doc = Document::new();
        doc.set("b", "2");
        doc.set("a", "1");
        doc.set("a", "1b");

        let parsed = parse(&build(&doc, BinaryLayout::Plain).unwrap(), BinaryLayout::Plain).unwrap();

        let names = |d: &Document| d.iter_insertion().map(|e| e.name().to_string()).collect::<Vec<_>>();
        assert_eq!(names(&parsed), vec!["b", "a", "a"]);
        assert_eq!(names(&parsed), names(&doc));
        let sorted: Vec<_> = parsed.iter_sorted().map(|e| e.as_param().unwrap()).collect();
        assert_eq!(sorted, vec!["1", "1b", "2"]);
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_invalid_entry_kind() {
        let mut data = vec![0u8, 1, 0, 0, 0, 7];
        data.extend(wide("k"));
        assert!(matches!(
            parse(&data, BinaryLayout::Plain),
            Err(BlockParError::InvalidEntryKind(7))
        ));
    }

    #[test]
    fn test_truncated_input() {
        let mut doc = Document::new();
        doc.set("name", "value");
        let bytes = build(&doc, BinaryLayout::Plain).unwrap();

        let err = parse(&bytes[..bytes.len() - 3], BinaryLayout::Plain).unwrap_err();
        assert!(matches!(err, BlockParError::UnexpectedEof(_)), "{err:?}");
    }

    #[test]
    fn test_invalid_utf16() {
        let mut data = vec![0u8, 1, 0, 0, 0, 1];
        data.extend([0x00, 0xD8, 0, 0]); // lone high surrogate
        data.extend(wide("v"));
        assert!(matches!(
            parse(&data, BinaryLayout::Plain),
            Err(BlockParError::InvalidWideString(6))
        ));
    }

    #[test]
    fn test_undefined_entry_rejected() {
        let mut doc = Document::new();
        doc.set("hole", Value::Undef);
        assert!(matches!(
            build(&doc, BinaryLayout::Plain),
            Err(BlockParError::UndefinedEntry(ref name)) if name == "hole"
        ));
    }

    #[test]
    fn test_deep_nesting_is_iterative() {
        let depth = 5000;
        let mut data = Vec::new();
        for _ in 0..depth {
            data.extend([0u8, 1, 0, 0, 0, 2]);
            data.extend(wide("n"));
        }
        data.extend([0u8, 0, 0, 0, 0]);

        let err = parse(&data, BinaryLayout::Plain).unwrap_err();
        assert!(matches!(err, BlockParError::NestingTooDeep(MAX_DEPTH)));

        let doc = BinaryReader::new(Cursor::new(&data))
            .max_depth(depth + 10)
            .read_document()
            .unwrap();
        assert_eq!(doc.len(), 1);

        let mut writer = BinaryWriter::new(Cursor::new(Vec::new())).max_depth(depth + 10);
        writer.write_document(&doc).unwrap();
        assert_eq!(writer.into_inner().into_inner(), data);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.bin");

        let mut doc = Document::new();
        doc.set("key", "значение");
        write_file(&path, &doc, BinaryLayout::Plain).unwrap();

        let loaded = read_file(&path, BinaryLayout::Plain).unwrap();
        assert_eq!(loaded, doc);
    }
}
