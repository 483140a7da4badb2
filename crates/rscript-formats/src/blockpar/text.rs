//! Text BlockPar encoding.
//!
//! A line-oriented, brace-delimited format:
//!
//! ```text
//! Ship^{                      // '^' sorted child, '~' unsorted, default sorted
//!     Name=Rigel
//!     Weapons~{
//!         Slot=Laser
//!         Slot=Laser
//!     }
//!     Hull=hulls/heavy.txt{   // child loaded from another text file
//!     }
//!     Info=<<<
//!     First line
//!     Second line
//!     >>>
//! }
//! ```
//!
//! Surrounding tabs and spaces are trimmed, `//` starts a comment that is
//! dropped, and an extra `}` at the top level is ignored. Heredoc lines are
//! captured raw up to a line reading `>>>`, with the indentation of their
//! nesting level removed. The writer always emits CRLF line endings and
//! four spaces of indentation per level.
//!
//! A block header of the form `name=path{` loads `path`, relative to the
//! including file, as the block's content. Lines between that header and its
//! `}` are added to the loaded block, after the included entries.

use encoding_rs::{Encoding, WINDOWS_1251};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::blockpar::MAX_DEPTH;
use crate::blockpar::document::{self, Document, Value};
use crate::blockpar::error::{BlockParError, BlockParResult};

const INDENT: usize = 4;
const TRIM: [char; 4] = ['\t', '\n', '\r', ' '];
const BLANK: [char; 2] = ['\t', ' '];

/// Options for reading text documents
#[derive(Debug, Clone)]
pub struct TextOptions {
    /// Character encoding of text files
    pub encoding: &'static Encoding,
    /// Directory that relative include paths are resolved against
    pub base_dir: Option<PathBuf>,
    /// Maximum block nesting, includes counted
    pub max_depth: usize,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            encoding: WINDOWS_1251,
            base_dir: None,
            max_depth: MAX_DEPTH,
        }
    }
}

impl TextOptions {
    /// Options resolving includes relative to `dir`
    #[must_use]
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Options using another text encoding
    #[must_use]
    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Options with another nesting cap
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Text document reader over decoded UTF-8 lines
pub struct TextReader<R> {
    reader: R,
    options: TextOptions,
    line_no: usize,
}

impl<R: BufRead> TextReader<R> {
    /// Create a reader with default options
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, TextOptions::default())
    }

    /// Create a reader with explicit options
    pub fn with_options(reader: R, options: TextOptions) -> Self {
        Self {
            reader,
            options,
            line_no: 0,
        }
    }

    /// Read the whole stream into a sorted root document
    pub fn read_document(&mut self) -> BlockParResult<Document> {
        let mut current = Document::new();
        let mut stack: Vec<(Document, String)> = Vec::new();
        let mut raw = String::new();

        while self.next_line(&mut raw)? {
            let mut line = raw.trim_matches(TRIM);
            if let Some(pos) = line.find("//") {
                line = line[..pos].trim_end_matches(BLANK);
            }

            if let Some(head) = line.strip_suffix('{') {
                let depth = stack.len() + 1;
                if depth >= self.options.max_depth {
                    return Err(BlockParError::NestingTooDeep(self.options.max_depth));
                }

                let mut head = head.trim_end_matches(BLANK);
                let sorted = match head.chars().last() {
                    Some('^') => {
                        head = head[..head.len() - 1].trim_end_matches(BLANK);
                        true
                    }
                    Some('~') => {
                        head = head[..head.len() - 1].trim_end_matches(BLANK);
                        false
                    }
                    _ => true,
                };

                let (name, child) = match head.split_once('=') {
                    Some((name, path)) if !path.trim_start_matches(BLANK).is_empty() => {
                        let mut child = self.load_include(path.trim_start_matches(BLANK), depth)?;
                        child.set_sorted(sorted);
                        (name.trim_end_matches(BLANK), child)
                    }
                    Some((name, _)) => (name.trim_end_matches(BLANK), Document::with_sorted(sorted)),
                    None => (head, Document::with_sorted(sorted)),
                };
                stack.push((std::mem::replace(&mut current, child), name.to_string()));
            } else if line.starts_with('}') {
                if let Some((parent, name)) = stack.pop() {
                    let child = std::mem::replace(&mut current, parent);
                    current.set(name, child);
                }
            } else if let Some((name, value)) = line.split_once('=') {
                let name = name.trim_end_matches(BLANK).to_string();
                let value = value.trim_start_matches(BLANK);
                let value = if value.starts_with("<<<") {
                    self.read_heredoc(stack.len())?
                } else {
                    value.to_string()
                };
                current.set(name, value);
            }
        }

        // blocks left open at end of input are closed implicitly
        while let Some((mut parent, name)) = stack.pop() {
            parent.set(name, current);
            current = parent;
        }

        debug!(
            "Parsed BlockPar text with {} top-level entries",
            current.len()
        );
        Ok(current)
    }

    fn next_line(&mut self, buf: &mut String) -> BlockParResult<bool> {
        buf.clear();
        let read = self.reader.read_line(buf)?;
        if read > 0 {
            self.line_no += 1;
        }
        Ok(read > 0)
    }

    fn read_heredoc(&mut self, level: usize) -> BlockParResult<String> {
        let start = self.line_no;
        let mut lines = Vec::new();
        let mut raw = String::new();
        loop {
            if !self.next_line(&mut raw)? {
                return Err(BlockParError::UnterminatedHeredoc { line: start });
            }
            if raw.trim_matches(TRIM) == ">>>" {
                break;
            }
            lines.push(raw.clone());
        }

        let spacenum = lines
            .iter()
            .find(|line| !line.trim_matches(TRIM).is_empty())
            .map_or(INDENT * level, |line| leading_spaces(line).min(INDENT * level));

        let mut value = String::new();
        for line in &lines {
            value.push_str(&line[leading_spaces(line).min(spacenum)..]);
        }
        if value.ends_with("\r\n") {
            value.truncate(value.len() - 2);
        } else if value.ends_with('\n') {
            value.truncate(value.len() - 1);
        }
        Ok(value)
    }

    fn load_include(&self, path: &str, depth: usize) -> BlockParResult<Document> {
        let resolved = match &self.options.base_dir {
            Some(dir) => dir.join(path),
            None => PathBuf::from(path),
        };
        info!("Including BlockPar text from {}", resolved.display());
        let options = TextOptions {
            encoding: self.options.encoding,
            base_dir: None,
            max_depth: self.options.max_depth - depth,
        };
        read_file_with(&resolved, options)
    }
}

fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Parse a text document held in memory. Includes resolve against the
/// working directory.
pub fn parse(text: &str) -> BlockParResult<Document> {
    parse_with(text, TextOptions::default())
}

/// Parse a text document held in memory with explicit options
pub fn parse_with(text: &str, options: TextOptions) -> BlockParResult<Document> {
    TextReader::with_options(text.as_bytes(), options).read_document()
}

/// Read a text document from a file in the default encoding
pub fn read_file<P: AsRef<Path>>(path: P) -> BlockParResult<Document> {
    read_file_with(path, TextOptions::default())
}

/// Read a text document from a file. Includes resolve against the file's
/// own directory.
pub fn read_file_with<P: AsRef<Path>>(path: P, mut options: TextOptions) -> BlockParResult<Document> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let (text, _, had_errors) = options.encoding.decode(&bytes);
    if had_errors {
        return Err(BlockParError::Encoding(format!(
            "{} is not valid {}",
            path.display(),
            options.encoding.name()
        )));
    }
    options.base_dir = path.parent().map(Path::to_path_buf);
    parse_with(&text, options)
}

/// Render a document as text
///
/// Fails with `UnrepresentableValue` when a multi-line value contains a line
/// reading `>>>`, which would end its heredoc early on re-read.
pub fn format(document: &Document) -> BlockParResult<String> {
    let (out, unrepresentable) = render(document);
    match unrepresentable {
        Some(name) => Err(BlockParError::UnrepresentableValue(name)),
        None => Ok(out),
    }
}

// Renders every entry, reporting the first value that would not read back
pub(crate) fn render(document: &Document) -> (String, Option<String>) {
    let mut out = String::new();
    let mut unrepresentable = None;
    let mut stack: Vec<document::Iter<'_>> = vec![document.iter()];

    loop {
        let depth = stack.len().saturating_sub(1);
        let Some(entries) = stack.last_mut() else {
            break;
        };
        let Some(entry) = entries.next() else {
            stack.pop();
            if !stack.is_empty() {
                push_indent(&mut out, depth - 1);
                out.push_str("}\r\n");
            }
            continue;
        };

        push_indent(&mut out, depth);
        match entry.value() {
            Value::Param(value) if needs_heredoc(value) => {
                if unrepresentable.is_none() && has_terminator_line(value) {
                    unrepresentable = Some(entry.name().to_string());
                }
                out.push_str(entry.name());
                out.push_str("=<<<\r\n");
                for piece in value.split_inclusive('\n') {
                    push_indent(&mut out, depth);
                    out.push_str(piece);
                }
                out.push_str("\r\n");
                push_indent(&mut out, depth);
                out.push_str(">>>\r\n");
            }
            Value::Param(value) => {
                out.push_str(entry.name());
                out.push('=');
                out.push_str(value);
                out.push_str("\r\n");
            }
            Value::Block(child) => {
                out.push_str(entry.name());
                out.push(if child.is_sorted() { '^' } else { '~' });
                out.push_str("{\r\n");
                stack.push(child.iter());
            }
            Value::Undef => out.push_str("\r\n"),
        }
    }
    (out, unrepresentable)
}

fn push_indent(out: &mut String, depth: usize) {
    out.extend(std::iter::repeat_n(' ', INDENT * depth));
}

fn has_terminator_line(value: &str) -> bool {
    value.split('\n').any(|line| line.trim_matches(TRIM) == ">>>")
}

// Values that would not survive a plain `name=value` line
fn needs_heredoc(value: &str) -> bool {
    value.contains(['\r', '\n'])
        || value.contains("//")
        || value.starts_with("<<<")
        || value.ends_with('{')
        || value.trim_matches(BLANK).len() != value.len()
}

/// Text document writer encoding into a byte sink
pub struct TextWriter<W> {
    writer: W,
    encoding: &'static Encoding,
}

impl<W: Write> TextWriter<W> {
    /// Create a writer using the default encoding
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            encoding: WINDOWS_1251,
        }
    }

    /// Select the output encoding
    #[must_use]
    pub fn encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Render and write a document
    pub fn write_document(&mut self, document: &Document) -> BlockParResult<()> {
        let text = format(document)?;
        let (bytes, _, had_errors) = self.encoding.encode(&text);
        if had_errors {
            return Err(BlockParError::Encoding(format!(
                "document contains characters not representable in {}",
                self.encoding.name()
            )));
        }
        self.writer.write_all(&bytes)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Consume the writer, returning the underlying sink
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Write a text document to a file in the given encoding
pub fn write_file<P: AsRef<Path>>(
    path: P,
    document: &Document,
    encoding: &'static Encoding,
) -> BlockParResult<()> {
    let file = std::fs::File::create(path)?;
    TextWriter::new(std::io::BufWriter::new(file))
        .encoding(encoding)
        .write_document(document)
}
