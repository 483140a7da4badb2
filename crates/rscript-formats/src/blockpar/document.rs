use crate::blockpar::error::{BlockParError, BlockParResult};
use crate::blockpar::list::{self, InsertionList};
use crate::blockpar::tree::{self, OrderedMultiMap};
use std::fmt;

/// Entry kind as stored in the binary format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EntryKind {
    /// Entry without content
    Undef = 0,
    /// String parameter
    Param = 1,
    /// Nested document
    Block = 2,
}

impl EntryKind {
    /// Parse from byte value
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Undef),
            1 => Some(Self::Param),
            2 => Some(Self::Block),
            _ => None,
        }
    }

    /// Byte value used on the wire
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Content of an entry
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    /// No content
    #[default]
    Undef,
    /// String parameter
    Param(String),
    /// Nested document, owned exclusively by the entry
    Block(Document),
}

impl Value {
    /// Kind tag of this value
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::Undef => EntryKind::Undef,
            Self::Param(_) => EntryKind::Param,
            Self::Block(_) => EntryKind::Block,
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Param(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Param(value.to_string())
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Self::Block(value)
    }
}

/// One named element of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    name: String,
    value: Value,
    comment: String,
}

impl Entry {
    /// Create an entry
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            comment: String::new(),
        }
    }

    /// Attach a comment
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Entry name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entry kind, derived from the content
    pub fn kind(&self) -> EntryKind {
        self.value.kind()
    }

    /// Entry content
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Free-form comment
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Parameter string, if this is a parameter
    pub fn as_param(&self) -> Option<&str> {
        match &self.value {
            Value::Param(value) => Some(value),
            _ => None,
        }
    }

    /// Nested document, if this is a block
    pub fn as_block(&self) -> Option<&Document> {
        match &self.value {
            Value::Block(block) => Some(block),
            _ => None,
        }
    }

    /// Take the content out of the entry
    pub fn into_value(self) -> Value {
        self.value
    }
}

/// A BlockPar document: an ordered multi-map of named entries.
///
/// Entries are stored once and indexed twice: an insertion-order list and a
/// red-black tree keyed by name. Both indexes always cover the same entries.
/// The `sorted` flag selects which order [`Document::iter`] and the text
/// writer use; name lookup always goes through the tree.
#[derive(Debug, Clone)]
pub struct Document {
    entries: Vec<Entry>,
    order: InsertionList<usize>,
    index: OrderedMultiMap<usize>,
    sorted: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty sorted document
    pub fn new() -> Self {
        Self::with_sorted(true)
    }

    /// Create an empty document iterated in insertion order
    pub fn unsorted() -> Self {
        Self::with_sorted(false)
    }

    /// Create an empty document with the given ordering flag
    pub fn with_sorted(sorted: bool) -> Self {
        Self {
            entries: Vec::new(),
            order: InsertionList::new(),
            index: OrderedMultiMap::new(),
            sorted,
        }
    }

    /// Whether default iteration is alphabetic
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Change the default iteration order
    pub fn set_sorted(&mut self, sorted: bool) {
        self.sorted = sorted;
    }

    /// Add an entry. Always appends; existing entries with the same name stay.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.push(Entry::new(name, value));
    }

    /// Add a prepared entry
    pub fn push(&mut self, entry: Entry) {
        let slot = self.entries.len();
        self.index.insert(entry.name.clone(), slot);
        self.order.push_back(slot);
        self.entries.push(entry);
    }

    /// All entries named `name`, in insertion order
    pub fn get(&self, name: &str) -> BlockParResult<Vec<&Entry>> {
        let entries: Vec<&Entry> = self.entries_named(name).collect();
        if entries.is_empty() {
            return Err(BlockParError::KeyNotFound(name.to_string()));
        }
        Ok(entries)
    }

    /// Iterate over entries named `name` without failing on absence
    pub fn entries_named<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Entry> + 'a {
        let entries = &self.entries;
        self.index.get(name).map(move |&slot| &entries[slot])
    }

    /// First entry named `name`
    pub fn first(&self, name: &str) -> Option<&Entry> {
        self.index.first(name).map(|&slot| &self.entries[slot])
    }

    /// Number of entries named `name`
    pub fn count(&self, name: &str) -> usize {
        self.index.count(name)
    }

    /// Resolve a dotted path to a parameter value
    pub fn get_param(&self, path: &str) -> BlockParResult<&str> {
        let entry = self.resolve(path)?;
        entry
            .as_param()
            .ok_or_else(|| BlockParError::NotAParameter(path.trim().to_string()))
    }

    /// Resolve a dotted path to a nested block
    pub fn get_block(&self, path: &str) -> BlockParResult<&Document> {
        let entry = self.resolve(path)?;
        entry
            .as_block()
            .ok_or_else(|| BlockParError::NotABlock(path.trim().to_string()))
    }

    /// Walk `a.b.c`: every segment but the last must name a block. When a
    /// name is duplicated the first entry is followed.
    fn resolve(&self, path: &str) -> BlockParResult<&Entry> {
        let path = path.trim();
        let mut segments = path.split('.').peekable();
        let mut current = self;
        let mut consumed = 0;

        while let Some(segment) = segments.next() {
            let end = consumed + segment.len();
            let entry = current
                .first(segment)
                .ok_or_else(|| BlockParError::KeyNotFound(path[..end].to_string()))?;
            consumed = end + 1;
            if segments.peek().is_none() {
                return Ok(entry);
            }
            current = entry.as_block().ok_or_else(|| BlockParError::PathNotFound {
                path: path.to_string(),
                segment: segment.to_string(),
            })?;
        }

        Err(BlockParError::KeyNotFound(path.to_string()))
    }

    /// Check whether any entry is named `name`
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Total number of entries, duplicates included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the document has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removal by name is not part of the document model
    pub fn remove(&mut self, _name: &str) -> BlockParResult<Entry> {
        Err(BlockParError::UnsupportedOperation(
            "removing entries from a BlockPar document",
        ))
    }

    /// Iterate in the order selected by the `sorted` flag
    pub fn iter(&self) -> Iter<'_> {
        if self.sorted {
            self.iter_sorted()
        } else {
            self.iter_insertion()
        }
    }

    /// Iterate in insertion order
    pub fn iter_insertion(&self) -> Iter<'_> {
        Iter {
            cursor: self.insertion_cursor(),
        }
    }

    /// Iterate alphabetically by name; equal names keep insertion order
    pub fn iter_sorted(&self) -> Iter<'_> {
        Iter {
            cursor: self.sorted_cursor(),
        }
    }

    /// Iterate in the default order, reporting each entry's position within
    /// its run of equal names. Runs are only tracked for sorted documents;
    /// unsorted ones report every entry as a run of one.
    pub fn iter_grouped(&self) -> Grouped<'_> {
        let cursor = if self.sorted {
            self.sorted_cursor()
        } else {
            self.insertion_cursor()
        };
        Grouped { cursor }
    }

    /// Iterate in insertion order regardless of the flag, every entry
    /// reported as a run of one
    pub(crate) fn iter_insertion_grouped(&self) -> Grouped<'_> {
        Grouped {
            cursor: self.insertion_cursor(),
        }
    }

    fn insertion_cursor(&self) -> Cursor<'_> {
        Cursor::Insertion {
            entries: &self.entries,
            order: self.order.iter(),
        }
    }

    fn sorted_cursor(&self) -> Cursor<'_> {
        Cursor::Sorted {
            entries: &self.entries,
            groups: self.index.groups(),
            current: None,
        }
    }
}

// Sorted documents compare alphabetically: the text and grouped binary
// forms store them in name order, so their insertion order is not kept there.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.sorted == other.sorted && self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl Eq for Document {}

// Child documents are detached into a work list so dropping a deep tree
// does not recurse once per level.
impl Drop for Document {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        detach_children(&mut self.entries, &mut pending);
        while let Some(mut child) = pending.pop() {
            detach_children(&mut child.entries, &mut pending);
        }
    }
}

fn detach_children(entries: &mut [Entry], pending: &mut Vec<Document>) {
    for entry in entries {
        if let Value::Block(child) = &mut entry.value
            && !child.entries.is_empty()
        {
            pending.push(std::mem::take(child));
        }
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = &'a Entry;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::blockpar::text::render(self).0)
    }
}

/// Position of an entry within its run of equal names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupPosition {
    /// Zero-based index within the run
    pub index: usize,
    /// Size of the run
    pub count: usize,
}

#[derive(Debug)]
enum Cursor<'a> {
    Insertion {
        entries: &'a [Entry],
        order: list::Iter<'a, usize>,
    },
    Sorted {
        entries: &'a [Entry],
        groups: tree::Groups<'a, usize>,
        current: Option<(tree::Values<'a, usize>, usize, usize)>,
    },
}

impl<'a> Cursor<'a> {
    fn advance(&mut self) -> Option<(&'a Entry, GroupPosition)> {
        match self {
            Self::Insertion { entries, order } => {
                let entries: &'a [Entry] = *entries;
                order
                    .next()
                    .map(|&slot| (&entries[slot], GroupPosition { index: 0, count: 1 }))
            }
            Self::Sorted {
                entries,
                groups,
                current,
            } => {
                let entries: &'a [Entry] = *entries;
                loop {
                    if let Some((values, index, count)) = current.as_mut() {
                        if let Some(&slot) = values.next() {
                            let position = GroupPosition {
                                index: *index,
                                count: *count,
                            };
                            *index += 1;
                            return Some((&entries[slot], position));
                        }
                    }
                    let group = groups.next()?;
                    *current = Some((group.values(), 0, group.count()));
                }
            }
        }
    }
}

/// Iterator over document entries
#[derive(Debug)]
pub struct Iter<'a> {
    cursor: Cursor<'a>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.advance().map(|(entry, _)| entry)
    }
}

/// Iterator over document entries with their run positions
#[derive(Debug)]
pub struct Grouped<'a> {
    cursor: Cursor<'a>,
}

impl<'a> Iterator for Grouped<'a> {
    type Item = (&'a Entry, GroupPosition);

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.advance()
    }
}
