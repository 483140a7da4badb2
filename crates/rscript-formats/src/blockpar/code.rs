//! Brace-structured code listings as documents.
//!
//! Every non-blank line becomes a parameter named after its position in the
//! enclosing block (`"0"`, `"1"`, ...) and every `{ ... }` becomes a nested
//! block that takes the next position. All blocks are unsorted so positions
//! iterate in order.

use crate::blockpar::MAX_DEPTH;
use crate::blockpar::document::Document;
use crate::blockpar::error::{BlockParError, BlockParResult};

/// Split a code listing into a document.
///
/// Blocks still open at the end of input are closed there; a `}` with no
/// open block is ignored.
pub fn from_code(code: &str) -> BlockParResult<Document> {
    let mut current = Document::unsorted();
    let mut position = 0usize;
    // parent, name reserved for the open block, parent's next position
    let mut stack: Vec<(Document, String, usize)> = Vec::new();
    let mut rest = code;

    loop {
        let (head, delimiter, tail) = match rest.find(['{', '}']) {
            Some(at) => (&rest[..at], Some(rest.as_bytes()[at]), &rest[at + 1..]),
            None => (rest, None, ""),
        };

        for line in head.lines() {
            let line = line.trim();
            if !line.is_empty() {
                current.set(position.to_string(), line);
                position += 1;
            }
        }

        match delimiter {
            Some(b'{') => {
                if stack.len() + 1 >= MAX_DEPTH {
                    return Err(BlockParError::NestingTooDeep(MAX_DEPTH));
                }
                let parent = std::mem::replace(&mut current, Document::unsorted());
                stack.push((parent, position.to_string(), position + 1));
                position = 0;
            }
            Some(_) => {
                if let Some((parent, name, next)) = stack.pop() {
                    let child = std::mem::replace(&mut current, parent);
                    current.set(name, child);
                    position = next;
                }
            }
            None => break,
        }
        rest = tail;
    }

    while let Some((mut parent, name, _)) = stack.pop() {
        parent.set(name, current);
        current = parent;
    }
    Ok(current)
}
