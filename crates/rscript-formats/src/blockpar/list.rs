//! Singly-linked list preserving insertion order.
//!
//! Nodes live in an arena and link by index. The list only grows: documents
//! never remove entries.

#[derive(Debug, Clone)]
struct ListNode<T> {
    value: T,
    next: Option<usize>,
}

/// Append-ordered list with O(1) push
#[derive(Debug, Clone)]
pub struct InsertionList<T> {
    nodes: Vec<ListNode<T>>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<T> Default for InsertionList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> InsertionList<T> {
    /// Create an empty list
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            head: None,
            tail: None,
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the list is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a value at the end
    pub fn push_back(&mut self, value: T) {
        let id = self.nodes.len();
        self.nodes.push(ListNode { value, next: None });

        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }
}

/// Iterator over an [`InsertionList`]
#[derive(Debug)]
pub struct Iter<'a, T> {
    list: &'a InsertionList<T>,
    cursor: Option<usize>,
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            list: self.list,
            cursor: self.cursor,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let node = &self.list.nodes[id];
        self.cursor = node.next;
        Some(&node.value)
    }
}

impl<'a, T> IntoIterator for &'a InsertionList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_push_preserves_order() {
        let mut list = InsertionList::new();
        for value in ["b", "a", "a", "c"] {
            list.push_back(value);
        }
        assert_eq!(list.len(), 4);
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec!["b", "a", "a", "c"]);
    }

    #[test]
    fn test_empty_list() {
        let list: InsertionList<u8> = InsertionList::default();
        assert!(list.is_empty());
        assert_eq!(list.iter().next(), None);
    }

    #[test]
    fn test_iterator_clone_resumes() {
        let mut list = InsertionList::new();
        for value in 1..=3 {
            list.push_back(value);
        }
        let mut iter = list.iter();
        iter.next();
        let rest: Vec<_> = iter.clone().copied().collect();
        assert_eq!(rest, vec![2, 3]);
        assert_eq!(iter.count(), 2);
    }
}
