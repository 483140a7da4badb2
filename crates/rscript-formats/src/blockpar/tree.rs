//! Red-black tree keyed by string with ordered duplicate chains.
//!
//! Every distinct key owns one tree node. Values sharing a key hang off that
//! node as a singly-linked chain in insertion order, so inserting a
//! duplicate never changes the tree shape. Nodes and chain links live in
//! two arenas and refer to each other by index; freed slots are recycled.

use std::cmp::Ordering;

type NodeId = usize;
type LinkId = usize;

/// Node color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    /// Red node
    Red,
    /// Black node
    Black,
}

#[derive(Debug, Clone)]
struct TreeNode {
    key: String,
    color: Color,
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    head: LinkId,
    tail: LinkId,
    count: usize,
}

#[derive(Debug, Clone)]
struct Link<V> {
    value: Option<V>,
    next: Option<LinkId>,
}

/// Sorted multi-map with stable insertion order among equal keys
#[derive(Debug, Clone)]
pub struct OrderedMultiMap<V> {
    nodes: Vec<TreeNode>,
    links: Vec<Link<V>>,
    free_nodes: Vec<NodeId>,
    free_links: Vec<LinkId>,
    root: Option<NodeId>,
    len: usize,
}

impl<V> Default for OrderedMultiMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> OrderedMultiMap<V> {
    /// Create an empty map
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
            free_nodes: Vec::new(),
            free_links: Vec::new(),
            root: None,
            len: 0,
        }
    }

    /// Total number of values, duplicates included
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the map holds no values
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of distinct keys
    pub fn key_count(&self) -> usize {
        self.nodes.len() - self.free_nodes.len()
    }

    /// Insert a value.
    ///
    /// An existing key gets the value appended to the end of its chain;
    /// otherwise a red node is attached and the tree is rebalanced.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        let link = self.alloc_link(value);
        self.len += 1;

        let mut parent = None;
        let mut cursor = self.root;
        let mut went_left = false;
        while let Some(id) = cursor {
            match key.as_str().cmp(self.nodes[id].key.as_str()) {
                Ordering::Less => {
                    parent = Some(id);
                    went_left = true;
                    cursor = self.nodes[id].left;
                }
                Ordering::Greater => {
                    parent = Some(id);
                    went_left = false;
                    cursor = self.nodes[id].right;
                }
                Ordering::Equal => {
                    let tail = self.nodes[id].tail;
                    self.links[tail].next = Some(link);
                    self.nodes[id].tail = link;
                    self.nodes[id].count += 1;
                    return;
                }
            }
        }

        let node = self.alloc_node(key, link, parent);
        match parent {
            None => self.root = Some(node),
            Some(p) if went_left => self.nodes[p].left = Some(node),
            Some(p) => self.nodes[p].right = Some(node),
        }
        self.insert_fixup(node);
    }

    /// Look up the group of values stored under `key`
    pub fn find(&self, key: &str) -> Option<Group<'_, V>> {
        self.find_node(key).map(|id| self.group(id))
    }

    /// Iterate over the values stored under `key` in insertion order
    pub fn get(&self, key: &str) -> Values<'_, V> {
        match self.find_node(key) {
            Some(id) => self.group(id).values,
            None => Values {
                map: self,
                cursor: None,
            },
        }
    }

    /// First value stored under `key`
    pub fn first(&self, key: &str) -> Option<&V> {
        self.get(key).next()
    }

    /// Check whether `key` is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.find_node(key).is_some()
    }

    /// Number of values stored under `key`
    pub fn count(&self, key: &str) -> usize {
        self.find_node(key).map_or(0, |id| self.nodes[id].count)
    }

    /// Smallest key in the map
    pub fn first_key(&self) -> Option<&str> {
        self.root
            .map(|root| self.nodes[self.minimum(root)].key.as_str())
    }

    /// Largest key in the map
    pub fn last_key(&self) -> Option<&str> {
        let mut id = self.root?;
        while let Some(right) = self.nodes[id].right {
            id = right;
        }
        Some(self.nodes[id].key.as_str())
    }

    /// Remove the value at `index` within the chain of `key`.
    ///
    /// Removing the only value of a key deletes its tree node. Absent keys
    /// and out-of-range indexes are a no-op.
    pub fn remove(&mut self, key: &str, index: usize) -> Option<V> {
        let id = self.find_node(key)?;
        if index >= self.nodes[id].count {
            return None;
        }

        if self.nodes[id].count == 1 {
            let head = self.nodes[id].head;
            let value = self.free_link(head);
            self.delete_node(id);
            self.len -= 1;
            return value;
        }

        let mut prev = None;
        let mut cursor = self.nodes[id].head;
        for _ in 0..index {
            prev = Some(cursor);
            cursor = self.links[cursor].next?;
        }

        let next = self.links[cursor].next;
        match prev {
            None => self.nodes[id].head = next?,
            Some(prev) => {
                self.links[prev].next = next;
                if next.is_none() {
                    self.nodes[id].tail = prev;
                }
            }
        }
        self.nodes[id].count -= 1;
        self.len -= 1;
        self.free_link(cursor)
    }

    /// Remove every value stored under `key`, returning them in insertion order
    pub fn remove_all(&mut self, key: &str) -> Vec<V> {
        let Some(id) = self.find_node(key) else {
            return Vec::new();
        };

        let mut removed = Vec::with_capacity(self.nodes[id].count);
        let mut cursor = Some(self.nodes[id].head);
        while let Some(link) = cursor {
            cursor = self.links[link].next;
            if let Some(value) = self.free_link(link) {
                removed.push(value);
            }
        }
        self.len -= self.nodes[id].count;
        self.delete_node(id);
        removed
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.links.clear();
        self.free_nodes.clear();
        self.free_links.clear();
        self.root = None;
        self.len = 0;
    }

    /// In-order traversal: keys ascending, each chain flushed in insertion order
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            groups: self.groups(),
            current: None,
        }
    }

    /// In-order traversal of key groups
    pub fn groups(&self) -> Groups<'_, V> {
        Groups {
            map: self,
            stack: Vec::new(),
            cursor: self.root,
            order: TraversalOrder::InOrder,
            last: None,
        }
    }

    /// Preorder traversal of key groups (node, left subtree, right subtree)
    pub fn preorder(&self) -> Groups<'_, V> {
        Groups {
            map: self,
            stack: self.root.into_iter().collect(),
            cursor: None,
            order: TraversalOrder::PreOrder,
            last: None,
        }
    }

    /// Postorder traversal of key groups (left subtree, right subtree, node)
    pub fn postorder(&self) -> Groups<'_, V> {
        Groups {
            map: self,
            stack: Vec::new(),
            cursor: self.root,
            order: TraversalOrder::PostOrder,
            last: None,
        }
    }

    fn group(&self, id: NodeId) -> Group<'_, V> {
        let node = &self.nodes[id];
        Group {
            key: node.key.as_str(),
            count: node.count,
            values: Values {
                map: self,
                cursor: Some(node.head),
            },
        }
    }

    fn find_node(&self, key: &str) -> Option<NodeId> {
        let mut cursor = self.root;
        while let Some(id) = cursor {
            cursor = match key.cmp(self.nodes[id].key.as_str()) {
                Ordering::Less => self.nodes[id].left,
                Ordering::Greater => self.nodes[id].right,
                Ordering::Equal => return Some(id),
            };
        }
        None
    }

    fn alloc_link(&mut self, value: V) -> LinkId {
        let link = Link {
            value: Some(value),
            next: None,
        };
        if let Some(id) = self.free_links.pop() {
            self.links[id] = link;
            id
        } else {
            self.links.push(link);
            self.links.len() - 1
        }
    }

    fn free_link(&mut self, id: LinkId) -> Option<V> {
        self.links[id].next = None;
        self.free_links.push(id);
        self.links[id].value.take()
    }

    fn alloc_node(&mut self, key: String, link: LinkId, parent: Option<NodeId>) -> NodeId {
        let node = TreeNode {
            key,
            color: Color::Red,
            parent,
            left: None,
            right: None,
            head: link,
            tail: link,
            count: 1,
        };
        if let Some(id) = self.free_nodes.pop() {
            self.nodes[id] = node;
            id
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    fn color(&self, id: Option<NodeId>) -> Color {
        id.map_or(Color::Black, |id| self.nodes[id].color)
    }

    fn set_color(&mut self, id: Option<NodeId>, color: Color) {
        if let Some(id) = id {
            self.nodes[id].color = color;
        }
    }

    fn minimum(&self, mut id: NodeId) -> NodeId {
        while let Some(left) = self.nodes[id].left {
            id = left;
        }
        id
    }

    fn rotate_left(&mut self, x: NodeId) {
        let Some(y) = self.nodes[x].right else {
            return;
        };
        let y_left = self.nodes[y].left;
        self.nodes[x].right = y_left;
        if let Some(child) = y_left {
            self.nodes[child].parent = Some(x);
        }
        let parent = self.nodes[x].parent;
        self.nodes[y].parent = parent;
        match parent {
            None => self.root = Some(y),
            Some(p) if self.nodes[p].left == Some(x) => self.nodes[p].left = Some(y),
            Some(p) => self.nodes[p].right = Some(y),
        }
        self.nodes[y].left = Some(x);
        self.nodes[x].parent = Some(y);
    }

    fn rotate_right(&mut self, x: NodeId) {
        let Some(y) = self.nodes[x].left else {
            return;
        };
        let y_right = self.nodes[y].right;
        self.nodes[x].left = y_right;
        if let Some(child) = y_right {
            self.nodes[child].parent = Some(x);
        }
        let parent = self.nodes[x].parent;
        self.nodes[y].parent = parent;
        match parent {
            None => self.root = Some(y),
            Some(p) if self.nodes[p].right == Some(x) => self.nodes[p].right = Some(y),
            Some(p) => self.nodes[p].left = Some(y),
        }
        self.nodes[y].right = Some(x);
        self.nodes[x].parent = Some(y);
    }

    fn insert_fixup(&mut self, mut z: NodeId) {
        while let Some(parent) = self.nodes[z].parent {
            if self.nodes[parent].color == Color::Black {
                break;
            }
            // A red parent is never the root, so the grandparent exists
            let Some(grandparent) = self.nodes[parent].parent else {
                break;
            };

            if self.nodes[grandparent].left == Some(parent) {
                let uncle = self.nodes[grandparent].right;
                if self.color(uncle) == Color::Red {
                    self.nodes[parent].color = Color::Black;
                    self.set_color(uncle, Color::Black);
                    self.nodes[grandparent].color = Color::Red;
                    z = grandparent;
                } else {
                    if self.nodes[parent].right == Some(z) {
                        z = parent;
                        self.rotate_left(z);
                    }
                    let parent = self.nodes[z].parent;
                    self.set_color(parent, Color::Black);
                    self.nodes[grandparent].color = Color::Red;
                    self.rotate_right(grandparent);
                }
            } else {
                let uncle = self.nodes[grandparent].left;
                if self.color(uncle) == Color::Red {
                    self.nodes[parent].color = Color::Black;
                    self.set_color(uncle, Color::Black);
                    self.nodes[grandparent].color = Color::Red;
                    z = grandparent;
                } else {
                    if self.nodes[parent].left == Some(z) {
                        z = parent;
                        self.rotate_right(z);
                    }
                    let parent = self.nodes[z].parent;
                    self.set_color(parent, Color::Black);
                    self.nodes[grandparent].color = Color::Red;
                    self.rotate_left(grandparent);
                }
            }
        }
        self.set_color(self.root, Color::Black);
    }

    /// Replace the subtree rooted at `u` with the one rooted at `v`
    fn transplant(&mut self, u: NodeId, v: Option<NodeId>) {
        let parent = self.nodes[u].parent;
        match parent {
            None => self.root = v,
            Some(p) if self.nodes[p].left == Some(u) => self.nodes[p].left = v,
            Some(p) => self.nodes[p].right = v,
        }
        if let Some(v) = v {
            self.nodes[v].parent = parent;
        }
    }

    /// Unlink tree node `z` and recycle its slot. Chain links must already
    /// be released by the caller.
    fn delete_node(&mut self, z: NodeId) {
        let removed_color;
        let x;
        let x_parent;

        match (self.nodes[z].left, self.nodes[z].right) {
            (None, right) => {
                removed_color = self.nodes[z].color;
                x = right;
                x_parent = self.nodes[z].parent;
                self.transplant(z, right);
            }
            (left, None) => {
                removed_color = self.nodes[z].color;
                x = left;
                x_parent = self.nodes[z].parent;
                self.transplant(z, left);
            }
            (Some(left), Some(right)) => {
                let y = self.minimum(right);
                removed_color = self.nodes[y].color;
                x = self.nodes[y].right;
                if self.nodes[y].parent == Some(z) {
                    x_parent = Some(y);
                } else {
                    x_parent = self.nodes[y].parent;
                    self.transplant(y, x);
                    self.nodes[y].right = Some(right);
                    self.nodes[right].parent = Some(y);
                }
                self.transplant(z, Some(y));
                self.nodes[y].left = Some(left);
                self.nodes[left].parent = Some(y);
                self.nodes[y].color = self.nodes[z].color;
            }
        }

        if removed_color == Color::Black {
            self.delete_fixup(x, x_parent);
        }

        let node = &mut self.nodes[z];
        node.key.clear();
        node.parent = None;
        node.left = None;
        node.right = None;
        node.count = 0;
        self.free_nodes.push(z);
    }

    fn delete_fixup(&mut self, mut x: Option<NodeId>, mut parent: Option<NodeId>) {
        while x != self.root && self.color(x) == Color::Black {
            let Some(p) = parent else {
                break;
            };

            if self.nodes[p].left == x {
                let Some(mut w) = self.nodes[p].right else {
                    break;
                };
                if self.nodes[w].color == Color::Red {
                    self.nodes[w].color = Color::Black;
                    self.nodes[p].color = Color::Red;
                    self.rotate_left(p);
                    let Some(sibling) = self.nodes[p].right else {
                        break;
                    };
                    w = sibling;
                }
                if self.color(self.nodes[w].left) == Color::Black
                    && self.color(self.nodes[w].right) == Color::Black
                {
                    self.nodes[w].color = Color::Red;
                    x = Some(p);
                    parent = self.nodes[p].parent;
                } else {
                    if self.color(self.nodes[w].right) == Color::Black {
                        self.set_color(self.nodes[w].left, Color::Black);
                        self.nodes[w].color = Color::Red;
                        self.rotate_right(w);
                        let Some(sibling) = self.nodes[p].right else {
                            break;
                        };
                        w = sibling;
                    }
                    self.nodes[w].color = self.nodes[p].color;
                    self.nodes[p].color = Color::Black;
                    self.set_color(self.nodes[w].right, Color::Black);
                    self.rotate_left(p);
                    x = self.root;
                    parent = None;
                }
            } else {
                let Some(mut w) = self.nodes[p].left else {
                    break;
                };
                if self.nodes[w].color == Color::Red {
                    self.nodes[w].color = Color::Black;
                    self.nodes[p].color = Color::Red;
                    self.rotate_right(p);
                    let Some(sibling) = self.nodes[p].left else {
                        break;
                    };
                    w = sibling;
                }
                if self.color(self.nodes[w].left) == Color::Black
                    && self.color(self.nodes[w].right) == Color::Black
                {
                    self.nodes[w].color = Color::Red;
                    x = Some(p);
                    parent = self.nodes[p].parent;
                } else {
                    if self.color(self.nodes[w].left) == Color::Black {
                        self.set_color(self.nodes[w].right, Color::Black);
                        self.nodes[w].color = Color::Red;
                        self.rotate_left(w);
                        let Some(sibling) = self.nodes[p].left else {
                            break;
                        };
                        w = sibling;
                    }
                    self.nodes[w].color = self.nodes[p].color;
                    self.nodes[p].color = Color::Black;
                    self.set_color(self.nodes[w].left, Color::Black);
                    self.rotate_right(p);
                    x = self.root;
                    parent = None;
                }
            }
        }
        self.set_color(x, Color::Black);
    }
}

/// All values sharing one key
#[derive(Debug, Clone)]
pub struct Group<'a, V> {
    key: &'a str,
    count: usize,
    values: Values<'a, V>,
}

impl<'a, V> Group<'a, V> {
    /// The shared key
    pub fn key(&self) -> &'a str {
        self.key
    }

    /// Number of values in the chain
    pub fn count(&self) -> usize {
        self.count
    }

    /// Values in insertion order
    pub fn values(&self) -> Values<'a, V> {
        self.values.clone()
    }
}

/// Iterator over one duplicate chain
#[derive(Debug)]
pub struct Values<'a, V> {
    map: &'a OrderedMultiMap<V>,
    cursor: Option<LinkId>,
}

impl<V> Clone for Values<'_, V> {
    fn clone(&self) -> Self {
        Self {
            map: self.map,
            cursor: self.cursor,
        }
    }
}

impl<'a, V> Iterator for Values<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.cursor {
            let link = &self.map.links[id];
            self.cursor = link.next;
            if let Some(value) = link.value.as_ref() {
                return Some(value);
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TraversalOrder {
    PreOrder,
    InOrder,
    PostOrder,
}

/// Depth-first traversal over key groups driven by an explicit stack
#[derive(Debug)]
pub struct Groups<'a, V> {
    map: &'a OrderedMultiMap<V>,
    stack: Vec<NodeId>,
    cursor: Option<NodeId>,
    order: TraversalOrder,
    last: Option<NodeId>,
}

impl<'a, V> Iterator for Groups<'a, V> {
    type Item = Group<'a, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let map = self.map;
        let nodes = &map.nodes;
        match self.order {
            TraversalOrder::PreOrder => {
                let id = self.stack.pop()?;
                if let Some(right) = nodes[id].right {
                    self.stack.push(right);
                }
                if let Some(left) = nodes[id].left {
                    self.stack.push(left);
                }
                Some(map.group(id))
            }
            TraversalOrder::InOrder => {
                while let Some(id) = self.cursor {
                    self.stack.push(id);
                    self.cursor = nodes[id].left;
                }
                let id = self.stack.pop()?;
                self.cursor = nodes[id].right;
                Some(map.group(id))
            }
            TraversalOrder::PostOrder => loop {
                while let Some(id) = self.cursor {
                    self.stack.push(id);
                    self.cursor = nodes[id].left;
                }
                let peek = *self.stack.last()?;
                match nodes[peek].right {
                    Some(right) if self.last != Some(right) => self.cursor = Some(right),
                    _ => {
                        self.stack.pop();
                        self.last = Some(peek);
                        return Some(map.group(peek));
                    }
                }
            },
        }
    }
}

/// In-order iterator over `(key, value)` pairs
#[derive(Debug)]
pub struct Iter<'a, V> {
    groups: Groups<'a, V>,
    current: Option<(&'a str, Values<'a, V>)>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((key, values)) = self.current.as_mut() {
                if let Some(value) = values.next() {
                    return Some((*key, value));
                }
            }
            let group = self.groups.next()?;
            self.current = Some((group.key, group.values));
        }
    }
}

impl<'a, V> IntoIterator for &'a OrderedMultiMap<V> {
    type Item = (&'a str, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
