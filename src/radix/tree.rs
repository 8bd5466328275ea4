use log::trace;

use crate::radix::node::{common_prefix_len, NodeId, RadixNode};
use crate::types::af::Family;
use crate::types::codec::{Reader, Writer};
use crate::types::errors::RouteTableError;
use crate::types::route_entry::RouteEntry;

//------------ RadixTrie -----------------------------------------------------

/// A PATRICIA style binary trie over prefix bits, answering longest prefix
/// match queries in time proportional to the key length.
///
/// Nodes live in an arena and refer to each other by [NodeId]. Every node
/// but the root has a non-empty label, and the bits on the path from the
/// root to a node equal the prefix bits of the entry stored in it. The
/// lookup relies on this: any ancestor holding an entry on the reached path
/// covers the query, no re-check against the query is done.
#[derive(Clone, Debug)]
pub struct RadixTrie {
    nodes: Vec<RadixNode>,
    entries: usize,
}

impl Default for RadixTrie {
    fn default() -> Self {
        Self::new()
    }
}

// NodeIds are only created by this arena and nodes are never removed, so
// indexing with them cannot go out of bounds.
#[allow(clippy::indexing_slicing)]
impl RadixTrie {
    pub fn new() -> Self {
        Self {
            nodes: vec![RadixNode::new(Vec::new(), None)],
            entries: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn node(&self, id: NodeId) -> &RadixNode {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut RadixNode {
        &mut self.nodes[id.0]
    }

    fn push(&mut self, node: RadixNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// The number of nodes holding an entry.
    pub fn count(&self) -> usize {
        self.entries
    }

    /// The number of nodes, including the root and the nodes without an
    /// entry created by splitting an edge.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn child_starting_with(&self, id: NodeId, bit: u8) -> Option<NodeId> {
        self.node(id)
            .children
            .iter()
            .copied()
            .find(|c| self.node(*c).first_bit() == Some(bit))
    }

    // Keeps the children ordered by the first bit of their labels.
    fn attach(&mut self, parent: NodeId, child: NodeId) {
        let bit = self.node(child).first_bit();
        let pos = self
            .node(parent)
            .children
            .iter()
            .position(|c| self.node(*c).first_bit() > bit)
            .unwrap_or(self.node(parent).children.len());
        self.node_mut(parent).children.insert(pos, child);
    }

    /// Descends along `key`, splitting an edge or creating a leaf where
    /// needed, and returns the node whose path equals `key`. An empty key
    /// returns the root.
    pub fn insert(&mut self, key: &[u8]) -> NodeId {
        let mut cur = self.root();
        let mut rest = key;

        loop {
            let Some(&bit) = rest.first() else {
                return cur;
            };

            let Some(child) = self.child_starting_with(cur, bit) else {
                let leaf = self.push(RadixNode::new(rest.to_vec(), Some(cur)));
                self.attach(cur, leaf);
                trace!("new leaf {} under {} ({} bits)", leaf, cur, rest.len());
                return leaf;
            };

            let label_len = self.node(child).label.len();
            let common = common_prefix_len(&self.node(child).label, rest);

            if common < label_len {
                // Split the edge to `child` at `common`.
                let tail = self.node(child).label[common..].to_vec();
                let mut head = RadixNode::new(rest[..common].to_vec(), Some(cur));
                head.children.push(child);
                let mid = self.push(head);

                let c = self.node_mut(child);
                c.label = tail;
                c.parent = Some(mid);

                let siblings = &mut self.node_mut(cur).children;
                if let Some(slot) = siblings.iter_mut().find(|s| **s == child) {
                    *slot = mid;
                }
                trace!("split edge to {} at bit {} into {}", child, common, mid);
            }

            cur = self.child_starting_with(cur, bit).unwrap_or(child);
            rest = &rest[common..];
        }
    }

    /// Stores `entry` under its prefix bits, replacing an entry with the
    /// same prefix. Returns the node it was stored in.
    pub fn insert_entry(&mut self, entry: RouteEntry) -> NodeId {
        let id = self.insert(&entry.binary_digits());
        let node = self.node_mut(id);
        if node.entry.replace(entry).is_none() {
            self.entries += 1;
        }
        id
    }

    /// Descends as far as `key` matches whole edges and returns the deepest
    /// node reached. That node may not hold an entry itself.
    pub fn lookup(&self, key: &[u8]) -> NodeId {
        let mut cur = self.root();
        let mut rest = key;

        while let Some(&bit) = rest.first() {
            let Some(child) = self.child_starting_with(cur, bit) else {
                break;
            };
            let label = &self.node(child).label;
            if !rest.starts_with(label) {
                break;
            }
            rest = &rest[label.len()..];
            cur = child;
        }
        cur
    }

    /// Walks from `id` up to the root and returns the first entry found.
    pub fn traverse_parent_non_null(&self, id: NodeId) -> Option<&RouteEntry> {
        let mut cur = Some(id);
        while let Some(c) = cur {
            let node = self.node(c);
            if let Some(entry) = node.entry.as_ref() {
                return Some(entry);
            }
            cur = node.parent;
        }
        None
    }

    /// The entry with the longest prefix covering `key`.
    pub fn longest_match(&self, key: &[u8]) -> Option<&RouteEntry> {
        let found = self.traverse_parent_non_null(self.lookup(key));
        debug_assert!(
            found.map_or(true, |e| key.starts_with(&e.binary_digits())),
            "trie returned {:?} which does not cover the query",
            found
        );
        found
    }

    /// The bits on the path from the root down to and including `id`.
    pub fn path_bits(&self, id: NodeId) -> Vec<u8> {
        let mut labels = vec![];
        let mut cur = Some(id);
        while let Some(c) = cur {
            labels.push(self.node(c).label.as_slice());
            cur = self.node(c).parent;
        }
        labels.into_iter().rev().flatten().copied().collect()
    }

    /// All stored entries, in pre-order.
    pub fn iter(&self) -> EntryIter<'_> {
        EntryIter {
            trie: self,
            stack: vec![self.root()],
        }
    }

    //-------- Binary form ---------------------------------------------------

    pub(crate) fn write(&self, w: &mut Writer) -> Result<(), RouteTableError> {
        self.write_node(self.root(), w)
    }

    fn write_node(
        &self,
        id: NodeId,
        w: &mut Writer,
    ) -> Result<(), RouteTableError> {
        let node = self.node(id);
        w.put_len(node.label.len())?;
        w.put_bytes(&node.label);
        match &node.entry {
            Some(entry) => {
                w.put_i32(1);
                entry.write(w)?;
            }
            None => w.put_i32(0),
        }
        w.put_len(node.children.len())?;
        for child in &node.children {
            self.write_node(*child, w)?;
        }
        Ok(())
    }

    /// Reads a trie dumped by `write`, checking the structural invariants
    /// on the way so a corrupt dump is refused instead of answering wrong.
    pub(crate) fn read(
        r: &mut Reader,
        family: Family,
    ) -> Result<Self, RouteTableError> {
        let mut trie = RadixTrie {
            nodes: Vec::new(),
            entries: 0,
        };
        let mut path = Vec::with_capacity(family.bits() as usize);
        trie.read_node(r, family, None, &mut path)?;
        Ok(trie)
    }

    fn read_node(
        &mut self,
        r: &mut Reader,
        family: Family,
        parent: Option<NodeId>,
        path: &mut Vec<u8>,
    ) -> Result<NodeId, RouteTableError> {
        let label_len = r.get_len()?;
        match parent {
            None if label_len != 0 => {
                return Err(RouteTableError::ParseError(
                    "root node with a label".to_string(),
                ))
            }
            Some(_) if label_len == 0 => {
                return Err(RouteTableError::ParseError(
                    "inner node without a label".to_string(),
                ))
            }
            _ => {}
        }
        if path.len() + label_len > family.bits() as usize {
            return Err(RouteTableError::RangeError(format!(
                "trie path of {} bits for {}",
                path.len() + label_len,
                family
            )));
        }
        let label = r.get_bytes(label_len)?.to_vec();
        if label.iter().any(|b| *b > 1) {
            return Err(RouteTableError::ParseError(
                "label byte other than 0 or 1".to_string(),
            ));
        }
        let path_len = path.len();
        path.extend_from_slice(&label);

        let mut node = RadixNode::new(label, parent);
        match r.get_i32()? {
            0 => {}
            1 => {
                let entry = RouteEntry::read(r, family)?;
                if entry.binary_digits() != *path {
                    return Err(RouteTableError::ParseError(format!(
                        "entry {} stored off its trie path",
                        entry
                    )));
                }
                node.entry = Some(entry);
                self.entries += 1;
            }
            f => {
                return Err(RouteTableError::ParseError(format!(
                    "entry flag {}",
                    f
                )))
            }
        }
        let id = self.push(node);

        let child_count = r.get_len()?;
        if child_count > 2 {
            return Err(RouteTableError::ParseError(format!(
                "{} children in a binary trie",
                child_count
            )));
        }
        let mut last_bit = None;
        for _ in 0..child_count {
            let child = self.read_node(r, family, Some(id), path)?;
            let bit = self.node(child).first_bit();
            if last_bit.is_some() && bit <= last_bit {
                return Err(RouteTableError::ParseError(
                    "children out of order".to_string(),
                ));
            }
            last_bit = bit;
            self.node_mut(id).children.push(child);
        }

        path.truncate(path_len);
        Ok(id)
    }
}

//------------ EntryIter -----------------------------------------------------

/// Pre-order iterator over the entries of a [RadixTrie].
pub struct EntryIter<'a> {
    trie: &'a RadixTrie,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for EntryIter<'a> {
    type Item = &'a RouteEntry;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            let node = self.trie.node(id);
            self.stack.extend(node.children.iter().rev());
            if let Some(entry) = node.entry.as_ref() {
                return Some(entry);
            }
        }
        None
    }
}
