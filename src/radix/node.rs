use crate::types::route_entry::RouteEntry;

//------------ NodeId --------------------------------------------------------

/// The index of a node in the arena of a [RadixTrie](super::RadixTrie).
///
/// Ids are only handed out by the trie that owns the node, and nodes are
/// never removed from the arena, so an id stays valid for the lifetime of
/// its trie.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub(crate) const ROOT: NodeId = NodeId(0);
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//------------ RadixNode -----------------------------------------------------

/// A node in the radix trie.
///
/// The label holds the bits (one byte per bit, 0 or 1) that lead from the
/// parent to this node. The bits on the path from the root down to and
/// including this label are the prefix of any entry stored here. Children
/// are kept ordered by the first bit of their label, so there are at most
/// two of them.
#[derive(Clone, Debug)]
pub struct RadixNode {
    pub(crate) label: Vec<u8>,
    pub(crate) entry: Option<RouteEntry>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
}

impl RadixNode {
    pub(crate) fn new(label: Vec<u8>, parent: Option<NodeId>) -> Self {
        Self {
            label,
            entry: None,
            children: Vec::new(),
            parent,
        }
    }

    pub fn label(&self) -> &[u8] {
        &self.label
    }

    pub fn entry(&self) -> Option<&RouteEntry> {
        self.entry.as_ref()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub(crate) fn first_bit(&self) -> Option<u8> {
        self.label.first().copied()
    }
}

/// The number of leading bits `a` and `b` have in common.
pub(crate) fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}
