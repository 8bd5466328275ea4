//! The binary radix trie that backs longest prefix matching in a
//! [RouteTable](crate::rib::RouteTable).
mod node;
mod tree;

pub use node::{NodeId, RadixNode};
pub use tree::{EntryIter, RadixTrie};
