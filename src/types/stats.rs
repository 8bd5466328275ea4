//------------ Types for Statistics -----------------------------------------

use std::collections::{BTreeMap, HashSet};
use std::fmt::{Debug, Display};

use serde_derive::Serialize;

use crate::types::af::Family;
use crate::types::route_entry::RouteEntry;

/// Statistics over the entries of a route table.
#[derive(Clone, Serialize)]
pub struct TableStats {
    pub family: Family,
    /// number of unique prefixes in the table
    pub prefixes: usize,
    /// number of nodes in the trie, including the ones without an entry
    pub nodes: usize,
    /// number of distinct origin ASes
    pub origin_ases: usize,
    /// number of prefixes for each prefix length that occurs
    pub prefix_lengths: BTreeMap<u8, usize>,
    // Addresses for IPv4, /64 blocks for IPv6. See RouteEntry::address_count.
    pub address_count: u128,
}

impl TableStats {
    pub(crate) fn from_entries<'a>(
        family: Family,
        nodes: usize,
        entries: impl Iterator<Item = &'a RouteEntry>,
    ) -> Self {
        let mut stats = TableStats {
            family,
            prefixes: 0,
            nodes,
            origin_ases: 0,
            prefix_lengths: BTreeMap::new(),
            address_count: 0,
        };
        let mut ases = HashSet::new();
        for e in entries {
            stats.prefixes += 1;
            *stats.prefix_lengths.entry(e.prefix_len()).or_default() += 1;
            stats.address_count =
                stats.address_count.saturating_add(e.address_count());
            ases.insert(e.origin_as());
        }
        stats.origin_ases = ases.len();
        stats
    }

    fn unit(&self) -> &'static str {
        match self.family {
            Family::V4 => "addresses",
            Family::V6 => "/64s",
        }
    }
}

impl Display for TableStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{}: {} prefixes in {} nodes, {} origin ASes, {} {}",
            self.family,
            self.prefixes,
            self.nodes,
            self.origin_ases,
            self.address_count,
            self.unit()
        )?;
        for (len, count) in &self.prefix_lengths {
            writeln!(f, "  /{:<3} {:>8}", len, count)?;
        }
        Ok(())
    }
}

impl Debug for TableStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "{} prefixes:{} nodes:{} lens:{:?}",
            self.family, self.prefixes, self.nodes, self.prefix_lengths
        ))
    }
}
