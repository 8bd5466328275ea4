#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]

//! A library that classifies IPv4 and IPv6 addresses against a full BGP
//! routing table.
//!
//! For any address it finds the most specific announced prefix and the AS
//! that originates it, and through an AS table and a country table, the
//! name and country of that AS. From the same table it computes a complete,
//! non-overlapping partition of the address space by owner (AS, country, or
//! an arbitrary tag), and it compiles address ranges into minimal sets of
//! CIDR blocks, e.g. for firewall rules.
//!
//! The main data structure is a binary radix (PATRICIA) trie over prefix
//! bits, held in a [RouteTable](rib::RouteTable) per address family. The
//! table is filled first, then queried: the trie is built lazily on the
//! first query and only needs shared access from then on.
//!
//! ```
//! use bgp_classify::{Family, IpAddress, RouteEntry};
//! use bgp_classify::rib::RouteTable;
//!
//! let mut table = RouteTable::new(Family::V4);
//! table.insert(RouteEntry::parse("10.0.0.0/8", "3356 64500").unwrap()).unwrap();
//! table.insert(RouteEntry::parse("10.1.0.0/16", "3356 64501").unwrap()).unwrap();
//!
//! let addr: IpAddress = "10.1.2.3".parse().unwrap();
//! let entry = table.lookup(&addr).unwrap().unwrap();
//! assert_eq!(entry.origin_as(), 64501);
//! ```
mod radix;
mod types;

// Public Interfaces on the root of the crate

/// Route tables with longest prefix match lookups, and their configuration
pub mod rib;

/// Address space partitioning and range to CIDR compilation
pub mod partition;

/// The trie types, for callers that want to inspect the structure
pub use radix::{EntryIter, NodeId, RadixNode, RadixTrie};

/// Address, prefix and registry value types
pub use types::{
    parse_as_path, parse_prefix, AsRecord, AsTable, CountryRecord,
    CountryTable, Family, IpAddress, RouteEntry,
};

/// Error types returned by tables, codecs and the partitioner
pub use types::errors;

/// Statistics types returned by a route table
pub use types::stats;
