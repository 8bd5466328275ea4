//! Configuration options for a [RouteTable](super::RouteTable).
//!
//! A configuration is created for an address family, some fields are set
//! on it, and it is passed in to
//! [new_with_config](super::RouteTable::new_with_config).
//!
//! ```
//! use bgp_classify::Family;
//! use bgp_classify::rib::RouteTable;
//! use bgp_classify::rib::config::TableConfig;
//!
//! let config = TableConfig::new(Family::V4).with_max_prefix_len(24);
//! let table = RouteTable::new_with_config(config);
//! assert!(table.is_empty());
//! ```

use crate::types::af::Family;

//------------ TableConfig ---------------------------------------------------

/// The import policy of a route table. Entries rejected by the policy are
/// dropped on insert, as if they were never announced.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TableConfig {
    /// The family of every entry in the table.
    pub family: Family,
    /// Entries more specific than this are dropped. `None` accepts all
    /// prefix lengths.
    pub max_prefix_len: Option<u8>,
    /// Whether a default route (a /0) is accepted.
    pub accept_default_route: bool,
}

impl TableConfig {
    pub fn new(family: Family) -> Self {
        Self {
            family,
            max_prefix_len: None,
            accept_default_route: true,
        }
    }

    pub fn with_max_prefix_len(mut self, len: u8) -> Self {
        self.max_prefix_len = Some(len);
        self
    }

    pub fn with_default_route(mut self, accept: bool) -> Self {
        self.accept_default_route = accept;
        self
    }

    /// Whether an entry with `prefix_len` passes this policy.
    pub fn accepts(&self, prefix_len: u8) -> bool {
        if prefix_len == 0 && !self.accept_default_route {
            return false;
        }
        self.max_prefix_len.map_or(true, |max| prefix_len <= max)
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self::new(Family::V4)
    }
}
