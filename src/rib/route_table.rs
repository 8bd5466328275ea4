use std::collections::HashSet;
use std::io::BufRead;
use std::sync::OnceLock;

use log::{debug, info, trace};

use crate::radix::{EntryIter, RadixTrie};
use crate::rib::config::TableConfig;
use crate::types::af::Family;
use crate::types::codec::{Reader, Writer};
use crate::types::errors::RouteTableError;
use crate::types::ip_address::IpAddress;
use crate::types::route_entry::{parse_as_path, parse_prefix, RouteEntry};
use crate::types::stats::TableStats;

/// The version number written in the header of a binary table dump.
pub const DUMP_VERSION: i32 = 1;

const AS_PATH_TAG: &str = "AS_PATH:";

//------------ RouteTable ----------------------------------------------------

/// All announced prefixes of one address family, with longest prefix match
/// lookups.
///
/// Entries are collected in a deduplicating buffer. The radix trie is built
/// from that buffer on the first query after an insert, inserting entries
/// in order of ascending prefix length. Once built, lookups only need a
/// shared reference, so a finished table can be queried from many threads.
/// Inserting while other threads query is not possible, a table is loaded
/// first and published after.
#[derive(Clone, Debug)]
pub struct RouteTable {
    config: TableConfig,
    pending: Vec<RouteEntry>,
    keys: HashSet<(IpAddress, u8)>,
    trie: OnceLock<RadixTrie>,
}

impl RouteTable {
    pub fn new(family: Family) -> Self {
        Self::new_with_config(TableConfig::new(family))
    }

    pub fn new_with_config(config: TableConfig) -> Self {
        Self {
            config,
            pending: Vec::new(),
            keys: HashSet::new(),
            trie: OnceLock::new(),
        }
    }

    pub fn family(&self) -> Family {
        self.config.family
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// The number of unique prefixes in the table.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Adds `entry` if its `(address, prefix length)` is not in the table
    /// yet and the configured policy accepts it. Returns whether it was
    /// added. Adding invalidates the trie.
    pub fn insert(&mut self, entry: RouteEntry) -> Result<bool, RouteTableError> {
        self.family().check(entry.family())?;
        if !self.config.accepts(entry.prefix_len()) {
            trace!("policy drops {}", entry);
            return Ok(false);
        }
        if !self.keys.insert((entry.address(), entry.prefix_len())) {
            return Ok(false);
        }
        self.pending.push(entry);
        self.trie = OnceLock::new();
        Ok(true)
    }

    /// Whether exactly this prefix is in the table.
    pub fn contains(&self, address: &IpAddress, prefix_len: u8) -> bool {
        self.keys
            .contains(&(address.truncate_to_len(prefix_len), prefix_len))
    }

    /// Returns the trie, building it first if it is missing.
    pub fn update_trie(&self) -> &RadixTrie {
        self.trie.get_or_init(|| {
            let mut snapshot = self.pending.clone();
            snapshot.sort_by_key(|e| e.prefix_len());

            let mut trie = RadixTrie::new();
            for entry in snapshot {
                trie.insert_entry(entry);
            }
            debug!(
                "built {} trie: {} entries in {} nodes",
                self.family(),
                trie.count(),
                trie.node_count()
            );
            trie
        })
    }

    /// The entry with the longest prefix covering `address`, if any.
    pub fn lookup(
        &self,
        address: &IpAddress,
    ) -> Result<Option<&RouteEntry>, RouteTableError> {
        self.family().check(address.family())?;
        Ok(self.update_trie().longest_match(&address.binary_digits()))
    }

    /// All entries, in pre-order of the trie.
    pub fn entries(&self) -> EntryIter<'_> {
        self.update_trie().iter()
    }

    /// All entries, ordered by address octets.
    pub fn entries_sorted(&self) -> Vec<&RouteEntry> {
        let mut entries: Vec<_> = self.entries().collect();
        entries.sort_by(|a, b| a.cmp_address(b));
        entries
    }

    pub fn stats(&self) -> TableStats {
        let trie = self.update_trie();
        TableStats::from_entries(self.family(), trie.node_count(), trie.iter())
    }

    //-------- Text import ---------------------------------------------------

    /// Imports a plain text BGP dump, see `load_from_bgp_reader`. Returns
    /// the number of new entries.
    pub fn load_from_bgp_text(&mut self, text: &str) -> usize {
        let mut parser = BgpTextParser::default();
        let added = text
            .lines()
            .filter(|line| parser.feed(self, line))
            .count();
        info!("imported {} {} prefixes from bgp text", added, self.family());
        added
    }

    /// Imports a plain text BGP dump. A line starting in the first column
    /// opens a record for the `ip/len` prefix that starts it. An indented
    /// line of that record holding `AS_PATH:` supplies the path for that
    /// prefix. Lines that do not parse, and prefixes of the other family,
    /// are skipped. Only reading errors are returned.
    pub fn load_from_bgp_reader<R: BufRead>(
        &mut self,
        rdr: R,
    ) -> Result<usize, RouteTableError> {
        let mut parser = BgpTextParser::default();
        let mut added = 0;
        for line in rdr.lines() {
            if parser.feed(self, &line?) {
                added += 1;
            }
        }
        info!("imported {} {} prefixes from bgp text", added, self.family());
        Ok(added)
    }

    //-------- Binary form ---------------------------------------------------

    /// Serializes the table: a header with the dump version and the family,
    /// followed by the trie nodes, depth first.
    pub fn dump(&self) -> Result<Vec<u8>, RouteTableError> {
        let trie = self.update_trie();
        let mut w = Writer::new();
        w.put_i32(DUMP_VERSION);
        w.put_i32(self.family().version());
        trie.write(&mut w)?;
        Ok(w.into_bytes())
    }

    /// Reads a table written by `dump`. Any inconsistency in the data is an
    /// error, a partially read table is never returned.
    pub fn load(bytes: &[u8], family: Family) -> Result<Self, RouteTableError> {
        let mut r = Reader::new(bytes);
        let version = r.get_i32()?;
        if version != DUMP_VERSION {
            return Err(RouteTableError::ParseError(format!(
                "unsupported dump version {}",
                version
            )));
        }
        family.check(Family::from_version(r.get_i32()?)?)?;

        let trie = RadixTrie::read(&mut r, family)?;
        if r.remaining() != 0 {
            return Err(RouteTableError::ParseError(format!(
                "{} trailing bytes after table",
                r.remaining()
            )));
        }

        let pending: Vec<RouteEntry> = trie.iter().cloned().collect();
        let keys = pending
            .iter()
            .map(|e| (e.address(), e.prefix_len()))
            .collect();
        info!("loaded {} {} prefixes from dump", pending.len(), family);

        Ok(Self {
            config: TableConfig::new(family),
            pending,
            keys,
            trie: OnceLock::from(trie),
        })
    }
}

//------------ BgpTextParser -------------------------------------------------

#[derive(Default)]
struct BgpTextParser {
    prefix: Option<(IpAddress, u8)>,
}

impl BgpTextParser {
    // Returns true if the line led to a new entry in `table`.
    fn feed(&mut self, table: &mut RouteTable, line: &str) -> bool {
        if line.trim().is_empty() {
            return false;
        }
        if !line.starts_with(char::is_whitespace) {
            self.prefix = line
                .split_whitespace()
                .next()
                .and_then(|tok| parse_prefix(tok).ok())
                .filter(|(addr, _)| addr.family() == table.family());
            return false;
        }
        let (Some((address, prefix_len)), Some((_, path))) =
            (self.prefix, line.split_once(AS_PATH_TAG))
        else {
            return false;
        };
        let entry = parse_as_path(path)
            .and_then(|path| RouteEntry::new(address, prefix_len, path));
        match entry.and_then(|e| table.insert(e)) {
            Ok(added) => added,
            Err(err) => {
                trace!("skipping {}/{}: {}", address, prefix_len, err);
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn addr(s: &str) -> IpAddress {
        s.parse().unwrap()
    }

    #[test]
    fn insert_invalidates_the_trie() {
        let mut t = RouteTable::new(Family::V4);
        t.insert(RouteEntry::parse("10.0.0.0/8", "1").unwrap()).unwrap();
        assert_eq!(t.lookup(&addr("10.1.1.1")).unwrap().unwrap().origin_as(), 1);

        t.insert(RouteEntry::parse("10.1.0.0/16", "2").unwrap()).unwrap();
        assert_eq!(t.lookup(&addr("10.1.1.1")).unwrap().unwrap().origin_as(), 2);
    }

    #[test]
    fn policy_drops_entries() {
        let config = TableConfig::new(Family::V4)
            .with_max_prefix_len(24)
            .with_default_route(false);
        let mut t = RouteTable::new_with_config(config);
        assert!(!t.insert(RouteEntry::parse("0.0.0.0/0", "1").unwrap()).unwrap());
        assert!(!t.insert(RouteEntry::parse("1.2.3.0/25", "1").unwrap()).unwrap());
        assert!(t.insert(RouteEntry::parse("1.2.3.0/24", "1").unwrap()).unwrap());
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn family_mismatch() {
        let mut t = RouteTable::new(Family::V6);
        let res = t.insert(RouteEntry::parse("10.0.0.0/8", "1").unwrap());
        assert_eq!(
            res,
            Err(RouteTableError::FamilyMismatch {
                expected: Family::V6,
                found: Family::V4
            })
        );
        assert!(t.lookup(&addr("10.0.0.1")).is_err());
    }

    #[test]
    fn bgp_text_import() {
        let text = "\
1.0.0.0/24 some peer data
    ORIGIN: IGP
    AS_PATH: 3356 13335
    NEXT_HOP: 4.68.1.2
garbage/99
    AS_PATH: 1 2 3
1.0.4.0/22
    AS_PATH: 3356 {38803,56203}
2001:db8::/32
    AS_PATH: 6939 64500
1.0.0.0/24
    AS_PATH: 174 13335
8.8.8.0/24
    AS_PATH: 15169
";
        let mut t = RouteTable::new(Family::V4);
        assert_eq!(t.load_from_bgp_text(text), 2);
        assert!(t.contains(&addr("1.0.0.0"), 24));
        assert!(t.contains(&addr("8.8.8.8"), 24));
        assert!(!t.contains(&addr("1.0.4.0"), 22));
        let e = t.lookup(&addr("1.0.0.1")).unwrap().unwrap();
        assert_eq!(e.as_path(), &[3356, 13335]);

        let mut t6 = RouteTable::new(Family::V6);
        let added = t6.load_from_bgp_reader(text.as_bytes()).unwrap();
        assert_eq!(added, 1);
    }

    #[test]
    fn load_rejects_bad_headers() {
        let t = RouteTable::new(Family::V4);
        let bytes = t.dump().unwrap();
        assert!(RouteTable::load(&bytes, Family::V4).is_ok());
        assert!(matches!(
            RouteTable::load(&bytes, Family::V6),
            Err(RouteTableError::FamilyMismatch { .. })
        ));
        let mut bad = bytes.clone();
        bad[3] = 2;
        assert!(RouteTable::load(&bad, Family::V4).is_err());
        let mut long = bytes.clone();
        long.push(0);
        assert!(RouteTable::load(&long, Family::V4).is_err());
        assert!(matches!(
            RouteTable::load(&bytes[..bytes.len() - 1], Family::V4),
            Err(RouteTableError::TruncatedData { .. })
        ));
    }
}
