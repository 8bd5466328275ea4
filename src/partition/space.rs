use std::collections::HashMap;

use log::{debug, info};
use serde_derive::Serialize;

use crate::partition::cidr::compile_cidr_blocks;
use crate::rib::RouteTable;
use crate::types::af::Family;
use crate::types::errors::RouteTableError;
use crate::types::ip_address::IpAddress;
use crate::types::registry::{AsRecord, AsTable, CountryRecord, CountryTable};
use crate::types::route_entry::RouteEntry;

/// Opaque tags for the `ByTag` partition mode, keyed by the
/// `(address, prefix length)` of the entry they belong to.
pub type TagMap = HashMap<(IpAddress, u8), String>;

//------------ PartitionMode -------------------------------------------------

/// What the address space is partitioned by.
#[derive(Clone, Debug)]
pub enum PartitionMode {
    /// The AS record of the origin AS of the covering entry. An AS missing
    /// from the AS table gets a placeholder record.
    ByAs,
    /// The country of the origin AS of the covering entry. Addresses whose
    /// origin AS has no known country are unassigned.
    ByCountry,
    /// The tag attached to the covering entry. Entries without a tag leave
    /// their addresses unassigned.
    ByTag(TagMap),
}

//------------ Classification ------------------------------------------------

/// The value an address is classified with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value")]
pub enum Classification {
    As(AsRecord),
    Country(CountryRecord),
    Tag(String),
}

impl Classification {
    /// The string form of the value, `AS64500`, `NL`, or the tag itself.
    /// Partitions are indexed by it.
    pub fn key(&self) -> String {
        match self {
            Classification::As(rec) => format!("AS{}", rec.number),
            Classification::Country(rec) => rec.code2.clone(),
            Classification::Tag(tag) => tag.clone(),
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classification::As(rec) => write!(f, "{}", rec),
            Classification::Country(rec) => write!(f, "{}", rec),
            Classification::Tag(tag) => write!(f, "{}", tag),
        }
    }
}

fn key_of(value: &Option<Classification>) -> Option<String> {
    value.as_ref().map(Classification::key)
}

//------------ SpaceInterval -------------------------------------------------

/// An inclusive range of addresses with one classification. `None` marks
/// space that no entry classifies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SpaceInterval {
    pub start: IpAddress,
    pub end: IpAddress,
    pub value: Option<Classification>,
}

impl SpaceInterval {
    pub fn contains(&self, address: &IpAddress) -> bool {
        self.start <= *address && *address <= self.end
    }

    /// The number of addresses in the interval, saturated at `u128::MAX`
    /// for the whole IPv6 space.
    pub fn size(&self) -> u128 {
        (self.end.to_u128() - self.start.to_u128()).saturating_add(1)
    }

    /// The CIDR blocks covering exactly this interval.
    pub fn cidr_blocks(&self) -> Result<Vec<(IpAddress, u8)>, RouteTableError> {
        compile_cidr_blocks(&self.start, &self.end)
    }
}

impl std::fmt::Display for SpaceInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{} - {} {}", self.start, self.end, v),
            None => write!(f, "{} - {} unassigned", self.start, self.end),
        }
    }
}

//------------ ValueSummary --------------------------------------------------

/// Totals for one classification value of a partition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValueSummary {
    pub key: String,
    pub intervals: usize,
    pub blocks: usize,
    pub addresses: u128,
}

//------------ SpacePartition ------------------------------------------------

/// The whole address space of one family cut into intervals, each with the
/// classification of the entries covering it.
///
/// The intervals are sorted, do not overlap, leave no gaps from the lowest
/// to the highest address, and neighbours never share a value. A partition
/// is computed once from a finished table and does not follow later
/// changes to that table.
#[derive(Clone, Debug, Serialize)]
pub struct SpacePartition {
    family: Family,
    intervals: Vec<SpaceInterval>,
    #[serde(skip)]
    index: HashMap<String, Vec<SpaceInterval>>,
}

impl SpacePartition {
    /// Partitions the space of `table`'s family.
    ///
    /// Every entry contributes its first address and the address right
    /// after its last one as boundaries, next to the lowest and highest
    /// address. Between two neighbouring boundaries the longest prefix
    /// match cannot change, so classifying each boundary with a table
    /// lookup and merging runs of equal values yields the partition.
    pub fn build(
        table: &RouteTable,
        as_table: &AsTable,
        country_table: &CountryTable,
        mode: &PartitionMode,
    ) -> Result<Self, RouteTableError> {
        let family = table.family();
        let min = IpAddress::min(family);
        let max = IpAddress::max(family);

        let mut boundaries = vec![min, max];
        for entry in table.entries() {
            boundaries.push(entry.address());
            boundaries.push(entry.address().saturating_add_u128(entry.size()));
        }
        boundaries.sort();
        boundaries.dedup();
        debug!(
            "partitioning {} space over {} boundaries",
            family,
            boundaries.len()
        );

        let values = classify_all(&boundaries, |addr| {
            Ok(table
                .lookup(addr)?
                .and_then(|e| classify(e, as_table, country_table, mode)))
        })?;

        let mut intervals = Vec::new();
        let mut points = boundaries.into_iter().zip(values);
        let (mut start, mut value) = points.next().unwrap_or((min, None));
        for (boundary, next) in points {
            if key_of(&next) != key_of(&value) {
                intervals.push(SpaceInterval {
                    start,
                    end: boundary.saturating_add(-1),
                    value,
                });
                start = boundary;
                value = next;
            }
        }
        intervals.push(SpaceInterval {
            start,
            end: max,
            value,
        });

        let mut index: HashMap<String, Vec<SpaceInterval>> = HashMap::new();
        for interval in &intervals {
            if let Some(key) = key_of(&interval.value) {
                index.entry(key).or_default().push(interval.clone());
            }
        }
        info!(
            "partitioned {} space into {} intervals with {} values",
            family,
            intervals.len(),
            index.len()
        );

        Ok(Self {
            family,
            intervals,
            index,
        })
    }

    pub fn family(&self) -> Family {
        self.family
    }

    /// All intervals, unassigned ones included, in address order.
    pub fn intervals(&self) -> &[SpaceInterval] {
        &self.intervals
    }

    /// The interval holding `address`.
    pub fn lookup(
        &self,
        address: &IpAddress,
    ) -> Result<Option<&SpaceInterval>, RouteTableError> {
        self.family.check(address.family())?;
        let pos = self.intervals.partition_point(|i| i.end < *address);
        Ok(self.intervals.get(pos).filter(|i| i.contains(address)))
    }

    /// The intervals classified with the value whose key is `key`, in
    /// address order.
    pub fn blocks_for(&self, key: &str) -> &[SpaceInterval] {
        self.index.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The CIDR blocks covering all intervals with value `key`.
    pub fn cidr_blocks_for(
        &self,
        key: &str,
    ) -> Result<Vec<(IpAddress, u8)>, RouteTableError> {
        let mut blocks = Vec::new();
        for interval in self.blocks_for(key) {
            blocks.extend(interval.cidr_blocks()?);
        }
        Ok(blocks)
    }

    /// The keys of all values in the partition, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<_> = self.index.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Totals per value, sorted by key.
    pub fn summary(&self) -> Result<Vec<ValueSummary>, RouteTableError> {
        self.keys()
            .into_iter()
            .map(|key| {
                let intervals = self.blocks_for(key);
                let mut blocks = 0;
                let mut addresses = 0_u128;
                for i in intervals {
                    blocks += i.cidr_blocks()?.len();
                    addresses = addresses.saturating_add(i.size());
                }
                Ok(ValueSummary {
                    key: key.to_string(),
                    intervals: intervals.len(),
                    blocks,
                    addresses,
                })
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String, RouteTableError> {
        serde_json::to_string(self).map_err(|e| {
            RouteTableError::ParseError(format!("json: {}", e))
        })
    }
}

fn classify(
    entry: &RouteEntry,
    as_table: &AsTable,
    country_table: &CountryTable,
    mode: &PartitionMode,
) -> Option<Classification> {
    let origin = entry.origin_as();
    match mode {
        PartitionMode::ByAs => Some(Classification::As(
            as_table
                .get(origin)
                .cloned()
                .unwrap_or_else(|| AsRecord::placeholder(origin)),
        )),
        PartitionMode::ByCountry => {
            let code = as_table.get(origin)?.country2.as_str();
            if code.is_empty() {
                return None;
            }
            Some(Classification::Country(
                country_table
                    .get(code)
                    .cloned()
                    .unwrap_or_else(|| CountryRecord::placeholder(code)),
            ))
        }
        PartitionMode::ByTag(tags) => tags
            .get(&(entry.address(), entry.prefix_len()))
            .cloned()
            .map(Classification::Tag),
    }
}

#[cfg(not(feature = "rayon"))]
fn classify_all<F>(
    boundaries: &[IpAddress],
    f: F,
) -> Result<Vec<Option<Classification>>, RouteTableError>
where
    F: Fn(&IpAddress) -> Result<Option<Classification>, RouteTableError>,
{
    boundaries.iter().map(f).collect()
}

#[cfg(feature = "rayon")]
fn classify_all<F>(
    boundaries: &[IpAddress],
    f: F,
) -> Result<Vec<Option<Classification>>, RouteTableError>
where
    F: Fn(&IpAddress) -> Result<Option<Classification>, RouteTableError>
        + Sync
        + Send,
{
    use rayon::prelude::*;
    boundaries.par_iter().map(f).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn addr(s: &str) -> IpAddress {
        s.parse().unwrap()
    }

    fn table(entries: &[(&str, &str)]) -> RouteTable {
        let mut t = RouteTable::new(Family::V4);
        for (pfx, path) in entries {
            t.insert(RouteEntry::parse(pfx, path).unwrap()).unwrap();
        }
        t
    }

    #[test]
    fn empty_table_is_one_unassigned_interval() {
        let p = SpacePartition::build(
            &RouteTable::new(Family::V4),
            &AsTable::new(),
            &CountryTable::new(),
            &PartitionMode::ByAs,
        )
        .unwrap();
        assert_eq!(p.intervals().len(), 1);
        assert_eq!(p.intervals()[0].start, IpAddress::min(Family::V4));
        assert_eq!(p.intervals()[0].end, IpAddress::max(Family::V4));
        assert!(p.keys().is_empty());
    }

    #[test]
    fn nested_prefixes_by_as() {
        let t = table(&[("10.0.0.0/8", "1"), ("10.1.0.0/16", "2")]);
        let p = SpacePartition::build(
            &t,
            &AsTable::new(),
            &CountryTable::new(),
            &PartitionMode::ByAs,
        )
        .unwrap();
        let got: Vec<String> =
            p.intervals().iter().map(|i| i.to_string()).collect();
        assert_eq!(
            got,
            [
                "0.0.0.0 - 9.255.255.255 unassigned",
                "10.0.0.0 - 10.0.255.255 AS1 AS1 ()",
                "10.1.0.0 - 10.1.255.255 AS2 AS2 ()",
                "10.2.0.0 - 10.255.255.255 AS1 AS1 ()",
                "11.0.0.0 - 255.255.255.255 unassigned",
            ]
        );
        assert_eq!(p.blocks_for("AS1").len(), 2);
        assert_eq!(p.keys(), ["AS1", "AS2"]);
        assert_eq!(
            p.lookup(&addr("10.1.2.3")).unwrap().unwrap().value,
            Some(Classification::As(AsRecord::placeholder(2)))
        );
    }

    #[test]
    fn adjacent_prefixes_of_one_as_merge() {
        let t = table(&[("10.0.0.0/9", "7"), ("10.128.0.0/9", "7")]);
        let p = SpacePartition::build(
            &t,
            &AsTable::new(),
            &CountryTable::new(),
            &PartitionMode::ByAs,
        )
        .unwrap();
        assert_eq!(p.blocks_for("AS7").len(), 1);
        assert_eq!(p.cidr_blocks_for("AS7").unwrap(), [(addr("10.0.0.0"), 8)]);
    }

    #[test]
    fn top_of_the_space() {
        let t = table(&[("255.255.255.0/24", "9")]);
        let p = SpacePartition::build(
            &t,
            &AsTable::new(),
            &CountryTable::new(),
            &PartitionMode::ByAs,
        )
        .unwrap();
        assert_eq!(p.intervals().len(), 2);
        assert_eq!(p.intervals()[1].start, addr("255.255.255.0"));
        assert_eq!(p.intervals()[1].end, addr("255.255.255.255"));
    }

    #[test]
    fn by_country_and_by_tag() {
        let t = table(&[
            ("10.0.0.0/8", "64500"),
            ("11.0.0.0/8", "64501"),
            ("12.0.0.0/8", "64999"),
        ]);
        let ases: AsTable = [
            AsRecord::new(64500, "A", "nl"),
            AsRecord::new(64501, "B", "NL"),
        ]
        .into_iter()
        .collect();
        let countries: CountryTable =
            [CountryRecord::new("NL", "Netherlands")].into_iter().collect();

        let p = SpacePartition::build(
            &t,
            &ases,
            &countries,
            &PartitionMode::ByCountry,
        )
        .unwrap();
        assert_eq!(p.keys(), ["NL"]);
        assert_eq!(p.cidr_blocks_for("NL").unwrap(), [(addr("10.0.0.0"), 7)]);

        let mut tags = TagMap::new();
        tags.insert((addr("11.0.0.0"), 8), "cdn".to_string());
        let p = SpacePartition::build(
            &t,
            &ases,
            &countries,
            &PartitionMode::ByTag(tags),
        )
        .unwrap();
        assert_eq!(p.keys(), ["cdn"]);
        assert_eq!(p.blocks_for("cdn")[0].start, addr("11.0.0.0"));
        assert!(p.blocks_for("nope").is_empty());

        let summary = p.summary().unwrap();
        assert_eq!(summary[0].addresses, 1_u128 << 24);
        assert_eq!(summary[0].blocks, 1);
        assert!(p.to_json().unwrap().contains("\"cdn\""));
    }
}
