use std::error::Error;

use bgp_classify::partition::{
    Classification, PartitionMode, SpacePartition, TagMap,
};
use bgp_classify::rib::RouteTable;
use bgp_classify::{
    AsRecord, AsTable, CountryRecord, CountryTable, Family, IpAddress,
    RouteEntry,
};
use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};

mod common {
    use std::io::Write;

    pub fn init() {
        let _ = env_logger::builder()
            .format(|buf, record| writeln!(buf, "{}", record.args()))
            .is_test(true)
            .try_init();
    }
}

const COUNTRIES: [&str; 4] = ["NL", "DE", "US", ""];

// Origins 1..=40. AS 40 is left out of the AS table, the others cycle
// through the countries, including an empty one.
fn registries() -> (AsTable, CountryTable) {
    let as_table: AsTable = (1..40_u32)
        .map(|n| {
            AsRecord::new(
                n,
                &format!("net-{}", n),
                COUNTRIES[n as usize % COUNTRIES.len()],
            )
        })
        .collect();
    // US is left out of the country table on purpose.
    let countries: CountryTable = [
        CountryRecord::new("NL", "Netherlands"),
        CountryRecord::new("DE", "Germany"),
    ]
    .into_iter()
    .collect();
    (as_table, countries)
}

fn random_table(
    rng: &mut StdRng,
    family: Family,
) -> Result<RouteTable, Box<dyn Error>> {
    let mut table = RouteTable::new(family);
    for _ in 0..400 {
        let (raw, len) = match family {
            // Keep it dense: all of it in 100.0.0.0/8.
            Family::V4 => (
                0x6400_0000 | (rng.random::<u32>() & 0x00ff_ffff) as u128,
                rng.random_range(9..=24),
            ),
            Family::V6 => (
                (0x2a00_u128 << 112) | (rng.random::<u128>() >> 24),
                rng.random_range(20..=48),
            ),
        };
        table.insert(RouteEntry::new(
            IpAddress::from_u128(raw, family),
            len,
            vec![65_000, rng.random_range(1..=40)],
        )?)?;
    }
    Ok(table)
}

// The partition is sorted, gap free, and no two neighbours share a value.
fn check_shape(p: &SpacePartition) {
    let intervals = p.intervals();
    let first = intervals.first().map(|i| i.start);
    let last = intervals.last().map(|i| i.end);
    assert_eq!(first, Some(IpAddress::min(p.family())));
    assert_eq!(last, Some(IpAddress::max(p.family())));

    for pair in intervals.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(a.start <= a.end);
        assert_eq!(a.end.saturating_add(1), b.start, "gap after {}", a);
        assert_ne!(
            a.value.as_ref().map(Classification::key),
            b.value.as_ref().map(Classification::key),
            "{} and {} should have merged",
            a,
            b
        );
    }
}

// Whatever the table says about an address, the partition says too.
fn check_agreement(
    p: &SpacePartition,
    table: &RouteTable,
    as_table: &AsTable,
    rng: &mut StdRng,
    mode: &PartitionMode,
) -> Result<(), Box<dyn Error>> {
    let entries = table.entries_sorted();
    for _ in 0..5_000 {
        let e = entries[rng.random_range(0..entries.len())];
        let addr = e.address().saturating_add_u128(rng.random_range(0..e.size()));

        let want = table.lookup(&addr)?.and_then(|hit| {
            let origin = hit.origin_as();
            match mode {
                PartitionMode::ByAs => Some(format!("AS{}", origin)),
                PartitionMode::ByCountry => as_table
                    .get(origin)
                    .map(|r| r.country2.clone())
                    .filter(|c| !c.is_empty()),
                PartitionMode::ByTag(tags) => {
                    tags.get(&(hit.address(), hit.prefix_len())).cloned()
                }
            }
        });
        let interval = p.lookup(&addr)?.ok_or("address outside partition")?;
        let got = interval.value.as_ref().map(Classification::key);
        assert_eq!(got, want, "classification of {}", addr);

        if let Some(key) = got {
            assert!(p.blocks_for(&key).contains(interval));
        }
    }
    Ok(())
}

#[test]
fn test_partition_by_as() -> Result<(), Box<dyn Error>> {
    crate::common::init();

    let (as_table, countries) = registries();
    for (family, seed) in [(Family::V4, 1_u64), (Family::V6, 2)] {
        let mut rng = StdRng::seed_from_u64(seed);
        let table = random_table(&mut rng, family)?;
        let mode = PartitionMode::ByAs;
        let p = SpacePartition::build(&table, &as_table, &countries, &mode)?;
        debug!("{} intervals for {}", p.intervals().len(), family);

        check_shape(&p);
        check_agreement(&p, &table, &as_table, &mut rng, &mode)?;

        // The unknown AS still gets a value.
        if let Some(hit) = table.entries().find(|e| e.origin_as() == 40) {
            let i = p.lookup(&hit.last_address())?.ok_or("no interval")?;
            assert!(i.value.is_some());
        }
    }
    Ok(())
}

#[test]
fn test_partition_by_country() -> Result<(), Box<dyn Error>> {
    crate::common::init();

    let (as_table, countries) = registries();
    let mut rng = StdRng::seed_from_u64(3);
    let table = random_table(&mut rng, Family::V4)?;
    let mode = PartitionMode::ByCountry;
    let p = SpacePartition::build(&table, &as_table, &countries, &mode)?;

    check_shape(&p);
    check_agreement(&p, &table, &as_table, &mut rng, &mode)?;

    // Only the three non-empty country codes show up as values.
    assert!(p.keys().iter().all(|k| ["NL", "DE", "US"].contains(k)));

    // A country missing from the table still classifies, by its code.
    for i in p.blocks_for("US") {
        match &i.value {
            Some(Classification::Country(rec)) => {
                assert_eq!(rec.full_name, "US")
            }
            other => panic!("unexpected value {:?}", other),
        }
    }
    let nl = p.blocks_for("NL").first().ok_or("no NL space")?;
    assert_eq!(
        nl.value,
        Some(Classification::Country(CountryRecord::new(
            "NL",
            "Netherlands"
        )))
    );
    Ok(())
}

#[test]
fn test_partition_by_tag() -> Result<(), Box<dyn Error>> {
    crate::common::init();

    let (as_table, countries) = registries();
    let mut rng = StdRng::seed_from_u64(4);
    let table = random_table(&mut rng, Family::V4)?;

    // Tag about a third of the entries, by their origin.
    let tags: TagMap = table
        .entries()
        .filter(|e| e.origin_as() % 3 == 0)
        .map(|e| {
            (
                (e.address(), e.prefix_len()),
                format!("tag-{}", e.origin_as() % 2),
            )
        })
        .collect();
    let mode = PartitionMode::ByTag(tags);
    let p = SpacePartition::build(&table, &as_table, &countries, &mode)?;

    check_shape(&p);
    check_agreement(&p, &table, &as_table, &mut rng, &mode)?;
    assert!(p.keys().iter().all(|k| k.starts_with("tag-")));
    Ok(())
}

#[test]
fn test_summary_covers_assigned_space() -> Result<(), Box<dyn Error>> {
    crate::common::init();

    let (as_table, countries) = registries();
    let mut rng = StdRng::seed_from_u64(5);
    let table = random_table(&mut rng, Family::V4)?;
    let p = SpacePartition::build(
        &table,
        &as_table,
        &countries,
        &PartitionMode::ByAs,
    )?;

    let summary = p.summary()?;
    assert_eq!(summary.len(), p.keys().len());

    let assigned: u128 = p
        .intervals()
        .iter()
        .filter(|i| i.value.is_some())
        .map(|i| i.size())
        .sum();
    let total: u128 = summary.iter().map(|s| s.addresses).sum();
    assert_eq!(total, assigned);

    // Each key's CIDR blocks add up to its address count.
    for s in &summary {
        let blocks = p.cidr_blocks_for(&s.key)?;
        assert_eq!(blocks.len(), s.blocks);
        let size: u128 = blocks.iter().map(|(_, len)| 1_u128 << (32 - len)).sum();
        assert_eq!(size, s.addresses);
    }

    let json: serde_json::Value = serde_json::from_str(&p.to_json()?)?;
    assert_eq!(json["family"], "V4");
    assert_eq!(
        json["intervals"].as_array().map(|a| a.len()),
        Some(p.intervals().len())
    );
    Ok(())
}

#[test]
fn test_partition_is_a_snapshot() -> Result<(), Box<dyn Error>> {
    crate::common::init();

    let (as_table, countries) = registries();
    let mut table = RouteTable::new(Family::V4);
    table.insert(RouteEntry::parse("100.64.0.0/10", "1")?)?;
    let p = SpacePartition::build(
        &table,
        &as_table,
        &countries,
        &PartitionMode::ByAs,
    )?;

    table.insert(RouteEntry::parse("100.64.0.0/16", "2")?)?;
    let target: IpAddress = "100.64.1.1".parse()?;
    assert_eq!(table.lookup(&target)?.map(|e| e.origin_as()), Some(2));
    let i = p.lookup(&target)?.ok_or("no interval")?;
    assert_eq!(i.value.as_ref().map(Classification::key), Some("AS1".into()));
    assert!(p.lookup(&"::1".parse()?).is_err());
    Ok(())
}
