#![cfg(feature = "cli")]

use std::error::Error;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Instant;

use ansi_term::Colour;
use bgp_classify::partition::{
    compile_cidr_blocks, PartitionMode, SpacePartition,
};
use bgp_classify::rib::RouteTable;
use bgp_classify::{AsTable, CountryTable, Family, IpAddress, RouteEntry};
use clap::Parser;
use log::info;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const HISTORY: &str = "/tmp/bgp-classify-history.txt";

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Plain text BGP table dump to import
    #[arg(long)]
    bgp: Option<PathBuf>,

    /// Address family of the table, 4 or 6
    #[arg(long, default_value_t = 4)]
    family: i32,

    /// CSV file with AS records: number,name,country
    #[arg(long)]
    as_table: Option<PathBuf>,

    /// CSV file with country records: code,name
    #[arg(long)]
    country_table: Option<PathBuf>,

    /// Write the binary form of the table to this file
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Read a binary table from this file instead of a BGP dump
    #[arg(long, conflicts_with = "bgp")]
    load: Option<PathBuf>,
}

struct Session {
    table: RouteTable,
    as_table: AsTable,
    countries: CountryTable,
}

impl Session {
    fn describe(&self, entry: &RouteEntry) -> String {
        let origin = entry.origin_as();
        let (name, country) = match self.as_table.get(origin) {
            Some(rec) => {
                let country = self
                    .countries
                    .get(&rec.country2)
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| rec.country2.clone());
                (rec.name.clone(), country)
            }
            None => ("unknown".to_string(), "-".to_string()),
        };
        format!(
            "{} {} {} {}",
            Colour::Green.paint(format!(
                "{}/{}",
                entry.address(),
                entry.prefix_len()
            )),
            Colour::Cyan.paint(format!("AS{}", origin)),
            name,
            Colour::Yellow.paint(country)
        )
    }

    fn lookup(&self, arg: &str) -> Result<(), Box<dyn Error>> {
        let addr: IpAddress = arg.parse()?;
        match self.table.lookup(&addr)? {
            Some(entry) => println!("{}", self.describe(entry)),
            None => println!("{}", Colour::Red.paint("no covering prefix")),
        }
        Ok(())
    }

    fn json(&self, arg: &str) -> Result<(), Box<dyn Error>> {
        let addr: IpAddress = arg.parse()?;
        let value = match self.table.lookup(&addr)? {
            Some(entry) => serde_json::json!({
                "address": addr,
                "prefix": format!("{}/{}", entry.address(), entry.prefix_len()),
                "as_path": entry.as_path(),
                "origin": self.as_table.get(entry.origin_as()),
            }),
            None => serde_json::json!({ "address": addr, "prefix": null }),
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        Ok(())
    }

    fn range(&self, a: &str, b: &str) -> Result<(), Box<dyn Error>> {
        let blocks = compile_cidr_blocks(&a.parse()?, &b.parse()?)?;
        for (addr, len) in blocks {
            println!("{}/{}", addr, len);
        }
        Ok(())
    }

    fn summary(&self, by: &str) -> Result<(), Box<dyn Error>> {
        let mode = match by {
            "as" => PartitionMode::ByAs,
            "country" => PartitionMode::ByCountry,
            _ => return Err(format!("cannot partition by {:?}", by).into()),
        };
        let t = Instant::now();
        let partition = SpacePartition::build(
            &self.table,
            &self.as_table,
            &self.countries,
            &mode,
        )?;
        for s in partition.summary()? {
            println!(
                "{:<12} {:>8} intervals {:>8} blocks {:>40} addresses",
                s.key, s.intervals, s.blocks, s.addresses
            );
        }
        info!("partitioned in {} msecs", t.elapsed().as_millis());
        Ok(())
    }

    fn exec(&self, line: &str) -> Result<(), Box<dyn Error>> {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] => Ok(()),
            ["stats"] => {
                print!("{}", self.table.stats());
                Ok(())
            }
            ["range", a, b] => self.range(a, b),
            ["json", addr] => self.json(addr),
            ["summary", by] => self.summary(by),
            [addr] => self.lookup(addr),
            _ => Err(format!("unknown command {:?}", line).into()),
        }
    }
}

fn load_table(args: &Cli, family: Family) -> Result<RouteTable, Box<dyn Error>> {
    let t = Instant::now();
    let table = match (&args.load, &args.bgp) {
        (Some(path), _) => RouteTable::load(&fs::read(path)?, family)?,
        (None, Some(path)) => {
            let mut table = RouteTable::new(family);
            table.load_from_bgp_reader(BufReader::new(File::open(path)?))?;
            table
        }
        (None, None) => RouteTable::new(family),
    };
    // Build the trie now rather than on the first query.
    let trie = table.update_trie();
    println!(
        "{} prefixes in {} nodes, ready in {} msecs",
        trie.count(),
        trie.node_count(),
        t.elapsed().as_millis()
    );
    Ok(table)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Cli::parse();

    let family = Family::from_version(args.family)?;
    let table = load_table(&args, family)?;

    if let Some(path) = &args.dump {
        fs::write(path, table.dump()?)?;
        println!("wrote table to {}", path.display());
    }

    let as_table = match &args.as_table {
        Some(path) => AsTable::from_csv_reader(File::open(path)?)?,
        None => AsTable::new(),
    };
    let countries = match &args.country_table {
        Some(path) => CountryTable::from_csv_reader(File::open(path)?)?,
        None => CountryTable::new(),
    };
    let session = Session {
        table,
        as_table,
        countries,
    };

    let mut rl = DefaultEditor::new()?;
    if rl.load_history(HISTORY).is_err() {
        println!("No previous history.");
    }
    loop {
        match rl.readline("(bgp-classify)> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                if let Err(err) = session.exec(&line) {
                    println!("{}", Colour::Red.paint(format!("Error: {}", err)));
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {}", err);
                break;
            }
        }
    }
    rl.save_history(HISTORY)?;
    Ok(())
}
