use std::collections::HashMap;
use std::io;

use log::info;
use serde_derive::{Deserialize, Serialize};

use crate::types::codec::{Reader, Writer};
use crate::types::errors::RouteTableError;

//------------ AsRecord ------------------------------------------------------

/// An autonomous system with its registered name and two-letter country.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AsRecord {
    pub number: u32,
    pub name: String,
    #[serde(rename = "country")]
    pub country2: String,
}

impl AsRecord {
    pub fn new(number: u32, name: &str, country2: &str) -> Self {
        Self {
            number,
            name: name.trim().to_string(),
            country2: country2.trim().to_uppercase(),
        }
    }

    /// The record used for an AS that is missing from the AS table.
    pub fn placeholder(number: u32) -> Self {
        Self {
            number,
            name: format!("AS{}", number),
            country2: String::new(),
        }
    }
}

impl std::fmt::Display for AsRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AS{} {} ({})", self.number, self.name, self.country2)
    }
}

//------------ CountryRecord -------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CountryRecord {
    #[serde(rename = "code")]
    pub code2: String,
    #[serde(rename = "name")]
    pub full_name: String,
}

impl CountryRecord {
    pub fn new(code2: &str, full_name: &str) -> Self {
        Self {
            code2: code2.trim().to_uppercase(),
            full_name: full_name.trim().to_string(),
        }
    }

    /// The record used for a country code missing from the country table.
    pub fn placeholder(code2: &str) -> Self {
        Self::new(code2, code2)
    }
}

impl std::fmt::Display for CountryRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code2, self.full_name)
    }
}

//------------ AsTable -------------------------------------------------------

/// AS records by AS number.
#[derive(Clone, Debug, Default)]
pub struct AsTable {
    records: HashMap<u32, AsRecord>,
}

impl AsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `record`, replacing a record with the same number.
    pub fn insert(&mut self, record: AsRecord) {
        self.records.insert(record.number, record);
    }

    pub fn get(&self, number: u32) -> Option<&AsRecord> {
        self.records.get(&number)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, ordered by AS number.
    pub fn records(&self) -> Vec<&AsRecord> {
        let mut recs: Vec<_> = self.records.values().collect();
        recs.sort_by_key(|r| r.number);
        recs
    }

    /// Reads a CSV source with a `number,name,country` header.
    pub fn from_csv_reader<R: io::Read>(
        rdr: R,
    ) -> Result<Self, RouteTableError> {
        let mut table = Self::new();
        for rec in csv::Reader::from_reader(rdr).deserialize() {
            let rec: AsRecord = rec?;
            table.insert(AsRecord::new(rec.number, &rec.name, &rec.country2));
        }
        info!("loaded {} AS records from csv", table.len());
        Ok(table)
    }

    pub fn write_csv<W: io::Write>(&self, wtr: W) -> Result<(), RouteTableError> {
        let mut wtr = csv::Writer::from_writer(wtr);
        for rec in self.records() {
            wtr.serialize(rec)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn dump(&self) -> Result<Vec<u8>, RouteTableError> {
        let mut w = Writer::new();
        w.put_len(self.records.len())?;
        for rec in self.records() {
            w.put_u32(rec.number);
            w.put_str(&rec.name)?;
            w.put_str(&rec.country2)?;
        }
        Ok(w.into_bytes())
    }

    pub fn load(bytes: &[u8]) -> Result<Self, RouteTableError> {
        let mut r = Reader::new(bytes);
        let mut table = Self::new();
        for _ in 0..r.get_len()? {
            let number = r.get_u32()?;
            let name = r.get_string()?;
            let country2 = r.get_string()?;
            table.insert(AsRecord {
                number,
                name,
                country2,
            });
        }
        Ok(table)
    }
}

impl FromIterator<AsRecord> for AsTable {
    fn from_iter<T: IntoIterator<Item = AsRecord>>(iter: T) -> Self {
        let mut table = Self::new();
        iter.into_iter().for_each(|r| table.insert(r));
        table
    }
}

//------------ CountryTable --------------------------------------------------

/// Country records by uppercase two-letter code.
#[derive(Clone, Debug, Default)]
pub struct CountryTable {
    records: HashMap<String, CountryRecord>,
}

impl CountryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: CountryRecord) {
        self.records.insert(record.code2.clone(), record);
    }

    /// Looks up a code, case insensitively.
    pub fn get(&self, code2: &str) -> Option<&CountryRecord> {
        self.records.get(&code2.trim().to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> Vec<&CountryRecord> {
        let mut recs: Vec<_> = self.records.values().collect();
        recs.sort_by(|a, b| a.code2.cmp(&b.code2));
        recs
    }

    /// Reads a CSV source with a `code,name` header.
    pub fn from_csv_reader<R: io::Read>(
        rdr: R,
    ) -> Result<Self, RouteTableError> {
        let mut table = Self::new();
        for rec in csv::Reader::from_reader(rdr).deserialize() {
            let rec: CountryRecord = rec?;
            table.insert(CountryRecord::new(&rec.code2, &rec.full_name));
        }
        info!("loaded {} country records from csv", table.len());
        Ok(table)
    }

    pub fn write_csv<W: io::Write>(&self, wtr: W) -> Result<(), RouteTableError> {
        let mut wtr = csv::Writer::from_writer(wtr);
        for rec in self.records() {
            wtr.serialize(rec)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn dump(&self) -> Result<Vec<u8>, RouteTableError> {
        let mut w = Writer::new();
        w.put_len(self.records.len())?;
        for rec in self.records() {
            w.put_str(&rec.code2)?;
            w.put_str(&rec.full_name)?;
        }
        Ok(w.into_bytes())
    }

    pub fn load(bytes: &[u8]) -> Result<Self, RouteTableError> {
        let mut r = Reader::new(bytes);
        let mut table = Self::new();
        for _ in 0..r.get_len()? {
            let code2 = r.get_string()?;
            let full_name = r.get_string()?;
            table.insert(CountryRecord { code2, full_name });
        }
        Ok(table)
    }
}

impl FromIterator<CountryRecord> for CountryTable {
    fn from_iter<T: IntoIterator<Item = CountryRecord>>(iter: T) -> Self {
        let mut table = Self::new();
        iter.into_iter().for_each(|r| table.insert(r));
        table
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const AS_CSV: &str = "number,name,country\n\
        3320,Deutsche Telekom AG,de\n\
        15169,Google LLC,US\n\
        3320,DTAG,DE\n";

    #[test]
    fn as_csv_import_normalises_and_overwrites() {
        let table = AsTable::from_csv_reader(AS_CSV.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        let dtag = table.get(3320).unwrap();
        assert_eq!(dtag.name, "DTAG");
        assert_eq!(dtag.country2, "DE");
        assert!(table.get(1).is_none());
    }

    #[test]
    fn as_csv_export() {
        let table = AsTable::from_csv_reader(AS_CSV.as_bytes()).unwrap();
        let mut out = vec![];
        table.write_csv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "number,name,country\n3320,DTAG,DE\n15169,Google LLC,US\n"
        );
    }

    #[test]
    fn bad_csv_is_an_error() {
        let res = AsTable::from_csv_reader("number,name,country\nx,y,z\n".as_bytes());
        assert!(matches!(res, Err(RouteTableError::ParseError(_))));
    }

    #[test]
    fn binary_dumps() {
        let ases: AsTable = [
            AsRecord::new(64500, "Example", "nl"),
            AsRecord::new(64501, "Ëxample twee", "NL"),
        ]
        .into_iter()
        .collect();
        let back = AsTable::load(&ases.dump().unwrap()).unwrap();
        assert_eq!(back.records(), ases.records());

        let countries: CountryTable =
            [CountryRecord::new("nl", "Netherlands")].into_iter().collect();
        let back = CountryTable::load(&countries.dump().unwrap()).unwrap();
        assert_eq!(back.get("NL").unwrap().full_name, "Netherlands");
        assert!(CountryTable::load(&[0, 0, 0, 1]).is_err());
    }

    #[test]
    fn country_lookup_is_case_insensitive() {
        let t = CountryTable::from_csv_reader(
            "code,name\nde,Germany\n".as_bytes(),
        )
        .unwrap();
        assert_eq!(t.get("de"), t.get("DE"));
        assert_eq!(t.get("DE").unwrap().code2, "DE");
    }
}
