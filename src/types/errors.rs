use std::fmt;

use crate::types::af::Family;

/// Possible errors returned by the route table, the codec, the partitioner
/// and the range compiler.
///
/// Best-effort text importers (BGP dumps) never surface these per line, they
/// skip the offending line instead. Everything else propagates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTableError {
    /// A prefix string, AS path, CSV record or wire-format field could not
    /// be parsed.
    ParseError(String),
    /// The address family of an argument does not agree with the family of
    /// the table, or with the other end of a range.
    FamilyMismatch { expected: Family, found: Family },
    /// A prefix length or size lies outside of what the family allows.
    RangeError(String),
    /// A binary load ran past the end of the available bytes.
    TruncatedData { wanted: usize, available: usize },
}

impl std::error::Error for RouteTableError {}

impl fmt::Display for RouteTableError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RouteTableError::ParseError(msg) => {
                write!(f, "Error: Cannot parse input: {}.", msg)
            }
            RouteTableError::FamilyMismatch { expected, found } => {
                write!(
                    f,
                    "Error: Address family mismatch, expected {} but \
                    found {}.",
                    expected, found
                )
            }
            RouteTableError::RangeError(msg) => {
                write!(f, "Error: Value out of range: {}.", msg)
            }
            RouteTableError::TruncatedData { wanted, available } => {
                write!(
                    f,
                    "Error: Binary data is truncated, wanted {} bytes but \
                    only {} are available.",
                    wanted, available
                )
            }
        }
    }
}

impl From<csv::Error> for RouteTableError {
    fn from(value: csv::Error) -> Self {
        RouteTableError::ParseError(format!("csv: {}", value))
    }
}

impl From<std::io::Error> for RouteTableError {
    fn from(value: std::io::Error) -> Self {
        RouteTableError::ParseError(format!("io: {}", value))
    }
}

pub type RouteTableResult<T> = Result<T, RouteTableError>;
