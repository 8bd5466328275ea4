use crate::types::errors::RouteTableError;

//------------ Family --------------------------------------------------------

/// The address family of an address, a prefix or a whole table.
///
/// The numeric value used on the wire is the IP version, so 4 or 6.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde_derive::Serialize,
    serde_derive::Deserialize,
)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// The number of bits in an address of this family.
    pub const fn bits(self) -> u8 {
        match self {
            Family::V4 => 32,
            Family::V6 => 128,
        }
    }

    /// The number of octets in an address of this family.
    pub const fn octets(self) -> usize {
        match self {
            Family::V4 => 4,
            Family::V6 => 16,
        }
    }

    /// The largest address of this family as an integer.
    pub const fn max_value(self) -> u128 {
        match self {
            Family::V4 => u32::MAX as u128,
            Family::V6 => u128::MAX,
        }
    }

    /// The IP version number, used in the binary table header.
    pub const fn version(self) -> i32 {
        match self {
            Family::V4 => 4,
            Family::V6 => 6,
        }
    }

    pub fn from_version(version: i32) -> Result<Self, RouteTableError> {
        match version {
            4 => Ok(Family::V4),
            6 => Ok(Family::V6),
            v => Err(RouteTableError::ParseError(format!(
                "unknown address family {}",
                v
            ))),
        }
    }

    /// Returns an error if `other` is not the same family as `self`.
    pub fn check(self, other: Family) -> Result<(), RouteTableError> {
        if self == other {
            Ok(())
        } else {
            Err(RouteTableError::FamilyMismatch {
                expected: self,
                found: other,
            })
        }
    }

    /// The bit mask covering the host part of a prefix of length `len`.
    pub(crate) fn host_mask(self, len: u8) -> u128 {
        let host_bits = u32::from(self.bits().saturating_sub(len));
        match 1_u128.checked_shl(host_bits) {
            Some(v) => v - 1,
            None => u128::MAX,
        }
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Family::V4 => write!(f, "IPv4"),
            Family::V6 => write!(f, "IPv6"),
        }
    }
}
