use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::types::af::Family;
use crate::types::errors::RouteTableError;

//------------ IpAddress -----------------------------------------------------

/// An IPv4 or IPv6 address, backed by its octets in network byte order.
///
/// The ordering is the lexicographic ordering of the octets, which for
/// addresses of the same family is the numerical ordering. Addresses of
/// different families are never compared in this crate, but the derived
/// ordering puts all IPv4 addresses before all IPv6 addresses.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IpAddress {
    V4([u8; 4]),
    V6([u8; 16]),
}

impl IpAddress {
    pub fn family(&self) -> Family {
        match self {
            IpAddress::V4(_) => Family::V4,
            IpAddress::V6(_) => Family::V6,
        }
    }

    pub fn octets(&self) -> &[u8] {
        match self {
            IpAddress::V4(o) => o.as_slice(),
            IpAddress::V6(o) => o.as_slice(),
        }
    }

    /// Creates an address from 4 or 16 octets.
    pub fn from_octets(octets: &[u8]) -> Result<Self, RouteTableError> {
        if let Ok(o) = <[u8; 4]>::try_from(octets) {
            Ok(IpAddress::V4(o))
        } else if let Ok(o) = <[u8; 16]>::try_from(octets) {
            Ok(IpAddress::V6(o))
        } else {
            Err(RouteTableError::ParseError(format!(
                "an address has 4 or 16 octets, not {}",
                octets.len()
            )))
        }
    }

    /// The lowest address of `family`, all zeros.
    pub fn min(family: Family) -> Self {
        Self::from_u128(0, family)
    }

    /// The highest address of `family`, all ones.
    pub fn max(family: Family) -> Self {
        Self::from_u128(family.max_value(), family)
    }

    //-------- Arithmetic ----------------------------------------------------

    /// The big-endian integer value of the octets. A `u128` holds every
    /// address of both families exactly.
    pub fn to_u128(&self) -> u128 {
        match self {
            IpAddress::V4(o) => u32::from_be_bytes(*o) as u128,
            IpAddress::V6(o) => u128::from_be_bytes(*o),
        }
    }

    /// Renders `value` back into an address of `family`. The caller makes
    /// sure `value` lies in the range of the family, bits above the family
    /// width are dropped.
    pub fn from_u128(value: u128, family: Family) -> Self {
        match family {
            Family::V4 => IpAddress::V4((value as u32).to_be_bytes()),
            Family::V6 => IpAddress::V6(value.to_be_bytes()),
        }
    }

    /// Adds `delta` to this address, clamped to the address space of the
    /// family: going past the top yields the highest address, going below
    /// zero yields the lowest address.
    pub fn saturating_add(&self, delta: i64) -> Self {
        let family = self.family();
        let value = self.to_u128();
        let res = if delta >= 0 {
            value
                .saturating_add(delta.unsigned_abs() as u128)
                .min(family.max_value())
        } else {
            value.saturating_sub(delta.unsigned_abs() as u128)
        };
        Self::from_u128(res, family)
    }

    /// Adds an unsigned `delta`, clamped to the top of the address space.
    /// Used for prefix sizes, which do not fit an `i64` for short IPv6
    /// prefixes.
    pub fn saturating_add_u128(&self, delta: u128) -> Self {
        let family = self.family();
        Self::from_u128(
            self.to_u128().saturating_add(delta).min(family.max_value()),
            family,
        )
    }

    /// Sets all bits after the first `len` bits to zero.
    pub fn truncate_to_len(&self, len: u8) -> Self {
        let family = self.family();
        Self::from_u128(self.to_u128() & !family.host_mask(len), family)
    }

    //-------- Bit views -----------------------------------------------------

    /// The address as one byte per bit, each byte being 0 or 1, most
    /// significant bit first. Always 32 or 128 bytes long.
    pub fn binary_digits(&self) -> Vec<u8> {
        self.octets()
            .iter()
            .flat_map(|o| (0..8).rev().map(move |i| (o >> i) & 1))
            .collect()
    }

    /// The address as a string of 32 or 128 '0' and '1' characters.
    pub fn bit_string(&self) -> String {
        self.binary_digits()
            .into_iter()
            .map(|b| if b == 1 { '1' } else { '0' })
            .collect()
    }

    /// Builds an address of `family` from leading bits given as bytes of
    /// value 0 or 1. Missing trailing bits are zero.
    pub fn from_binary_digits(
        digits: &[u8],
        family: Family,
    ) -> Result<Self, RouteTableError> {
        if digits.len() > family.bits() as usize {
            return Err(RouteTableError::RangeError(format!(
                "{} bits do not fit an {} address",
                digits.len(),
                family
            )));
        }
        let mut value = 0_u128;
        for (i, d) in digits.iter().enumerate() {
            match d {
                0 => {}
                1 => value |= 1_u128 << (family.bits() as usize - 1 - i),
                _ => {
                    return Err(RouteTableError::ParseError(format!(
                        "invalid binary digit {}",
                        d
                    )))
                }
            }
        }
        Ok(Self::from_u128(value, family))
    }

    /// Builds an address of `family` from a string of '0' and '1'
    /// characters, padding missing trailing bits with zeros.
    pub fn from_binary_string(
        bits: &str,
        family: Family,
    ) -> Result<Self, RouteTableError> {
        let digits = bits
            .chars()
            .map(|c| match c {
                '0' => Ok(0),
                '1' => Ok(1),
                c => Err(RouteTableError::ParseError(format!(
                    "invalid binary character '{}'",
                    c
                ))),
            })
            .collect::<Result<Vec<u8>, _>>()?;
        Self::from_binary_digits(&digits, family)
    }
}

impl From<std::net::IpAddr> for IpAddress {
    fn from(value: std::net::IpAddr) -> Self {
        match value {
            std::net::IpAddr::V4(a) => IpAddress::V4(a.octets()),
            std::net::IpAddr::V6(a) => IpAddress::V6(a.octets()),
        }
    }
}

impl From<Ipv4Addr> for IpAddress {
    fn from(value: Ipv4Addr) -> Self {
        IpAddress::V4(value.octets())
    }
}

impl From<Ipv6Addr> for IpAddress {
    fn from(value: Ipv6Addr) -> Self {
        IpAddress::V6(value.octets())
    }
}

impl From<IpAddress> for std::net::IpAddr {
    fn from(value: IpAddress) -> Self {
        match value {
            IpAddress::V4(o) => std::net::IpAddr::V4(Ipv4Addr::from(o)),
            IpAddress::V6(o) => std::net::IpAddr::V6(Ipv6Addr::from(o)),
        }
    }
}

impl FromStr for IpAddress {
    type Err = RouteTableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<std::net::IpAddr>()
            .map(IpAddress::from)
            .map_err(|e| {
                RouteTableError::ParseError(format!("address '{}': {}", s, e))
            })
    }
}

impl std::fmt::Display for IpAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", std::net::IpAddr::from(*self))
    }
}

impl std::fmt::Debug for IpAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl serde::Serialize for IpAddress {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn saturating_at_the_edges() {
        for family in [Family::V4, Family::V6] {
            let max = IpAddress::max(family);
            let min = IpAddress::min(family);
            assert_eq!(max.saturating_add(1), max);
            assert_eq!(max.saturating_add(i64::MAX), max);
            assert_eq!(min.saturating_add(-1), min);
            assert_eq!(min.saturating_add(i64::MIN), min);
            assert_eq!(max.saturating_add_u128(u128::MAX), max);
        }
    }

    #[test]
    fn add_and_subtract() {
        let a: IpAddress = "10.0.0.255".parse().unwrap();
        assert_eq!(a.saturating_add(1), "10.0.1.0".parse().unwrap());
        assert_eq!(a.saturating_add(-256), "9.255.255.255".parse().unwrap());

        let b: IpAddress = "2001:db8::ffff".parse().unwrap();
        assert_eq!(b.saturating_add(1), "2001:db8::1:0".parse().unwrap());
    }

    #[test]
    fn bit_strings() {
        let a: IpAddress = "128.0.0.1".parse().unwrap();
        let bits = a.bit_string();
        assert_eq!(bits.len(), 32);
        assert!(bits.starts_with("10000000"));
        assert!(bits.ends_with("00000001"));
        assert_eq!(IpAddress::from_binary_string(&bits, Family::V4), Ok(a));

        let short = IpAddress::from_binary_string("00001010", Family::V4);
        assert_eq!(short, Ok("10.0.0.0".parse().unwrap()));

        let v6: IpAddress = "ffff::".parse().unwrap();
        assert_eq!(v6.binary_digits().len(), 128);
        assert!(IpAddress::from_binary_string("012", Family::V4).is_err());
        assert!(IpAddress::from_binary_string(&"1".repeat(33), Family::V4)
            .is_err());
    }

    #[test]
    fn octet_ordering() {
        let a: IpAddress = "9.255.255.255".parse().unwrap();
        let b: IpAddress = "10.0.0.0".parse().unwrap();
        assert!(a < b);
        assert_eq!(a.to_u128() + 1, b.to_u128());
        assert!(IpAddress::from_octets(&[1, 2, 3]).is_err());
    }

    #[test]
    fn truncation() {
        let a: IpAddress = "192.168.77.12".parse().unwrap();
        assert_eq!(a.truncate_to_len(16), "192.168.0.0".parse().unwrap());
        assert_eq!(a.truncate_to_len(0), IpAddress::min(Family::V4));
        assert_eq!(a.truncate_to_len(32), a);
    }
}
