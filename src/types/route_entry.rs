use std::cmp::Ordering;
use std::fmt;

use inetnum::addr::Prefix;
use inetnum::asn::Asn;

use crate::types::af::Family;
use crate::types::codec::{Reader, Writer};
use crate::types::errors::RouteTableError;
use crate::types::ip_address::IpAddress;

//------------ RouteEntry ----------------------------------------------------

/// An announced prefix together with the AS path it was announced with.
///
/// Two entries are the same entry if they have the same address and prefix
/// length, the AS path does not take part in equality or hashing. The
/// address is always truncated to the prefix length.
#[derive(Clone)]
pub struct RouteEntry {
    address: IpAddress,
    prefix_len: u8,
    as_path: Vec<u32>,
    origin_as: u32,
    hash: i32,
}

impl RouteEntry {
    /// Creates a new entry. Host bits in `address` are cleared, the origin
    /// AS is the last AS in the path, or 0 for an empty path.
    pub fn new(
        address: IpAddress,
        prefix_len: u8,
        as_path: Vec<u32>,
    ) -> Result<Self, RouteTableError> {
        let family = address.family();
        if prefix_len > family.bits() {
            return Err(RouteTableError::RangeError(format!(
                "prefix length {} exceeds {} for {}",
                prefix_len,
                family.bits(),
                family
            )));
        }
        let address = address.truncate_to_len(prefix_len);
        let origin_as = as_path.last().copied().unwrap_or(0);
        Ok(Self {
            hash: Self::compute_hash(&address, prefix_len),
            address,
            prefix_len,
            as_path,
            origin_as,
        })
    }

    /// Parses a prefix in `addr/len` notation and a whitespace separated AS
    /// path.
    pub fn parse(prefix: &str, as_path: &str) -> Result<Self, RouteTableError> {
        let (address, prefix_len) = parse_prefix(prefix)?;
        Self::new(address, prefix_len, parse_as_path(as_path)?)
    }

    // XOR of the first four 32-bit big-endian words of the address (one word
    // for IPv4) and the prefix length.
    fn compute_hash(address: &IpAddress, prefix_len: u8) -> i32 {
        address
            .octets()
            .chunks_exact(4)
            .take(4)
            .filter_map(|w| <[u8; 4]>::try_from(w).ok())
            .fold(i32::from(prefix_len), |acc, w| acc ^ i32::from_be_bytes(w))
    }

    pub fn address(&self) -> IpAddress {
        self.address
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn as_path(&self) -> &[u32] {
        &self.as_path
    }

    pub fn origin_as(&self) -> u32 {
        self.origin_as
    }

    pub fn origin_asn(&self) -> Asn {
        Asn::from_u32(self.origin_as)
    }

    pub fn hash_value(&self) -> i32 {
        self.hash
    }

    pub fn family(&self) -> Family {
        self.address.family()
    }

    pub fn prefix(&self) -> Result<Prefix, RouteTableError> {
        Prefix::new(self.address.into(), self.prefix_len).map_err(|e| {
            RouteTableError::ParseError(format!("invalid prefix: {}", e))
        })
    }

    /// The leading `prefix_len` bits of the address, one byte per bit. This
    /// is the key of the entry in the trie.
    pub fn binary_digits(&self) -> Vec<u8> {
        let mut digits = self.address.binary_digits();
        digits.truncate(self.prefix_len as usize);
        digits
    }

    /// The leading `prefix_len` bits of the address as '0' and '1'
    /// characters.
    pub fn binary_digit_string(&self) -> String {
        let mut bits = self.address.bit_string();
        bits.truncate(self.prefix_len as usize);
        bits
    }

    /// Whether `target` lies inside this prefix.
    pub fn contains(&self, target: &IpAddress) -> bool {
        target.family() == self.family()
            && target.truncate_to_len(self.prefix_len) == self.address
    }

    /// The last address covered by this prefix.
    pub fn last_address(&self) -> IpAddress {
        let family = self.family();
        IpAddress::from_u128(
            self.address.to_u128() | family.host_mask(self.prefix_len),
            family,
        )
    }

    /// The number of addresses in this prefix, saturated at `u128::MAX`
    /// for an IPv6 `/0`.
    pub fn size(&self) -> u128 {
        self.family()
            .host_mask(self.prefix_len)
            .saturating_add(1)
    }

    /// The number of addresses this prefix counts for in statistics. IPv6
    /// is counted in /64 units, so anything more specific than a /64 counts
    /// for nothing.
    pub fn address_count(&self) -> u128 {
        match self.family() {
            Family::V4 => self.size(),
            Family::V6 => {
                if self.prefix_len > 64 {
                    0
                } else {
                    1_u128 << (64 - self.prefix_len)
                }
            }
        }
    }

    /// Orders by raw address octets only, ignoring the prefix length.
    pub fn cmp_address(&self, other: &Self) -> Ordering {
        self.address.cmp(&other.address)
    }

    //-------- Binary form ---------------------------------------------------

    pub(crate) fn write(
        &self,
        w: &mut Writer,
    ) -> Result<(), RouteTableError> {
        w.put_address(&self.address);
        w.put_i32(i32::from(self.prefix_len));
        w.put_len(self.as_path.len())?;
        for asn in &self.as_path {
            w.put_u32(*asn);
        }
        w.put_u32(self.origin_as);
        w.put_i32(self.hash);
        Ok(())
    }

    pub(crate) fn read(
        r: &mut Reader,
        family: Family,
    ) -> Result<Self, RouteTableError> {
        let address = r.get_address(family)?;
        let prefix_len = r.get_i32()?;
        let prefix_len = u8::try_from(prefix_len)
            .ok()
            .filter(|l| *l <= family.bits())
            .ok_or_else(|| {
                RouteTableError::RangeError(format!(
                    "prefix length {} for {}",
                    prefix_len, family
                ))
            })?;
        let count = r.get_len()?;
        if count.saturating_mul(4) > r.remaining() {
            return Err(RouteTableError::TruncatedData {
                wanted: count.saturating_mul(4),
                available: r.remaining(),
            });
        }
        let as_path = (0..count)
            .map(|_| r.get_u32())
            .collect::<Result<Vec<_>, _>>()?;
        let origin_as = r.get_u32()?;
        let hash = r.get_i32()?;

        let entry = Self::new(address, prefix_len, as_path)?;
        if entry.address != address
            || entry.origin_as != origin_as
            || entry.hash != hash
        {
            return Err(RouteTableError::ParseError(format!(
                "inconsistent entry for {}/{}",
                address, prefix_len
            )));
        }
        Ok(entry)
    }

    /// Serializes this single entry.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RouteTableError> {
        let mut w = Writer::new();
        self.write(&mut w)?;
        Ok(w.into_bytes())
    }

    /// Deserializes a single entry of `family`, the whole of `bytes` has to
    /// be consumed.
    pub fn from_bytes(
        bytes: &[u8],
        family: Family,
    ) -> Result<Self, RouteTableError> {
        let mut r = Reader::new(bytes);
        let entry = Self::read(&mut r, family)?;
        if r.remaining() != 0 {
            return Err(RouteTableError::ParseError(format!(
                "{} trailing bytes after entry",
                r.remaining()
            )));
        }
        Ok(entry)
    }
}

impl PartialEq for RouteEntry {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address && self.prefix_len == other.prefix_len
    }
}

impl Eq for RouteEntry {}

impl std::hash::Hash for RouteEntry {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_i32(self.hash);
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} AS{}", self.address, self.prefix_len, self.origin_as)
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} path {:?}", self.address, self.prefix_len, self.as_path)
    }
}

//------------ Parsing -------------------------------------------------------

/// Parses `addr/len`, a missing length means a host prefix.
pub fn parse_prefix(s: &str) -> Result<(IpAddress, u8), RouteTableError> {
    let s = s.trim();
    let (addr, len) = match s.split_once('/') {
        Some((addr, len)) => (addr, Some(len)),
        None => (s, None),
    };
    let address: IpAddress = addr.parse()?;
    let prefix_len = match len {
        Some(len) => len.trim().parse::<u8>().map_err(|e| {
            RouteTableError::ParseError(format!(
                "prefix length '{}': {}",
                len, e
            ))
        })?,
        None => address.family().bits(),
    };
    if prefix_len > address.family().bits() {
        return Err(RouteTableError::RangeError(format!(
            "prefix length {} in '{}'",
            prefix_len, s
        )));
    }
    Ok((address, prefix_len))
}

/// Parses a whitespace separated list of AS numbers.
pub fn parse_as_path(s: &str) -> Result<Vec<u32>, RouteTableError> {
    s.split_whitespace()
        .map(|asn| {
            asn.parse::<u32>().map_err(|e| {
                RouteTableError::ParseError(format!("AS number '{}': {}", asn, e))
            })
        })
        .collect()
}
