//------------ Wire codec ----------------------------------------------------
//
// Every numeric field in the binary formats of this crate is a big-endian
// (network order) i32. Variable length fields are preceded by their length
// as such an i32. Addresses are written as their raw 4 or 16 octets, the
// family being fixed by the table header.

use zerocopy::byteorder::{NetworkEndian, I32};
use zerocopy::{FromBytes, IntoBytes};

use crate::types::af::Family;
use crate::types::errors::RouteTableError;
use crate::types::ip_address::IpAddress;

/// Appends fields to a growing byte buffer.
#[derive(Debug, Default)]
pub(crate) struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn put_i32(&mut self, value: i32) {
        self.buf
            .extend_from_slice(I32::<NetworkEndian>::new(value).as_bytes());
    }

    /// Writes a length or count. Lengths in this crate are bounded by the
    /// number of entries in memory, anything beyond `i32::MAX` is refused.
    pub(crate) fn put_len(&mut self, len: usize) -> Result<(), RouteTableError> {
        let len = i32::try_from(len).map_err(|_| {
            RouteTableError::RangeError(format!(
                "length {} does not fit the wire format",
                len
            ))
        })?;
        self.put_i32(len);
        Ok(())
    }

    pub(crate) fn put_u32(&mut self, value: u32) {
        // ASNs are written as the i32 with the same bit pattern.
        self.put_i32(value as i32);
    }

    pub(crate) fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub(crate) fn put_address(&mut self, addr: &IpAddress) {
        self.put_bytes(addr.octets());
    }

    pub(crate) fn put_str(&mut self, s: &str) -> Result<(), RouteTableError> {
        self.put_len(s.len())?;
        self.put_bytes(s.as_bytes());
        Ok(())
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Consumes fields from the front of a byte slice.
#[derive(Debug)]
pub(crate) struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn get_i32(&mut self) -> Result<i32, RouteTableError> {
        let (value, rest) = I32::<NetworkEndian>::read_from_prefix(
            self.bytes,
        )
        .map_err(|_| RouteTableError::TruncatedData {
            wanted: 4,
            available: self.bytes.len(),
        })?;
        self.bytes = rest;
        Ok(value.get())
    }

    pub(crate) fn get_u32(&mut self) -> Result<u32, RouteTableError> {
        self.get_i32().map(|v| v as u32)
    }

    /// Reads a length or count field, refusing negative values.
    pub(crate) fn get_len(&mut self) -> Result<usize, RouteTableError> {
        let len = self.get_i32()?;
        usize::try_from(len).map_err(|_| {
            RouteTableError::RangeError(format!("negative length {}", len))
        })
    }

    pub(crate) fn get_bytes(
        &mut self,
        len: usize,
    ) -> Result<&'a [u8], RouteTableError> {
        if len > self.bytes.len() {
            return Err(RouteTableError::TruncatedData {
                wanted: len,
                available: self.bytes.len(),
            });
        }
        let (head, rest) = self.bytes.split_at(len);
        self.bytes = rest;
        Ok(head)
    }

    pub(crate) fn get_address(
        &mut self,
        family: Family,
    ) -> Result<IpAddress, RouteTableError> {
        IpAddress::from_octets(self.get_bytes(family.octets())?)
    }

    pub(crate) fn get_string(&mut self) -> Result<String, RouteTableError> {
        let len = self.get_len()?;
        let bytes = self.get_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| {
            RouteTableError::ParseError(format!("invalid utf-8: {}", e))
        })
    }
}
