use crate::types::af::Family;
use crate::types::errors::RouteTableError;
use crate::types::ip_address::IpAddress;

//------------ Range to CIDR -------------------------------------------------

/// Compiles the inclusive range `[start, end]` into the smallest set of
/// CIDR blocks that together cover exactly that range, in ascending order.
///
/// The ends may be given in either order, but have to be of the same
/// family.
///
/// ```
/// use bgp_classify::IpAddress;
/// use bgp_classify::partition::compile_cidr_blocks;
///
/// let start: IpAddress = "192.168.0.0".parse().unwrap();
/// let end: IpAddress = "192.168.0.255".parse().unwrap();
/// let blocks = compile_cidr_blocks(&start, &end).unwrap();
/// assert_eq!(blocks, vec![(start, 24)]);
/// ```
pub fn compile_cidr_blocks(
    start: &IpAddress,
    end: &IpAddress,
) -> Result<Vec<(IpAddress, u8)>, RouteTableError> {
    let family = start.family();
    family.check(end.family())?;

    let (lo, hi) = if start <= end {
        (start.to_u128(), end.to_u128())
    } else {
        (end.to_u128(), start.to_u128())
    };

    let mut blocks = Vec::new();
    split(family, 0, 0, lo, hi, &mut blocks);
    Ok(blocks)
}

// `prefix` is the network address of a block of length `len` that holds
// all of `[lo, hi]`. If the block is exactly that range it is emitted,
// otherwise the range is split over the two halves of the block, capping
// each part at the edge of its half.
fn split(
    family: Family,
    prefix: u128,
    len: u8,
    lo: u128,
    hi: u128,
    out: &mut Vec<(IpAddress, u8)>,
) {
    let first = prefix;
    let last = prefix | family.host_mask(len);
    if (lo == first && hi == last) || len >= family.bits() {
        out.push((IpAddress::from_u128(prefix, family), len));
        return;
    }

    let bit = 1_u128 << (family.bits() - len - 1);
    let left = prefix;
    let right = prefix | bit;

    if lo & bit == 0 {
        let left_last = left | family.host_mask(len + 1);
        split(family, left, len + 1, lo, hi.min(left_last), out);
    }
    if hi & bit != 0 {
        split(family, right, len + 1, lo.max(right), hi, out);
    }
}
