//! Partitioning of the address space by owner, and compilation of address
//! ranges into CIDR blocks.
mod cidr;
mod space;

pub use cidr::compile_cidr_blocks;
pub use space::{
    Classification, PartitionMode, SpaceInterval, SpacePartition, TagMap,
    ValueSummary,
};
