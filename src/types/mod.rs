pub(crate) mod af;
pub(crate) mod codec;
pub(crate) mod ip_address;
pub(crate) mod registry;
pub(crate) mod route_entry;

pub use af::Family;
pub use ip_address::IpAddress;
pub use registry::{AsRecord, AsTable, CountryRecord, CountryTable};
pub use route_entry::{parse_as_path, parse_prefix, RouteEntry};

pub mod errors;
pub mod stats;
