pub mod config;
mod route_table;

pub use route_table::{RouteTable, DUMP_VERSION};
