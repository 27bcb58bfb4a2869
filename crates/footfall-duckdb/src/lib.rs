pub mod backend;
pub mod schema;
pub mod store_impl;
pub mod visitors;

pub use backend::DuckDbBackend;

/// Re-export the `duckdb` crate so tests can use
/// `footfall_duckdb::duckdb::params!` without an extra dependency.
pub use duckdb;
