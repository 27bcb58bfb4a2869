//! Hosted-database store, enabled with the `remote` feature.

mod postgrest;

pub use postgrest::PostgrestStore;
