pub mod app;
pub mod error;
pub mod rate_limit;
pub mod reset;
pub mod routes;
pub mod security;
pub mod state;
pub mod tracking;

#[cfg(feature = "remote")]
pub mod remote;
