pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod ip;
pub mod sanitize;
pub mod store;
pub mod visitor;
