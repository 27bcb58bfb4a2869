//! Polling client for the visitor endpoint.
//!
//! [`StatsPoller`] records one visit when started, then refreshes the day's
//! stats on a fixed interval and publishes every result through a
//! `tokio::sync::watch` channel.

pub mod error;
pub mod poller;

pub use error::ClientError;
pub use poller::{PollHandle, PollState, StatsPoller, DEFAULT_POLL_INTERVAL};
