use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use footfall_core::visitor::VisitorStats;

use crate::error::ClientError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Snapshot published to subscribers after every fetch.
///
/// A failed fetch keeps the last good `stats` and sets `error`.
#[derive(Debug, Clone, PartialEq)]
pub struct PollState {
    pub stats: Option<VisitorStats>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for PollState {
    fn default() -> Self {
        Self {
            stats: None,
            loading: true,
            error: None,
        }
    }
}

pub struct StatsPoller {
    client: Client,
    endpoint: String,
    page_path: String,
    interval: Duration,
    state: watch::Sender<PollState>,
}

impl StatsPoller {
    /// `base_url` is the server root, e.g. `https://example.com`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        let (state, _) = watch::channel(PollState::default());
        Ok(Self {
            client,
            endpoint: format!("{}/api/visitors", base_url.trim_end_matches('/')),
            page_path: "/".to_string(),
            interval: DEFAULT_POLL_INTERVAL,
            state,
        })
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Page path reported with the initial visit.
    pub fn with_page_path(mut self, path: impl Into<String>) -> Self {
        self.page_path = path.into();
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.subscribe()
    }

    /// Current snapshot without waiting for a change.
    pub fn state(&self) -> PollState {
        self.state.borrow().clone()
    }

    /// `GET /api/visitors`: records a visit and returns the stats.
    pub async fn track(&self) -> Result<VisitorStats, ClientError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("path", self.page_path.as_str())])
            .send()
            .await?;
        Self::decode(resp).await
    }

    /// `POST /api/visitors {"action":"get-stats"}`: stats without a visit.
    pub async fn fetch_stats(&self) -> Result<VisitorStats, ClientError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "action": "get-stats" }))
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn decode(resp: reqwest::Response) -> Result<VisitorStats, ClientError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        Ok(resp.json().await?)
    }

    /// Fetch stats now and publish the result.
    pub async fn refetch(&self) {
        let result = self.fetch_stats().await;
        self.publish(result);
    }

    fn publish(&self, result: Result<VisitorStats, ClientError>) {
        self.state.send_modify(|state| {
            state.loading = false;
            match result {
                Ok(stats) => {
                    state.stats = Some(stats);
                    state.error = None;
                }
                Err(e) => {
                    warn!(error = %e, "Visitor stats fetch failed");
                    state.error = Some(e.to_string());
                }
            }
        });
    }

    /// Start polling in the background: one tracked visit, then a refetch
    /// every interval. Failures are retried on the next tick without backoff.
    ///
    /// Polling stops when the returned handle is dropped.
    pub fn spawn(self: Arc<Self>) -> PollHandle {
        let task = tokio::spawn(async move {
            let first = self.track().await;
            self.publish(first);

            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                debug!("Polling visitor stats");
                self.refetch().await;
            }
        });
        PollHandle { task }
    }
}

/// Owns the polling task; dropping it aborts the task.
pub struct PollHandle {
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
