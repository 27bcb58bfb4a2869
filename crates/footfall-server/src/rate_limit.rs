//! Fixed-window request counter keyed by `"ip:endpoint"`.
//!
//! The table is process-local: several server instances each keep their own.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::info;

/// How often the background sweep drops expired windows.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    count: u32,
    reset_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
}

pub struct RateLimiter {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
    max_requests: u32,
    window: Duration,
}

pub fn rate_limit_key(ip: &str, endpoint: &str) -> String {
    format!("{ip}:{endpoint}")
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_requests,
            window,
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Count one request for `(ip, endpoint)` and decide whether it may proceed.
    ///
    /// A window is `[start, start + window)`; the first request at or after
    /// its end opens a fresh one.
    pub async fn check(&self, ip: &str, endpoint: &str) -> RateLimitDecision {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        let key = rate_limit_key(ip, endpoint);

        if let Some(entry) = entries.get_mut(&key) {
            if now < entry.reset_at {
                if entry.count >= self.max_requests {
                    return RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                    };
                }
                entry.count += 1;
                return RateLimitDecision {
                    allowed: true,
                    remaining: self.max_requests.saturating_sub(entry.count),
                };
            }
        }

        // No entry, or its window has expired.
        entries.insert(
            key,
            RateLimitEntry {
                count: 1,
                reset_at: now + self.window,
            },
        );
        RateLimitDecision {
            allowed: true,
            remaining: self.max_requests.saturating_sub(1),
        }
    }

    /// Drop every expired window; returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| now < entry.reset_at);
        let removed = before - entries.len();
        if removed > 0 {
            info!(removed, remaining = entries.len(), "Rate limit table swept");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
