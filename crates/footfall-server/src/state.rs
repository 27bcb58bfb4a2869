use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use footfall_core::{clock, config::Config, store::VisitorStore};

use crate::error::AppError;
use crate::rate_limit::{RateLimiter, SWEEP_INTERVAL};
use crate::reset;

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
///
/// Created once at process start. The rate-limit table lives here rather
/// than in a global so each test gets its own.
pub struct AppState {
    /// Visitor tables, either embedded DuckDB or the hosted database.
    pub store: Arc<dyn VisitorStore>,

    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,

    /// Per-(IP, endpoint) fixed-window limiter.
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(store: Arc<dyn VisitorStore>, config: Config) -> Self {
        let rate_limiter = RateLimiter::new(config.rate_limit_max, config.rate_limit_window());
        Self {
            store,
            config: Arc::new(config),
            rate_limiter,
        }
    }

    /// Count a request against the limiter.
    ///
    /// Returns the remaining budget, or `RateLimited` once the window is
    /// exhausted. Disabled limiting always reports the full budget.
    pub async fn enforce_rate_limit(&self, ip: &str, endpoint: &str) -> Result<u32, AppError> {
        if self.config.rate_limit_disable {
            return Ok(self.rate_limiter.max_requests());
        }
        let decision = self.rate_limiter.check(ip, endpoint).await;
        if !decision.allowed {
            warn!(ip, endpoint, "Rate limit exceeded");
            return Err(AppError::RateLimited {
                retry_after_seconds: self.rate_limiter.window().as_secs(),
            });
        }
        Ok(decision.remaining)
    }

    /// Background loop: drop expired rate-limit windows every five minutes.
    ///
    /// Expired entries are also replaced lazily on access; this only bounds
    /// memory for clients that never come back.
    pub async fn run_rate_limit_sweep_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.rate_limiter.sweep().await;
        }
    }

    /// Background loop: run the daily reset at every IST midnight.
    ///
    /// Only spawned when `FOOTFALL_RESET_SCHEDULE=internal`; otherwise an
    /// outside scheduler calls the cron endpoint.
    pub async fn run_daily_reset_loop(self: Arc<Self>) {
        loop {
            let wait = clock::until_next_midnight(Utc::now());
            info!(secs = wait.as_secs(), "Next daily reset scheduled");
            tokio::time::sleep(wait).await;
            reset::run_daily_reset(self.store.as_ref(), Utc::now(), self.config.retention_days)
                .await;
        }
    }
}
