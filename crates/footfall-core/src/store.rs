//! Storage abstraction for the three visitor tables.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::visitor::{VisitorIp, VisitorLog, VisitorStat};

/// Row counts of every table, used by the `verify` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub visitor_logs: i64,
    pub visitor_ips: i64,
    pub visitor_stats: i64,
}

/// Persistence for visits, logs and daily stats.
///
/// Implementations are shared across handlers behind an `Arc<dyn VisitorStore>`.
/// None of the methods are transactional with each other; callers decide how
/// to degrade when one of them fails.
#[async_trait]
pub trait VisitorStore: Send + Sync + 'static {
    /// Cheap reachability check for `/health`.
    async fn ping(&self) -> Result<()>;

    async fn find_visitor_ip(&self, ip: &str, date: NaiveDate) -> Result<Option<VisitorIp>>;

    /// Insert the first visit of `date` for `ip` with `visit_count = 1`.
    ///
    /// Returns `false` when a row for (ip, date) already exists.
    async fn insert_visitor_ip(&self, ip: &str, date: NaiveDate, at: DateTime<Utc>)
        -> Result<bool>;

    /// Record a repeat visit: bump `visit_count` and set `last_visit_at`.
    async fn touch_visitor_ip(&self, ip: &str, date: NaiveDate, at: DateTime<Utc>) -> Result<()>;

    async fn insert_log(&self, log: &VisitorLog, at: DateTime<Utc>) -> Result<()>;

    async fn count_logs(&self) -> Result<i64>;

    /// Number of distinct IPs seen on `date`.
    async fn count_visitor_ips(&self, date: NaiveDate) -> Result<i64>;

    async fn get_stat(&self, date: NaiveDate) -> Result<Option<VisitorStat>>;

    /// Create the stat row for `stat.date`. Returns `false` if it already exists.
    async fn insert_stat(&self, stat: &VisitorStat) -> Result<bool>;

    /// Add the deltas to an existing stat row. A missing row is not an error.
    async fn bump_stat(
        &self,
        date: NaiveDate,
        total_delta: i64,
        unique_delta: i64,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Overwrite `unique_visits_today` on an existing row only.
    async fn set_unique_visits(&self, date: NaiveDate, unique: i64, at: DateTime<Utc>)
        -> Result<()>;

    /// Insert or replace the stat row keyed by `stat.date`.
    async fn upsert_stat(&self, stat: &VisitorStat) -> Result<()>;

    /// Delete per-IP rows with `visit_date < cutoff`; returns rows removed.
    async fn purge_visitor_ips_before(&self, cutoff: NaiveDate) -> Result<i64>;

    async fn table_counts(&self) -> Result<TableCounts>;
}
