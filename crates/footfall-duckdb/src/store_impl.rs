use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use footfall_core::store::{TableCounts, VisitorStore};
use footfall_core::visitor::{VisitorIp, VisitorLog, VisitorStat};

use crate::DuckDbBackend;

#[async_trait]
impl VisitorStore for DuckDbBackend {
    async fn ping(&self) -> anyhow::Result<()> {
        DuckDbBackend::ping(self).await
    }

    async fn find_visitor_ip(
        &self,
        ip: &str,
        date: NaiveDate,
    ) -> anyhow::Result<Option<VisitorIp>> {
        DuckDbBackend::find_visitor_ip(self, ip, date).await
    }

    async fn insert_visitor_ip(
        &self,
        ip: &str,
        date: NaiveDate,
        at: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        DuckDbBackend::insert_visitor_ip(self, ip, date, at).await
    }

    async fn touch_visitor_ip(
        &self,
        ip: &str,
        date: NaiveDate,
        at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        DuckDbBackend::touch_visitor_ip(self, ip, date, at).await
    }

    async fn insert_log(&self, log: &VisitorLog, at: DateTime<Utc>) -> anyhow::Result<()> {
        DuckDbBackend::insert_log(self, log, at).await
    }

    async fn count_logs(&self) -> anyhow::Result<i64> {
        DuckDbBackend::count_logs(self).await
    }

    async fn count_visitor_ips(&self, date: NaiveDate) -> anyhow::Result<i64> {
        DuckDbBackend::count_visitor_ips(self, date).await
    }

    async fn get_stat(&self, date: NaiveDate) -> anyhow::Result<Option<VisitorStat>> {
        DuckDbBackend::get_stat(self, date).await
    }

    async fn insert_stat(&self, stat: &VisitorStat) -> anyhow::Result<bool> {
        DuckDbBackend::insert_stat(self, stat).await
    }

    async fn bump_stat(
        &self,
        date: NaiveDate,
        total_delta: i64,
        unique_delta: i64,
        at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        DuckDbBackend::bump_stat(self, date, total_delta, unique_delta, at).await
    }

    async fn set_unique_visits(
        &self,
        date: NaiveDate,
        unique: i64,
        at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        DuckDbBackend::set_unique_visits(self, date, unique, at).await
    }

    async fn upsert_stat(&self, stat: &VisitorStat) -> anyhow::Result<()> {
        DuckDbBackend::upsert_stat(self, stat).await
    }

    async fn purge_visitor_ips_before(&self, cutoff: NaiveDate) -> anyhow::Result<i64> {
        DuckDbBackend::purge_visitor_ips_before(self, cutoff).await
    }

    async fn table_counts(&self) -> anyhow::Result<TableCounts> {
        DuckDbBackend::table_counts(self).await
    }
}
