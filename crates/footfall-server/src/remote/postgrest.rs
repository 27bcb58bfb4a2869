use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use footfall_core::store::{TableCounts, VisitorStore};
use footfall_core::visitor::{VisitorIp, VisitorLog, VisitorStat};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// [`VisitorStore`] over a PostgREST endpoint (`{url}/rest/v1/<table>`).
///
/// Filters are passed as `column=op.value` query pairs so values are
/// URL-encoded by the client, never spliced into a path. Unique-key conflicts
/// come back as `409`. `touch_visitor_ip` and `bump_stat` read and then
/// `PATCH`, so concurrent increments on the same row can be lost.
#[derive(Clone)]
pub struct PostgrestStore {
    client: Client,
    base: String,
    key: String,
}

impl PostgrestStore {
    pub fn new(url: &str, key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base: format!("{}/rest/v1", url.trim_end_matches('/')),
            key: key.to_string(),
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.base, table))
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let resp = request
            .send()
            .await
            .with_context(|| format!("PostgREST request failed: {what}"))?;
        Ok(resp)
    }

    async fn expect_success(resp: Response, what: &str) -> Result<Response> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("PostgREST error {status} ({what}): {body}");
        }
        Ok(resp)
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, filters: &[(&str, String)]) -> Result<Vec<T>> {
        let request = self
            .request(Method::GET, table)
            .query(&[("select", "*")])
            .query(filters);
        let resp = self.send(request, table).await?;
        let resp = Self::expect_success(resp, table).await?;
        resp.json()
            .await
            .with_context(|| format!("PostgREST response parse failed: {table}"))
    }

    /// Exact row count via `Prefer: count=exact`, read from `Content-Range`.
    async fn count(&self, table: &str, filters: &[(&str, String)]) -> Result<i64> {
        let request = self
            .request(Method::GET, table)
            .query(&[("select", "*"), ("limit", "1")])
            .query(filters)
            .header("Prefer", "count=exact");
        let resp = self.send(request, table).await?;
        let resp = Self::expect_success(resp, table).await?;
        content_range_total(&resp)
            .with_context(|| format!("PostgREST count missing Content-Range: {table}"))
    }

    /// Insert one row; `Ok(false)` when a unique constraint rejected it.
    async fn insert(&self, table: &str, row: serde_json::Value) -> Result<bool> {
        let request = self
            .request(Method::POST, table)
            .header("Prefer", "return=minimal")
            .json(&row);
        let resp = self.send(request, table).await?;
        if resp.status() == StatusCode::CONFLICT {
            return Ok(false);
        }
        Self::expect_success(resp, table).await?;
        Ok(true)
    }

    async fn patch(&self, table: &str, filters: &[(&str, String)], body: serde_json::Value) -> Result<()> {
        let request = self
            .request(Method::PATCH, table)
            .query(filters)
            .header("Prefer", "return=minimal")
            .json(&body);
        let resp = self.send(request, table).await?;
        Self::expect_success(resp, table).await?;
        Ok(())
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

fn content_range_total(resp: &Response) -> Option<i64> {
    resp.headers()
        .get("content-range")
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_range_total)
}

/// Total from a PostgREST `Content-Range` value such as `0-24/3573` or `*/0`.
fn parse_content_range_total(value: &str) -> Option<i64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}

#[async_trait]
impl VisitorStore for PostgrestStore {
    async fn ping(&self) -> Result<()> {
        let request = self
            .request(Method::GET, "visitor_stats")
            .query(&[("select", "date"), ("limit", "1")]);
        let resp = self.send(request, "ping").await?;
        Self::expect_success(resp, "ping").await?;
        Ok(())
    }

    async fn find_visitor_ip(&self, ip: &str, date: NaiveDate) -> Result<Option<VisitorIp>> {
        let rows: Vec<VisitorIp> = self
            .select(
                "visitor_ips",
                &[("ip_address", eq(ip)), ("visit_date", eq(date))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_visitor_ip(&self, ip: &str, date: NaiveDate, at: DateTime<Utc>) -> Result<bool> {
        self.insert(
            "visitor_ips",
            json!({
                "ip_address": ip,
                "visit_date": date,
                "first_visit_at": at,
                "last_visit_at": at,
                "visit_count": 1,
            }),
        )
        .await
    }

    async fn touch_visitor_ip(&self, ip: &str, date: NaiveDate, at: DateTime<Utc>) -> Result<()> {
        let Some(row) = self.find_visitor_ip(ip, date).await? else {
            return Ok(());
        };
        self.patch(
            "visitor_ips",
            &[("ip_address", eq(ip)), ("visit_date", eq(date))],
            json!({
                "last_visit_at": at,
                "visit_count": row.visit_count + 1,
            }),
        )
        .await
    }

    async fn insert_log(&self, log: &VisitorLog, at: DateTime<Utc>) -> Result<()> {
        self.insert(
            "visitor_logs",
            json!({
                "ip_address": log.ip_address,
                "user_agent": log.user_agent,
                "referer": log.referer,
                "page_path": log.page_path,
                "created_at": at,
            }),
        )
        .await?;
        Ok(())
    }

    async fn count_logs(&self) -> Result<i64> {
        self.count("visitor_logs", &[]).await
    }

    async fn count_visitor_ips(&self, date: NaiveDate) -> Result<i64> {
        self.count("visitor_ips", &[("visit_date", eq(date))]).await
    }

    async fn get_stat(&self, date: NaiveDate) -> Result<Option<VisitorStat>> {
        let rows: Vec<VisitorStat> = self.select("visitor_stats", &[("date", eq(date))]).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_stat(&self, stat: &VisitorStat) -> Result<bool> {
        self.insert("visitor_stats", serde_json::to_value(stat)?).await
    }

    async fn bump_stat(
        &self,
        date: NaiveDate,
        total_delta: i64,
        unique_delta: i64,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let Some(stat) = self.get_stat(date).await? else {
            return Ok(());
        };
        self.patch(
            "visitor_stats",
            &[("date", eq(date))],
            json!({
                "total_visits_all_time": (stat.total_visits_all_time + total_delta).max(0),
                "unique_visits_today": (stat.unique_visits_today + unique_delta).max(0),
                "updated_at": at,
            }),
        )
        .await
    }

    async fn set_unique_visits(&self, date: NaiveDate, unique: i64, at: DateTime<Utc>) -> Result<()> {
        self.patch(
            "visitor_stats",
            &[("date", eq(date))],
            json!({
                "unique_visits_today": unique,
                "updated_at": at,
            }),
        )
        .await
    }

    async fn upsert_stat(&self, stat: &VisitorStat) -> Result<()> {
        let request = self
            .request(Method::POST, "visitor_stats")
            .query(&[("on_conflict", "date")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(stat);
        let resp = self.send(request, "visitor_stats upsert").await?;
        Self::expect_success(resp, "visitor_stats upsert").await?;
        Ok(())
    }

    async fn purge_visitor_ips_before(&self, cutoff: NaiveDate) -> Result<i64> {
        let request = self
            .request(Method::DELETE, "visitor_ips")
            .query(&[("visit_date", format!("lt.{cutoff}"))])
            .header("Prefer", "count=exact,return=minimal");
        let resp = self.send(request, "visitor_ips purge").await?;
        let resp = Self::expect_success(resp, "visitor_ips purge").await?;
        Ok(content_range_total(&resp).unwrap_or(0))
    }

    async fn table_counts(&self) -> Result<TableCounts> {
        Ok(TableCounts {
            visitor_logs: self.count("visitor_logs", &[]).await?,
            visitor_ips: self.count("visitor_ips", &[]).await?,
            visitor_stats: self.count("visitor_stats", &[]).await?,
        })
    }
}
