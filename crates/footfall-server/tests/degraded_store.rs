//! Store failures in the middle of a flow: logged, never leaked, and only
//! fatal where today's stats cannot be produced at all.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, NaiveDate, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use footfall_core::clock;
use footfall_core::config::{AppMode, Config, ResetSchedule};
use footfall_core::store::{TableCounts, VisitorStore};
use footfall_core::visitor::{VisitorIp, VisitorLog, VisitorStat};
use footfall_duckdb::DuckDbBackend;
use footfall_server::app::build_app;
use footfall_server::state::AppState;

/// DuckDB store whose listed operations always fail.
struct FlakyStore {
    inner: Arc<DuckDbBackend>,
    failing: HashSet<&'static str>,
}

impl FlakyStore {
    fn check(&self, op: &'static str) -> Result<()> {
        if self.failing.contains(op) {
            return Err(anyhow!("{op}: connection reset by peer (db.internal:5432)"));
        }
        Ok(())
    }
}

#[async_trait]
impl VisitorStore for FlakyStore {
    async fn ping(&self) -> Result<()> {
        self.check("ping")?;
        self.inner.ping().await
    }

    async fn find_visitor_ip(&self, ip: &str, date: NaiveDate) -> Result<Option<VisitorIp>> {
        self.check("find_visitor_ip")?;
        self.inner.find_visitor_ip(ip, date).await
    }

    async fn insert_visitor_ip(&self, ip: &str, date: NaiveDate, at: DateTime<Utc>) -> Result<bool> {
        self.check("insert_visitor_ip")?;
        self.inner.insert_visitor_ip(ip, date, at).await
    }

    async fn touch_visitor_ip(&self, ip: &str, date: NaiveDate, at: DateTime<Utc>) -> Result<()> {
        self.check("touch_visitor_ip")?;
        self.inner.touch_visitor_ip(ip, date, at).await
    }

    async fn insert_log(&self, log: &VisitorLog, at: DateTime<Utc>) -> Result<()> {
        self.check("insert_log")?;
        self.inner.insert_log(log, at).await
    }

    async fn count_logs(&self) -> Result<i64> {
        self.check("count_logs")?;
        self.inner.count_logs().await
    }

    async fn count_visitor_ips(&self, date: NaiveDate) -> Result<i64> {
        self.check("count_visitor_ips")?;
        self.inner.count_visitor_ips(date).await
    }

    async fn get_stat(&self, date: NaiveDate) -> Result<Option<VisitorStat>> {
        self.check("get_stat")?;
        self.inner.get_stat(date).await
    }

    async fn insert_stat(&self, stat: &VisitorStat) -> Result<bool> {
        self.check("insert_stat")?;
        self.inner.insert_stat(stat).await
    }

    async fn bump_stat(
        &self,
        date: NaiveDate,
        total_delta: i64,
        unique_delta: i64,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.check("bump_stat")?;
        self.inner.bump_stat(date, total_delta, unique_delta, at).await
    }

    async fn set_unique_visits(&self, date: NaiveDate, unique: i64, at: DateTime<Utc>) -> Result<()> {
        self.check("set_unique_visits")?;
        self.inner.set_unique_visits(date, unique, at).await
    }

    async fn upsert_stat(&self, stat: &VisitorStat) -> Result<()> {
        self.check("upsert_stat")?;
        self.inner.upsert_stat(stat).await
    }

    async fn purge_visitor_ips_before(&self, cutoff: NaiveDate) -> Result<i64> {
        self.check("purge_visitor_ips_before")?;
        self.inner.purge_visitor_ips_before(cutoff).await
    }

    async fn table_counts(&self) -> Result<TableCounts> {
        self.check("table_counts")?;
        self.inner.table_counts().await
    }
}

fn test_config() -> Config {
    Config {
        port: 0,
        data_dir: "/tmp/footfall-test".to_string(),
        database_url: None,
        database_key: None,
        cron_secret: Some("test-cron-secret".to_string()),
        trust_proxy: true,
        allowed_origins: vec![],
        mode: AppMode::Production,
        rate_limit_max: 30,
        rate_limit_window_secs: 60,
        rate_limit_disable: true,
        retention_days: 30,
        reset_schedule: ResetSchedule::External,
        duckdb_memory_limit: "256MB".to_string(),
    }
}

fn setup(failing: &[&'static str]) -> (Arc<DuckDbBackend>, axum::Router) {
    let inner = Arc::new(DuckDbBackend::open_in_memory().expect("in-memory DuckDB"));
    let store = FlakyStore {
        inner: inner.clone(),
        failing: failing.iter().copied().collect(),
    };
    let state = Arc::new(AppState::new(Arc::new(store), test_config()));
    (inner, build_app(state))
}

fn track_request(ip: &str) -> Request<Body> {
    Request::builder()
        .uri("/api/visitors")
        .header("x-forwarded-for", ip)
        .body(Body::empty())
        .expect("request")
}

async fn body_text(response: axum::http::Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8")
}

async fn seed_today(db: &DuckDbBackend, total: i64, unique: i64) {
    let stat = VisitorStat {
        date: clock::today(),
        total_visits_all_time: total,
        unique_visits_today: unique,
        updated_at: Utc::now(),
    };
    db.insert_stat(&stat).await.expect("seed stat");
}

#[tokio::test]
async fn test_failed_log_insert_still_returns_stats() {
    let (db, app) = setup(&["insert_log"]);
    seed_today(&db, 10, 2).await;

    let response = app.oneshot(track_request("203.0.113.5")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).expect("json");
    assert_eq!(body["isNewVisitorToday"], true);
    assert_eq!(body["totalVisits"], 11);
    assert_eq!(db.count_logs().await.expect("count"), 0);
}

#[tokio::test]
async fn test_failed_ip_lookup_counts_visitor_as_returning() {
    let (db, app) = setup(&["find_visitor_ip"]);
    seed_today(&db, 10, 2).await;

    let response = app.oneshot(track_request("203.0.113.5")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).expect("json");
    assert_eq!(body["isNewVisitorToday"], false);
    assert_eq!(body["uniqueVisitsToday"], 2);
}

#[tokio::test]
async fn test_failed_bump_still_reports_incremented_counts() {
    let (db, app) = setup(&["bump_stat"]);
    seed_today(&db, 10, 2).await;

    let response = app.oneshot(track_request("203.0.113.5")).await.expect("response");
    let body: Value = serde_json::from_str(&body_text(response).await).expect("json");
    assert_eq!(body["totalVisits"], 11);
    assert_eq!(body["uniqueVisitsToday"], 3);

    let stat = db.get_stat(clock::today()).await.expect("read").expect("row");
    assert_eq!(stat.unique_visits_today, 2);
}

#[tokio::test]
async fn test_failed_count_serves_degraded_stats_without_persisting() {
    let (db, app) = setup(&["count_logs"]);

    let response = app.oneshot(track_request("203.0.113.5")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).expect("json");
    assert_eq!(body["totalVisits"], 0);
    assert_eq!(body["uniqueVisitsToday"], 1);
    assert!(db.get_stat(clock::today()).await.expect("read").is_none());
}

#[tokio::test]
async fn test_failed_stat_creation_is_a_generic_500() {
    let (_db, app) = setup(&["get_stat", "insert_stat"]);

    let response = app.oneshot(track_request("203.0.113.5")).await.expect("response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = body_text(response).await;
    assert!(text.contains("Internal server error"));
    assert!(!text.contains("connection reset"));
    assert!(!text.contains("db.internal"));
}

#[tokio::test]
async fn test_reset_reports_failed_steps_and_keeps_today_row() {
    let (db, app) = setup(&["count_logs"]);
    seed_today(&db, 75, 4).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/cron/reset-daily")
        .header("authorization", "Bearer test-cron-secret")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_str(&body_text(response).await).expect("json");
    assert_eq!(body["success"], false);
    let failed: Vec<&str> = body["data"]["failedSteps"]
        .as_array()
        .expect("failedSteps array")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(failed, vec!["count_total_visits", "upsert_today_stats"]);

    let stat = db.get_stat(clock::today()).await.expect("read").expect("row");
    assert_eq!(stat.total_visits_all_time, 75);
    assert_eq!(stat.unique_visits_today, 4);
}

#[tokio::test]
async fn test_health_degraded_when_store_unreachable() {
    let (_db, app) = setup(&["ping"]);

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = serde_json::from_str(&body_text(response).await).expect("json");
    assert_eq!(body["status"], "degraded");
}
