use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};

use footfall_core::store::VisitorStore;
use footfall_core::visitor::{VisitorLog, VisitorStat};
use footfall_duckdb::DuckDbBackend;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn store() -> Arc<dyn VisitorStore> {
    Arc::new(DuckDbBackend::open_in_memory().expect("in-memory DuckDB"))
}

fn log_for(ip: &str) -> VisitorLog {
    VisitorLog {
        ip_address: ip.to_string(),
        user_agent: "TestAgent/1.0".to_string(),
        referer: String::new(),
        page_path: "/".to_string(),
    }
}

#[tokio::test]
async fn test_first_insert_wins_and_repeat_reports_existing() {
    let store = store();
    let date = day(2024, 5, 1);
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 4, 0, 0).unwrap();

    assert!(store.insert_visitor_ip("203.0.113.5", date, at).await.expect("insert"));
    assert!(!store.insert_visitor_ip("203.0.113.5", date, at).await.expect("insert again"));

    // Same IP on another day is a separate row.
    assert!(store
        .insert_visitor_ip("203.0.113.5", day(2024, 5, 2), at)
        .await
        .expect("insert next day"));
    assert_eq!(store.count_visitor_ips(date).await.expect("count"), 1);
}

#[tokio::test]
async fn test_touch_updates_count_and_timestamp() {
    let store = store();
    let date = day(2024, 5, 1);
    let first = Utc.with_ymd_and_hms(2024, 5, 1, 4, 0, 0).unwrap();
    let later = first + Duration::minutes(10);

    store.insert_visitor_ip("198.51.100.1", date, first).await.expect("insert");
    store.touch_visitor_ip("198.51.100.1", date, later).await.expect("touch");

    let row = store
        .find_visitor_ip("198.51.100.1", date)
        .await
        .expect("find")
        .expect("row exists");
    assert_eq!(row.visit_count, 2);
    assert_eq!(row.first_visit_at, first);
    assert_eq!(row.last_visit_at, later);
}

#[tokio::test]
async fn test_find_missing_returns_none() {
    let store = store();
    let row = store.find_visitor_ip("10.0.0.1", day(2024, 5, 1)).await.expect("find");
    assert!(row.is_none());
}

#[tokio::test]
async fn test_logs_are_counted() {
    let store = store();
    let at = Utc::now();
    for ip in ["10.0.0.1", "10.0.0.1", "10.0.0.2"] {
        store.insert_log(&log_for(ip), at).await.expect("insert log");
    }
    assert_eq!(store.count_logs().await.expect("count"), 3);
}

#[tokio::test]
async fn test_log_values_stored_literally() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    let malicious = "'; DROP TABLE visitor_logs; --";
    let log = VisitorLog {
        page_path: malicious.to_string(),
        ..log_for("10.0.0.1")
    };
    db.insert_log(&log, Utc::now()).await.expect("insert log");

    let conn = db.conn_for_test().await;
    let stored: String = conn
        .prepare("SELECT page_path FROM visitor_logs LIMIT 1")
        .expect("prepare")
        .query_row([], |row| row.get(0))
        .expect("row");
    assert_eq!(stored, malicious);
}

#[tokio::test]
async fn test_stat_insert_is_idempotent_per_date() {
    let store = store();
    let stat = VisitorStat {
        date: day(2024, 5, 1),
        total_visits_all_time: 10,
        unique_visits_today: 3,
        updated_at: Utc::now(),
    };
    assert!(store.insert_stat(&stat).await.expect("insert"));

    let racing = VisitorStat {
        total_visits_all_time: 99,
        ..stat.clone()
    };
    assert!(!store.insert_stat(&racing).await.expect("second insert"));

    let stored = store.get_stat(stat.date).await.expect("get").expect("row");
    assert_eq!(stored.total_visits_all_time, 10);
    assert_eq!(stored.unique_visits_today, 3);
}

#[tokio::test]
async fn test_bump_and_set_unique() {
    let store = store();
    let date = day(2024, 5, 1);
    let at = Utc::now();
    store
        .insert_stat(&VisitorStat {
            date,
            total_visits_all_time: 5,
            unique_visits_today: 2,
            updated_at: at,
        })
        .await
        .expect("insert");

    store.bump_stat(date, 1, 1, at).await.expect("bump");
    let stat = store.get_stat(date).await.expect("get").expect("row");
    assert_eq!((stat.total_visits_all_time, stat.unique_visits_today), (6, 3));

    store.set_unique_visits(date, 42, at).await.expect("set");
    let stat = store.get_stat(date).await.expect("get").expect("row");
    assert_eq!(stat.unique_visits_today, 42);
    assert_eq!(stat.total_visits_all_time, 6);
}

#[tokio::test]
async fn test_updates_on_missing_stat_row_are_noops() {
    let store = store();
    let date = day(2024, 5, 1);
    store.bump_stat(date, 1, 1, Utc::now()).await.expect("bump");
    store.set_unique_visits(date, 7, Utc::now()).await.expect("set");
    assert!(store.get_stat(date).await.expect("get").is_none());
}

#[tokio::test]
async fn test_upsert_replaces_existing_row() {
    let store = store();
    let date = day(2024, 5, 1);
    let at = Utc::now();
    store
        .upsert_stat(&VisitorStat {
            date,
            total_visits_all_time: 1,
            unique_visits_today: 1,
            updated_at: at,
        })
        .await
        .expect("first upsert");
    store
        .upsert_stat(&VisitorStat {
            date,
            total_visits_all_time: 50,
            unique_visits_today: 0,
            updated_at: at,
        })
        .await
        .expect("second upsert");

    let stat = store.get_stat(date).await.expect("get").expect("row");
    assert_eq!((stat.total_visits_all_time, stat.unique_visits_today), (50, 0));
    assert_eq!(store.table_counts().await.expect("counts").visitor_stats, 1);
}

#[tokio::test]
async fn test_purge_removes_only_rows_before_cutoff() {
    let store = store();
    let at = Utc::now();
    store.insert_visitor_ip("10.0.0.1", day(2024, 3, 1), at).await.expect("old");
    store.insert_visitor_ip("10.0.0.2", day(2024, 3, 31), at).await.expect("cutoff day");
    store.insert_visitor_ip("10.0.0.3", day(2024, 4, 15), at).await.expect("recent");

    let removed = store
        .purge_visitor_ips_before(day(2024, 3, 31))
        .await
        .expect("purge");
    assert_eq!(removed, 1);
    assert_eq!(store.table_counts().await.expect("counts").visitor_ips, 2);
}

#[tokio::test]
async fn test_table_counts_on_empty_database() {
    let counts = store().table_counts().await.expect("counts");
    assert_eq!(counts.visitor_logs, 0);
    assert_eq!(counts.visitor_ips, 0);
    assert_eq!(counts.visitor_stats, 0);
}
