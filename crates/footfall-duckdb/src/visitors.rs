use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};

use footfall_core::store::TableCounts;
use footfall_core::visitor::{VisitorIp, VisitorLog, VisitorStat};

use crate::backend::{fmt_date, fmt_ts, parse_date, parse_ts};
use crate::DuckDbBackend;

impl DuckDbBackend {
    pub async fn find_visitor_ip(&self, ip: &str, date: NaiveDate) -> Result<Option<VisitorIp>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT ip_address, visit_date, CAST(first_visit_at AS VARCHAR), \
             CAST(last_visit_at AS VARCHAR), visit_count \
             FROM visitor_ips WHERE ip_address = ?1 AND visit_date = ?2",
        )?;
        let row = match stmt.query_row(duckdb::params![ip, fmt_date(date)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        }) {
            Ok(row) => Some(row),
            Err(duckdb::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(e.into()),
        };

        row.map(|(ip_address, visit_date, first, last, visit_count)| {
            Ok(VisitorIp {
                ip_address,
                visit_date: parse_date(&visit_date)?,
                first_visit_at: parse_ts(&first)?,
                last_visit_at: parse_ts(&last)?,
                visit_count,
            })
        })
        .transpose()
    }

    pub async fn insert_visitor_ip(
        &self,
        ip: &str,
        date: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.conn.lock().await;
        let date = fmt_date(date);
        let existing: i64 = conn
            .prepare("SELECT COUNT(*) FROM visitor_ips WHERE ip_address = ?1 AND visit_date = ?2")?
            .query_row(duckdb::params![ip, date], |row| row.get(0))?;
        if existing > 0 {
            return Ok(false);
        }

        let ts = fmt_ts(at);
        conn.execute(
            "INSERT INTO visitor_ips (id, ip_address, visit_date, first_visit_at, last_visit_at, visit_count) \
             VALUES (?1, ?2, ?3, ?4, ?5, 1) ON CONFLICT DO NOTHING",
            duckdb::params![uuid::Uuid::new_v4().to_string(), ip, date, ts, ts],
        )?;
        Ok(true)
    }

    pub async fn touch_visitor_ip(&self, ip: &str, date: NaiveDate, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE visitor_ips SET last_visit_at = ?1, visit_count = visit_count + 1 \
             WHERE ip_address = ?2 AND visit_date = ?3",
            duckdb::params![fmt_ts(at), ip, fmt_date(date)],
        )?;
        Ok(())
    }

    pub async fn insert_log(&self, log: &VisitorLog, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO visitor_logs (id, ip_address, user_agent, referer, page_path, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            duckdb::params![
                uuid::Uuid::new_v4().to_string(),
                log.ip_address,
                log.user_agent,
                log.referer,
                log.page_path,
                fmt_ts(at),
            ],
        )?;
        Ok(())
    }

    pub async fn count_logs(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        let count = conn
            .prepare("SELECT COUNT(*) FROM visitor_logs")?
            .query_row([], |row| row.get(0))?;
        Ok(count)
    }

    pub async fn count_visitor_ips(&self, date: NaiveDate) -> Result<i64> {
        let conn = self.conn.lock().await;
        let count = conn
            .prepare("SELECT COUNT(*) FROM visitor_ips WHERE visit_date = ?1")?
            .query_row(duckdb::params![fmt_date(date)], |row| row.get(0))?;
        Ok(count)
    }

    pub async fn get_stat(&self, date: NaiveDate) -> Result<Option<VisitorStat>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT date, total_visits_all_time, unique_visits_today, CAST(updated_at AS VARCHAR) \
             FROM visitor_stats WHERE date = ?1",
        )?;
        let row = match stmt.query_row(duckdb::params![fmt_date(date)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
            ))
        }) {
            Ok(row) => Some(row),
            Err(duckdb::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(e.into()),
        };

        row.map(|(date, total, unique, updated_at)| {
            Ok(VisitorStat {
                date: parse_date(&date)?,
                total_visits_all_time: total,
                unique_visits_today: unique,
                updated_at: parse_ts(&updated_at)?,
            })
        })
        .transpose()
    }

    pub async fn insert_stat(&self, stat: &VisitorStat) -> Result<bool> {
        let conn = self.conn.lock().await;
        let date = fmt_date(stat.date);
        let existing: i64 = conn
            .prepare("SELECT COUNT(*) FROM visitor_stats WHERE date = ?1")?
            .query_row(duckdb::params![date], |row| row.get(0))?;
        if existing > 0 {
            return Ok(false);
        }

        conn.execute(
            "INSERT INTO visitor_stats (date, total_visits_all_time, unique_visits_today, updated_at) \
             VALUES (?1, ?2, ?3, ?4) ON CONFLICT DO NOTHING",
            duckdb::params![
                date,
                stat.total_visits_all_time.max(0),
                stat.unique_visits_today.max(0),
                fmt_ts(stat.updated_at),
            ],
        )?;
        Ok(true)
    }

    pub async fn bump_stat(
        &self,
        date: NaiveDate,
        total_delta: i64,
        unique_delta: i64,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE visitor_stats SET \
             total_visits_all_time = GREATEST(total_visits_all_time + ?1, 0), \
             unique_visits_today = GREATEST(unique_visits_today + ?2, 0), \
             updated_at = ?3 \
             WHERE date = ?4",
            duckdb::params![total_delta, unique_delta, fmt_ts(at), fmt_date(date)],
        )?;
        Ok(())
    }

    pub async fn set_unique_visits(
        &self,
        date: NaiveDate,
        unique: i64,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE visitor_stats SET unique_visits_today = ?1, updated_at = ?2 WHERE date = ?3",
            duckdb::params![unique.max(0), fmt_ts(at), fmt_date(date)],
        )?;
        Ok(())
    }

    pub async fn upsert_stat(&self, stat: &VisitorStat) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT INTO visitor_stats (date, total_visits_all_time, unique_visits_today, updated_at)
               VALUES (?1, ?2, ?3, ?4)
               ON CONFLICT (date) DO UPDATE SET
                   total_visits_all_time = EXCLUDED.total_visits_all_time,
                   unique_visits_today = EXCLUDED.unique_visits_today,
                   updated_at = EXCLUDED.updated_at"#,
            duckdb::params![
                fmt_date(stat.date),
                stat.total_visits_all_time.max(0),
                stat.unique_visits_today.max(0),
                fmt_ts(stat.updated_at),
            ],
        )?;
        Ok(())
    }

    pub async fn purge_visitor_ips_before(&self, cutoff: NaiveDate) -> Result<i64> {
        let conn = self.conn.lock().await;
        let removed = conn.execute(
            "DELETE FROM visitor_ips WHERE visit_date < ?1",
            duckdb::params![fmt_date(cutoff)],
        )?;
        Ok(removed as i64)
    }

    pub async fn table_counts(&self) -> Result<TableCounts> {
        let conn = self.conn.lock().await;
        let count = |table: &str| -> Result<i64> {
            let n = conn
                .prepare(&format!("SELECT COUNT(*) FROM {table}"))?
                .query_row([], |row| row.get(0))?;
            Ok(n)
        };
        Ok(TableCounts {
            visitor_logs: count("visitor_logs")?,
            visitor_ips: count("visitor_ips")?,
            visitor_stats: count("visitor_stats")?,
        })
    }
}
