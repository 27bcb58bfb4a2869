//! The visit-tracking flow behind `GET /api/visitors`.
//!
//! Each store call is best effort except the aggregate step at the end: a
//! failed IP upsert or log insert is logged and the request carries on.
//! Nothing here is transactional, so under partial failure the three tables
//! can disagree until the next daily reset recomputes them.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, error, warn};

use footfall_core::clock;
use footfall_core::sanitize::{sanitize_page_path, sanitize_referer, sanitize_user_agent};
use footfall_core::store::VisitorStore;
use footfall_core::visitor::{VisitorLog, VisitorStat, VisitorStats};

/// Raw request data for one visit. Sanitized inside [`track_visit`].
#[derive(Debug, Clone, Default)]
pub struct VisitContext {
    pub ip: String,
    pub user_agent: String,
    pub referer: String,
    pub page_path: String,
}

/// Today's stat row and whether this call just computed it.
struct TodayStat {
    stat: VisitorStat,
    fresh: bool,
}

/// Record one visit and return the stats to show the visitor.
///
/// The response is read-modify-respond: when today's row already existed and
/// this IP is new today, both counters are reported one higher than what was
/// read (and the row is bumped by the same amount) instead of re-reading.
/// A freshly computed row already includes this visit and is returned as is.
pub async fn track_visit(
    store: &dyn VisitorStore,
    visit: &VisitContext,
    now: DateTime<Utc>,
) -> Result<VisitorStats> {
    let today = clock::visit_date(now);

    let is_new = record_ip(store, &visit.ip, today, now).await;

    let log = VisitorLog {
        ip_address: visit.ip.clone(),
        user_agent: sanitize_user_agent(&visit.user_agent),
        referer: sanitize_referer(&visit.referer),
        page_path: sanitize_page_path(&visit.page_path),
    };
    if let Err(e) = store.insert_log(&log, now).await {
        error!(ip = %visit.ip, error = %e, "Failed to insert visitor log");
    }

    let TodayStat { stat, fresh } = today_stat(store, today, now).await?;

    let mut stats = VisitorStats {
        total_visits: stat.total_visits_all_time,
        unique_visits_today: stat.unique_visits_today,
        is_new_visitor_today: is_new,
        date: today,
    };

    if is_new && !fresh {
        if let Err(e) = store.bump_stat(today, 1, 1, now).await {
            error!(date = %today, error = %e, "Failed to bump daily stats");
        }
        stats.total_visits += 1;
        stats.unique_visits_today += 1;
    }

    Ok(stats)
}

/// Stats for today without recording a visit (`get-stats` action).
pub async fn current_stats(store: &dyn VisitorStore, now: DateTime<Utc>) -> Result<VisitorStats> {
    let today = clock::visit_date(now);
    let TodayStat { stat, .. } = today_stat(store, today, now).await?;
    Ok(VisitorStats {
        total_visits: stat.total_visits_all_time,
        unique_visits_today: stat.unique_visits_today,
        is_new_visitor_today: false,
        date: today,
    })
}

/// Upsert today's per-IP row. Returns `true` only when this call created it.
async fn record_ip(store: &dyn VisitorStore, ip: &str, today: NaiveDate, now: DateTime<Utc>) -> bool {
    let existing = match store.find_visitor_ip(ip, today).await {
        Ok(row) => row,
        Err(e) => {
            error!(ip, error = %e, "Failed to look up visitor IP");
            return false;
        }
    };

    if existing.is_none() {
        match store.insert_visitor_ip(ip, today, now).await {
            Ok(true) => return true,
            // A concurrent request for the same IP inserted first.
            Ok(false) => debug!(ip, "Visitor IP row already present"),
            Err(e) => {
                error!(ip, error = %e, "Failed to insert visitor IP");
                return false;
            }
        }
    }

    if let Err(e) = store.touch_visitor_ip(ip, today, now).await {
        error!(ip, error = %e, "Failed to update visitor IP");
    }
    false
}

/// Read today's stat row, creating it from the raw tables when missing.
///
/// Creation is skipped when a count failed, so a degraded zero never gets
/// persisted for the rest of the day. Only the create itself is fatal.
async fn today_stat(store: &dyn VisitorStore, today: NaiveDate, now: DateTime<Utc>) -> Result<TodayStat> {
    match store.get_stat(today).await {
        Ok(Some(stat)) => return Ok(TodayStat { stat, fresh: false }),
        Ok(None) => {}
        Err(e) => error!(date = %today, error = %e, "Failed to read daily stats"),
    }

    let total = store.count_logs().await;
    let unique = store.count_visitor_ips(today).await;
    let stat = VisitorStat {
        date: today,
        total_visits_all_time: total.as_ref().copied().unwrap_or(0),
        unique_visits_today: unique.as_ref().copied().unwrap_or(0),
        updated_at: now,
    };

    match (&total, &unique) {
        (Ok(_), Ok(_)) => {
            if !store.insert_stat(&stat).await? {
                debug!(date = %today, "Daily stats row created concurrently");
            }
        }
        _ => {
            if let Err(e) = &total {
                error!(error = %e, "Failed to count visitor logs");
            }
            if let Err(e) = &unique {
                error!(date = %today, error = %e, "Failed to count visitor IPs");
            }
            warn!(date = %today, "Serving degraded daily stats without persisting them");
        }
    }

    Ok(TodayStat { stat, fresh: true })
}
