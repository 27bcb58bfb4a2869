//! Daily reset: close out yesterday, open today, purge old per-IP rows.
//!
//! Every step is attempted even when an earlier one failed; failures are
//! logged and named in [`ResetSummary::failed_steps`]. There is no rollback.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use footfall_core::clock;
use footfall_core::store::VisitorStore;
use footfall_core::visitor::{ResetSummary, VisitorStat};

pub const STEP_COUNT_YESTERDAY: &str = "count_yesterday_unique";
pub const STEP_UPDATE_YESTERDAY: &str = "update_yesterday_stats";
pub const STEP_COUNT_TOTAL: &str = "count_total_visits";
pub const STEP_UPSERT_TODAY: &str = "upsert_today_stats";
pub const STEP_PURGE: &str = "purge_old_ips";

pub async fn run_daily_reset(
    store: &dyn VisitorStore,
    now: DateTime<Utc>,
    retention_days: u32,
) -> ResetSummary {
    let today = clock::visit_date(now);
    let yesterday = clock::yesterday_of(today);
    let mut failed_steps: Vec<String> = Vec::new();

    let yesterday_unique_count = match store.count_visitor_ips(yesterday).await {
        Ok(n) => n,
        Err(e) => {
            error!(date = %yesterday, error = %e, "Failed to count yesterday's unique IPs");
            failed_steps.push(STEP_COUNT_YESTERDAY.to_string());
            0
        }
    };

    if yesterday_unique_count > 0 {
        if let Err(e) = store
            .set_unique_visits(yesterday, yesterday_unique_count, now)
            .await
        {
            error!(date = %yesterday, error = %e, "Failed to update yesterday's stats");
            failed_steps.push(STEP_UPDATE_YESTERDAY.to_string());
        }
    }

    let total = match store.count_logs().await {
        Ok(n) => Some(n),
        Err(e) => {
            error!(error = %e, "Failed to count total visits");
            failed_steps.push(STEP_COUNT_TOTAL.to_string());
            None
        }
    };

    // Without a real total the upsert would overwrite today's row with zero.
    match total {
        Some(total) => {
            let stat = VisitorStat {
                date: today,
                total_visits_all_time: total,
                unique_visits_today: 0,
                updated_at: now,
            };
            if let Err(e) = store.upsert_stat(&stat).await {
                error!(date = %today, error = %e, "Failed to upsert today's stats");
                failed_steps.push(STEP_UPSERT_TODAY.to_string());
            }
        }
        None => {
            warn!(date = %today, "Skipping today's stats upsert: total unknown");
            failed_steps.push(STEP_UPSERT_TODAY.to_string());
        }
    }

    let cutoff = clock::retention_cutoff(today, retention_days);
    let purged_ips = match store.purge_visitor_ips_before(cutoff).await {
        Ok(n) => n,
        Err(e) => {
            error!(cutoff = %cutoff, error = %e, "Failed to purge old visitor IPs");
            failed_steps.push(STEP_PURGE.to_string());
            0
        }
    };

    info!(
        date = %today,
        yesterday_unique_count,
        total_visits_all_time = total.unwrap_or(0),
        purged_ips,
        failed = failed_steps.len(),
        "Daily reset finished"
    );

    ResetSummary {
        date: today,
        yesterday_unique_count,
        total_visits_all_time: total.unwrap_or(0),
        purged_ips,
        failed_steps,
    }
}
