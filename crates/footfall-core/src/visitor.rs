use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One row per (ip_address, visit_date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitorIp {
    pub ip_address: String,
    pub visit_date: NaiveDate,
    pub first_visit_at: DateTime<Utc>,
    pub last_visit_at: DateTime<Utc>,
    pub visit_count: i64,
}

/// Append-only request log entry, already sanitized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitorLog {
    pub ip_address: String,
    pub user_agent: String,
    pub referer: String,
    pub page_path: String,
}

/// Daily aggregate, unique per `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitorStat {
    pub date: NaiveDate,
    pub total_visits_all_time: i64,
    pub unique_visits_today: i64,
    pub updated_at: DateTime<Utc>,
}

/// Body returned by the tracking endpoint and consumed by the polling client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorStats {
    #[serde(default)]
    pub total_visits: i64,
    #[serde(default)]
    pub unique_visits_today: i64,
    #[serde(default)]
    pub is_new_visitor_today: bool,
    /// Falls back to the current IST day when the server omits it.
    #[serde(default = "crate::clock::today")]
    pub date: NaiveDate,
}

impl VisitorStats {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            total_visits: 0,
            unique_visits_today: 0,
            is_new_visitor_today: false,
            date,
        }
    }
}

/// Outcome of one run of the daily reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetSummary {
    pub date: NaiveDate,
    pub yesterday_unique_count: i64,
    pub total_visits_all_time: i64,
    pub purged_ips: i64,
    /// Names of the steps that failed; the run continues past each of them.
    pub failed_steps: Vec<String>,
}
