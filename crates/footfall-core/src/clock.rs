//! Calendar helpers. Every "today" in the system is an IST calendar date.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Asia::Kolkata;
use chrono_tz::Tz;

/// Timezone that defines a visit day.
pub const VISIT_TZ: Tz = Kolkata;

/// The IST calendar date containing `now`.
pub fn visit_date(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&VISIT_TZ).date_naive()
}

pub fn today() -> NaiveDate {
    visit_date(Utc::now())
}

pub fn yesterday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(1)
}

/// Oldest visit date kept when purging per-IP rows.
pub fn retention_cutoff(today: NaiveDate, retention_days: u32) -> NaiveDate {
    today - Duration::days(i64::from(retention_days))
}

/// Time remaining from `now` until the next IST midnight (never zero).
pub fn until_next_midnight(now: DateTime<Utc>) -> std::time::Duration {
    let tomorrow = visit_date(now) + Duration::days(1);
    let next_midnight = tomorrow
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| naive.and_local_timezone(VISIT_TZ).single())
        .map(|local| local.with_timezone(&Utc));
    let secs = match next_midnight {
        Some(at) => (at - now).num_seconds().max(1),
        // IST has no DST gaps; a full day is a safe fallback.
        None => 86_400,
    };
    std::time::Duration::from_secs(secs as u64)
}
