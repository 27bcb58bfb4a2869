/// DuckDB initialization SQL.
///
/// Executed once at open time. Every statement uses `IF NOT EXISTS` so it is
/// safe to run on each startup.
///
/// Dates are IST calendar days stored as `YYYY-MM-DD` strings; ISO ordering
/// makes `<` comparisons on them correct.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- One row per IP per IST day.
CREATE TABLE IF NOT EXISTS visitor_ips (
    id              VARCHAR PRIMARY KEY,           -- UUID v4
    ip_address      VARCHAR NOT NULL,
    visit_date      VARCHAR(10) NOT NULL,          -- YYYY-MM-DD (IST)
    first_visit_at  TIMESTAMP NOT NULL,
    last_visit_at   TIMESTAMP NOT NULL,
    visit_count     BIGINT NOT NULL DEFAULT 1,
    UNIQUE (ip_address, visit_date)
);
CREATE INDEX IF NOT EXISTS idx_visitor_ips_date ON visitor_ips(visit_date);

-- Append-only request log. Its cardinality is the all-time visit total.
CREATE TABLE IF NOT EXISTS visitor_logs (
    id              VARCHAR PRIMARY KEY,           -- UUID v4
    ip_address      VARCHAR NOT NULL,
    user_agent      VARCHAR NOT NULL DEFAULT '',
    referer         VARCHAR NOT NULL DEFAULT '',
    page_path       VARCHAR NOT NULL DEFAULT '/',
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

-- Daily aggregate, one row per IST day.
CREATE TABLE IF NOT EXISTS visitor_stats (
    date                   VARCHAR(10) PRIMARY KEY,
    total_visits_all_time  BIGINT NOT NULL DEFAULT 0,
    unique_visits_today    BIGINT NOT NULL DEFAULT 0,
    updated_at             TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#
    )
}
