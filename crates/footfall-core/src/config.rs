use std::time::Duration;

/// Origins allowed for CORS when running in development mode without an
/// explicit `FOOTFALL_ALLOWED_ORIGINS` list.
pub const DEV_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:3001",
    "http://localhost:3002",
    "http://localhost:3003",
    "http://127.0.0.1:3000",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    /// Base URL of a hosted PostgREST-compatible database. When unset the
    /// embedded DuckDB store under `data_dir` is used.
    pub database_url: Option<String>,
    /// Service-role key sent to the hosted database.
    pub database_key: Option<String>,
    /// Shared secret for the daily reset trigger. `None` disables admin actions.
    pub cron_secret: Option<String>,
    pub trust_proxy: bool,
    /// Explicit CORS allow-list. Empty means "use the mode default".
    pub allowed_origins: Vec<String>,
    pub mode: AppMode,
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
    pub rate_limit_disable: bool,
    pub retention_days: u32,
    pub reset_schedule: ResetSchedule,
    pub duckdb_memory_limit: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppMode {
    Production,
    Development,
}

/// Who triggers the daily reset.
#[derive(Debug, Clone, PartialEq)]
pub enum ResetSchedule {
    /// An outside scheduler calls `/api/cron/reset-daily`.
    External,
    /// A background task runs the reset at every IST midnight.
    Internal,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup. `from_env` is this
    /// with `std::env::var`; tests pass a map instead.
    pub fn from_vars<F>(var: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Ok(Self {
            port: var("FOOTFALL_PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            data_dir: var("FOOTFALL_DATA_DIR").unwrap_or_else(|| "./data".to_string()),
            database_url: non_empty("FOOTFALL_DATABASE_URL"),
            database_key: non_empty("FOOTFALL_DATABASE_KEY"),
            cron_secret: non_empty("FOOTFALL_CRON_SECRET"),
            trust_proxy: var("FOOTFALL_TRUST_PROXY")
                .map(|v| v == "true")
                .unwrap_or(false),
            allowed_origins: non_empty("FOOTFALL_ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|origin| origin.trim().to_string())
                        .filter(|origin| !origin.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            mode: {
                let raw = var("FOOTFALL_MODE").unwrap_or_else(|| "production".to_string());
                match raw.as_str() {
                    "development" | "dev" => AppMode::Development,
                    _ => AppMode::Production,
                }
            },
            rate_limit_max: var("FOOTFALL_RATE_LIMIT_MAX")
                .unwrap_or_else(|| "30".to_string())
                .parse()
                .map_err(|e| format!("invalid FOOTFALL_RATE_LIMIT_MAX: {e}"))?,
            rate_limit_window_secs: var("FOOTFALL_RATE_LIMIT_WINDOW_SECS")
                .unwrap_or_else(|| "60".to_string())
                .parse()
                .map_err(|e| format!("invalid FOOTFALL_RATE_LIMIT_WINDOW_SECS: {e}"))?,
            rate_limit_disable: var("FOOTFALL_RATE_LIMIT_DISABLE")
                .map(|v| v == "true")
                .unwrap_or(false),
            retention_days: var("FOOTFALL_RETENTION_DAYS")
                .unwrap_or_else(|| "30".to_string())
                .parse()
                .map_err(|e| format!("invalid FOOTFALL_RETENTION_DAYS: {e}"))?,
            reset_schedule: {
                let raw = var("FOOTFALL_RESET_SCHEDULE").unwrap_or_else(|| "external".to_string());
                match raw.as_str() {
                    "internal" => ResetSchedule::Internal,
                    _ => ResetSchedule::External,
                }
            },
            duckdb_memory_limit: var("FOOTFALL_DUCKDB_MEMORY")
                .unwrap_or_else(|| "512MB".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.mode == AppMode::Production
    }

    /// Effective CORS allow-list: the explicit list if configured, otherwise
    /// localhost origins in development and nothing in production.
    pub fn cors_origins(&self) -> Vec<String> {
        if !self.allowed_origins.is_empty() {
            return self.allowed_origins.clone();
        }
        match self.mode {
            AppMode::Development => DEV_ORIGINS.iter().map(|o| o.to_string()).collect(),
            AppMode::Production => Vec::new(),
        }
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}
