use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use footfall_core::{
    config::{Config, ResetSchedule},
    store::VisitorStore,
};
use footfall_server::state::AppState;

/// `footfall health`: liveness probe for Docker HEALTHCHECK.
///
/// Calls `GET http://localhost:$FOOTFALL_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("FOOTFALL_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

/// `footfall verify`: print the row count of every table as JSON.
async fn run_verify(cfg: &Config) -> Result<()> {
    let store = open_store(cfg)?;
    let counts = store.table_counts().await?;
    println!("{}", serde_json::to_string_pretty(&counts)?);
    Ok(())
}

fn open_store(cfg: &Config) -> Result<Arc<dyn VisitorStore>> {
    if let Some(url) = &cfg.database_url {
        #[cfg(feature = "remote")]
        {
            let key = cfg
                .database_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("FOOTFALL_DATABASE_KEY is required with FOOTFALL_DATABASE_URL"))?;
            info!(url = %url, "Using hosted database");
            let store = footfall_server::remote::PostgrestStore::new(url, &key)?;
            return Ok(Arc::new(store));
        }
        #[cfg(not(feature = "remote"))]
        {
            anyhow::bail!(
                "FOOTFALL_DATABASE_URL is set ({url}) but this binary was built without the `remote` feature"
            );
        }
    }

    // Ensure data directory exists before opening DuckDB.
    std::fs::create_dir_all(&cfg.data_dir)?;
    let db_path = format!("{}/footfall.db", cfg.data_dir);
    let db = footfall_duckdb::DuckDbBackend::open(&db_path, &cfg.duckdb_memory_limit)?;
    info!(path = %db_path, "Using embedded DuckDB");
    Ok(Arc::new(db))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str());
    if command == Some("health") {
        run_health_check();
    }

    // Initialise structured JSON logging. Level controlled via RUST_LOG env var.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("footfall=info".parse()?),
        )
        .json()
        .init();

    let cfg = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    if command == Some("verify") {
        return run_verify(&cfg).await;
    }

    let store = open_store(&cfg)?;

    if cfg.cron_secret.is_none() {
        warn!("FOOTFALL_CRON_SECRET is not set; daily reset requests will be rejected");
    }

    let state = Arc::new(AppState::new(store, cfg.clone()));

    // Spawn background rate-limit sweep.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            state.run_rate_limit_sweep_loop().await;
        });
    }

    if cfg.reset_schedule == ResetSchedule::Internal {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            state.run_daily_reset_loop().await;
        });
    }

    let addr = format!("0.0.0.0:{}", cfg.port);
    let app = footfall_server::app::build_app(Arc::clone(&state));

    info!(port = cfg.port, mode = ?cfg.mode, "Footfall listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        tokio::signal::ctrl_c().await.ok();
    })
    .await?;

    info!("Footfall shut down");
    Ok(())
}
