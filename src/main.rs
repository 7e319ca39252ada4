use anyhow::{Context, Result};
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod shutdown;
mod state;
mod store;

use config::{AppConfig, DatabaseConfig, LogFormat};
use services::sensor_service::SensorService;
use state::AppState;
use store::{PostgresSensorStore, SensorStore, SqliteSensorStore};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Parse config (CLI > env > file > defaults) ---
    let cfg = AppConfig::load().context("loading configuration")?;

    // --- Logging setup ---
    init_logging(cfg.log_format);

    match &cfg.config_file {
        Some(path) => tracing::info!("Loaded config file {}", path.display()),
        None => tracing::info!("No config file found, only defaults and overrides are active"),
    }
    tracing::info!(
        addr = %cfg.addr(),
        request_timeout_secs = cfg.request_timeout.as_secs(),
        max_connections = cfg.max_connections,
        seed = cfg.seed,
        "Starting sensor-metadata-api"
    );

    // --- Initialize storage ---
    let store = connect_store(&cfg).await?;
    tracing::info!(backend = store.backend(), "Storage ready");

    if cfg.seed {
        let inserted = store::seed::seed_demo_sensors(store.as_ref())
            .await
            .context("seeding demo sensors")?;
        tracing::info!(inserted, "Seed data applied");
    }

    // --- Build router ---
    let state = AppState::new(SensorService::new(store));
    let app = routes::routes::app(state, cfg.request_timeout);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err).with_context(|| format!("binding {}", addr)),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins; otherwise `info`.
fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

/// Open the configured backend and apply its schema.
async fn connect_store(cfg: &AppConfig) -> Result<Arc<dyn SensorStore>> {
    let store: Arc<dyn SensorStore> = match &cfg.database {
        DatabaseConfig::Sqlite { url } => {
            ensure_sqlite_parent(url)?;
            let store = SqliteSensorStore::connect(url, cfg.max_connections)
                .await
                .with_context(|| format!("connecting to sqlite at {}", url))?;
            store.init_schema().await.context("applying sqlite schema")?;
            Arc::new(store)
        }
        DatabaseConfig::PostgresUrl { url, schema } => {
            let store = PostgresSensorStore::from_url(url, schema.clone(), cfg.max_connections)
                .await
                .context("connecting to postgres")?;
            store.init_schema().await.context("applying postgres schema")?;
            Arc::new(store)
        }
        DatabaseConfig::Postgres(params) => {
            let store = PostgresSensorStore::from_params(params, cfg.max_connections)
                .await
                .with_context(|| format!("connecting to postgres at {}:{}", params.host, params.port))?;
            store.init_schema().await.context("applying postgres schema")?;
            Arc::new(store)
        }
    };
    Ok(store)
}

/// Create the directory holding the SQLite file, if the URL points at one.
fn ensure_sqlite_parent(url: &str) -> Result<()> {
    let path = url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }
    Ok(())
}
