// ABOUTME: Process-level plumbing for the catalog binary
// ABOUTME: Logging setup, configuration overrides and the HTTP server lifecycle

use anyhow::Context;
use catalog_api::{create_router, DbState};
use catalog_core::Config;
use catalog_storage::{Database, MigrationOptions, Migrator};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber; `RUST_LOG` overrides the `info` default
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// Command-line values that take precedence over the environment
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub database: Option<std::path::PathBuf>,
    pub csv: Option<std::path::PathBuf>,
    pub batch_size: Option<usize>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Overrides {
    pub fn apply(self, mut config: Config) -> Config {
        if let Some(database) = self.database {
            config.database_path = database;
        }
        if let Some(csv) = self.csv {
            config.csv_path = csv;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        config
    }
}

/// Read `.env` (if present) and the environment, then apply CLI overrides
pub fn load_config(overrides: Overrides) -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("Invalid configuration")?;
    Ok(overrides.apply(config))
}

/// Serve the API until Ctrl+C
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let db = Database::open(config)
        .await
        .with_context(|| format!("Failed to open {}", config.database_path.display()))?;

    let state = Migrator::new(db.pool().clone(), MigrationOptions::default())
        .inspect()
        .await?;
    if !state.is_migrated() {
        warn!("Products table is not normalized yet; run `catalog migrate` before serving traffic");
    }

    let app = create_router(DbState::new(db.pool().clone()), config)
        .with_context(|| format!("Invalid CORS_ORIGIN: {}", config.cors_origin))?;

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
