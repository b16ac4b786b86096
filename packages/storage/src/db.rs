// ABOUTME: Database connection management
// ABOUTME: Opens the SQLite file with the pragmas every component relies on

use std::path::Path;
use std::time::Duration;

use catalog_core::constants::ACQUIRE_TIMEOUT_SECS;
use catalog_core::Config;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::StorageResult;

/// Handle to the catalog database
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database named by the configuration
    pub async fn open(config: &Config) -> StorageResult<Self> {
        Self::open_path(&config.database_path, config.max_connections).await
    }

    /// Open (creating if needed) the database at `path`
    pub async fn open_path(path: &Path, max_connections: u32) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        debug!("Connecting to database: {}", path.display());

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .connect_with(options)
            .await?;

        info!("Database connection established: {}", path.display());

        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every pooled connection
    pub async fn close(self) {
        self.pool.close().await;
        debug!("Database connection closed");
    }
}
