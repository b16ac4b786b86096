// ABOUTME: Common test utilities for storage integration tests
// ABOUTME: Provides temporary databases, CSV fixtures and pre-loaded catalogs

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use catalog_storage::{
    Database, LoaderOptions, Loader, MigrationOptions, Migrator,
};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Temporary catalog database; the directory lives as long as the context
pub struct TestCatalog {
    pub db: Database,
    pub dir: TempDir,
}

impl TestCatalog {
    pub fn pool(&self) -> SqlitePool {
        self.db.pool().clone()
    }

    pub fn loader(&self) -> Loader {
        Loader::new(self.pool(), LoaderOptions::default())
    }

    pub fn migrator(&self, drop_backup: bool) -> Migrator {
        Migrator::new(self.pool(), MigrationOptions { drop_backup })
    }

    /// Write a CSV file into the temporary directory
    pub fn write_csv(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }
}

pub fn fixture_csv() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/products.csv")
}

/// Empty database file in a fresh temporary directory
pub async fn empty_catalog() -> TestCatalog {
    let dir = TempDir::new().unwrap();
    let db = Database::open_path(&dir.path().join("products.db"), 5)
        .await
        .expect("Failed to open test database");
    TestCatalog { db, dir }
}

/// Catalog with the fixture CSV loaded into the legacy schema
pub async fn loaded_catalog() -> TestCatalog {
    let catalog = empty_catalog().await;
    catalog
        .loader()
        .load_csv(&fixture_csv())
        .await
        .expect("Fixture load should succeed");
    catalog
}

/// Catalog loaded and migrated to the normalized schema
pub async fn migrated_catalog() -> TestCatalog {
    let catalog = loaded_catalog().await;
    catalog
        .migrator(false)
        .run()
        .await
        .expect("Migration should succeed");
    catalog
}

pub async fn table_names(pool: &SqlitePool, kind: &str) -> Vec<String> {
    sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = ? ORDER BY name")
        .bind(kind)
        .fetch_all(pool)
        .await
        .unwrap()
}
