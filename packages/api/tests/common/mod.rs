// ABOUTME: Common test utilities for API integration tests
// ABOUTME: Builds a migrated fixture database and drives the router with oneshot requests

#![allow(dead_code)]

use std::path::Path;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use catalog_api::{create_router, DbState};
use catalog_core::Config;
use catalog_storage::{Database, Loader, LoaderOptions, MigrationOptions, Migrator};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Router over a temporary database; the directory lives as long as the context
pub struct TestApp {
    pub router: Router,
    pub db: Database,
    pub _temp_dir: TempDir,
}

impl TestApp {
    /// Send a GET request and decode the JSON body
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}

fn fixture_csv() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../storage/tests/fixtures/products.csv")
}

/// App over the fixture catalog, loaded and migrated
pub async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::open_path(&temp_dir.path().join("products.db"), 5)
        .await
        .expect("Failed to open test database");

    Loader::new(db.pool().clone(), LoaderOptions::default())
        .load_csv(&fixture_csv())
        .await
        .expect("Fixture load should succeed");
    Migrator::new(db.pool().clone(), MigrationOptions::default())
        .run()
        .await
        .expect("Migration should succeed");

    let router = create_router(DbState::new(db.pool().clone()), &Config::default())
        .expect("Default CORS config is valid");

    TestApp {
        router,
        db,
        _temp_dir: temp_dir,
    }
}
