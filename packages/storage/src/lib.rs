// ABOUTME: Data layer and persistence for the catalog API
// ABOUTME: SQLite access, CSV loading, department migration and read queries

use thiserror::Error;

pub mod db;
pub mod departments;
pub mod loader;
pub mod migration;
pub mod products;
pub mod schema;
pub mod stats;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("{0} not found")]
    NotFound(&'static str),
}

pub type StorageResult<T> = Result<T, StorageError>;

// Re-export main types
pub use db::Database;
pub use departments::{
    DepartmentDetail, DepartmentDetails, DepartmentStorage, DepartmentSummary, DepartmentView,
};
pub use loader::{LoadReport, LoadSummary, Loader, LoaderError, LoaderOptions};
pub use migration::{
    MigrationError, MigrationOptions, MigrationReport, MigrationStep, Migrator, SchemaState,
    StepOutcome, Verification,
};
pub use products::{DepartmentRef, Product, ProductFilter, ProductStorage};
pub use stats::{CatalogStats, StatsStorage};
