// ABOUTME: Shared handler state holding the pool and the storage services
// ABOUTME: Cloned into every request; no mutable state crosses requests

use std::sync::Arc;

use catalog_storage::{DepartmentStorage, ProductStorage, StatsStorage};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct DbState {
    pub pool: SqlitePool,
    pub product_storage: Arc<ProductStorage>,
    pub department_storage: Arc<DepartmentStorage>,
    pub stats_storage: Arc<StatsStorage>,
}

impl DbState {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            product_storage: Arc::new(ProductStorage::new(pool.clone())),
            department_storage: Arc::new(DepartmentStorage::new(pool.clone())),
            stats_storage: Arc::new(StatsStorage::new(pool.clone())),
            pool,
        }
    }
}
