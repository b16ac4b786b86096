// ABOUTME: Integrity checks run after the department migration
// ABOUTME: Structural checks on the normalized schema and drift from the products_backup snapshot

use serde::Serialize;
use sqlx::SqliteConnection;

use crate::schema::{
    self, BACKUP_TABLE, DEPARTMENTS_TABLE, DEPARTMENT_ID_COLUMN, LEGACY_DEPARTMENT_COLUMN,
    PRODUCTS_TABLE,
};
use crate::StorageResult;

/// Post-migration integrity figures
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub department_count: i64,
    pub product_count: i64,
    /// Row count of `products_backup`, when it exists
    pub backup_count: Option<i64>,
    pub null_department_ids: i64,
    pub orphaned_products: i64,
    pub legacy_column_present: bool,
    pub foreign_key_present: bool,
    /// Products whose department name differs from the backed-up legacy value
    pub mismatched_departments: Option<i64>,
}

impl Verification {
    /// Structural problems with the normalized schema; always blocking
    pub fn failures(&self) -> Vec<String> {
        let mut failures = Vec::new();
        if self.department_count == 0 {
            failures.push("departments table is empty".to_string());
        }
        if self.null_department_ids > 0 {
            failures.push(format!(
                "{} products have no department_id",
                self.null_department_ids
            ));
        }
        if self.orphaned_products > 0 {
            failures.push(format!(
                "{} products reference a missing department",
                self.orphaned_products
            ));
        }
        if self.legacy_column_present {
            failures.push("legacy department column still exists".to_string());
        }
        if !self.foreign_key_present {
            failures.push("department_id has no foreign key".to_string());
        }
        failures
    }

    /// Differences between `products` and `products_backup`. Blocking right
    /// after a migration rewrote the table; rows appended later also show up here.
    pub fn backup_drift(&self) -> Vec<String> {
        let mut drift = Vec::new();
        if let Some(backup) = self.backup_count {
            if backup != self.product_count {
                drift.push(format!(
                    "product count {} differs from backup count {}",
                    self.product_count, backup
                ));
            }
        }
        if let Some(mismatched) = self.mismatched_departments.filter(|&n| n > 0) {
            drift.push(format!(
                "{} products resolve to a different department than before",
                mismatched
            ));
        }
        drift
    }

    /// No structural failures and no drift from the backup
    pub fn passed(&self) -> bool {
        self.failures().is_empty() && self.backup_drift().is_empty()
    }
}

async fn count(conn: &mut SqliteConnection, sql: &str) -> StorageResult<i64> {
    Ok(sqlx::query_scalar(sql).fetch_one(&mut *conn).await?)
}

pub async fn verify(conn: &mut SqliteConnection) -> StorageResult<Verification> {
    let products = schema::read_table_schema(conn, PRODUCTS_TABLE).await?;
    let has_department_id = products
        .as_ref()
        .is_some_and(|s| s.has_column(DEPARTMENT_ID_COLUMN));

    let department_count = if schema::table_exists(conn, DEPARTMENTS_TABLE).await? {
        count(conn, "SELECT COUNT(*) FROM departments").await?
    } else {
        0
    };

    let product_count = count(conn, "SELECT COUNT(*) FROM products").await?;

    let backup = schema::read_table_schema(conn, BACKUP_TABLE).await?;
    let backup_count = match &backup {
        Some(_) => Some(count(conn, "SELECT COUNT(*) FROM products_backup").await?),
        None => None,
    };

    let (null_department_ids, orphaned_products) = if has_department_id && department_count > 0 {
        (
            count(conn, "SELECT COUNT(*) FROM products WHERE department_id IS NULL").await?,
            count(
                conn,
                "SELECT COUNT(*) FROM products p LEFT JOIN departments d ON d.id = p.department_id \
                 WHERE p.department_id IS NOT NULL AND d.id IS NULL",
            )
            .await?,
        )
    } else {
        (product_count, 0)
    };

    let mismatched_departments = match &backup {
        Some(b) if b.has_column(LEGACY_DEPARTMENT_COLUMN) && has_department_id && department_count > 0 => {
            Some(
                count(
                    conn,
                    "SELECT COUNT(*) FROM products p \
                     JOIN products_backup b ON b.id = p.id \
                     LEFT JOIN departments d ON d.id = p.department_id \
                     WHERE d.name IS NULL OR d.name <> b.department",
                )
                .await?,
            )
        }
        _ => None,
    };

    Ok(Verification {
        department_count,
        product_count,
        backup_count,
        null_department_ids,
        orphaned_products,
        legacy_column_present: products
            .as_ref()
            .is_some_and(|s| s.has_column(LEGACY_DEPARTMENT_COLUMN)),
        foreign_key_present: products
            .as_ref()
            .is_some_and(|s| s.has_foreign_key_on(DEPARTMENT_ID_COLUMN)),
        mismatched_departments,
    })
}
