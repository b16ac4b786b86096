// ABOUTME: Copy-and-swap table rebuild for schema changes SQLite cannot apply in place
// ABOUTME: Used to drop the legacy department column and to add the department foreign key

use sqlx::{Connection, Row, SqliteConnection};
use tracing::{debug, info};

use crate::schema::{IndexDef, TableSchema};
use crate::{StorageError, StorageResult};

/// What a rebuild changes: the table's current schema, its target schema and
/// the secondary indexes the rebuilt table must carry.
#[derive(Debug, Clone)]
pub struct RebuildPlan {
    pub current: TableSchema,
    pub target: TableSchema,
    pub indexes: Vec<IndexDef>,
}

impl RebuildPlan {
    /// Columns present in both schemas, in target order
    pub fn copied_columns(&self) -> Vec<&str> {
        self.target
            .column_names()
            .into_iter()
            .filter(|name| self.current.has_column(name))
            .collect()
    }

    fn scratch_table(&self) -> String {
        format!("{}_new", self.target.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildSummary {
    pub rows_copied: u64,
    pub views_restored: usize,
}

/// Rebuild a table under a new schema inside one transaction: create a scratch
/// table, copy the shared columns, drop the original, rename the scratch table
/// into place, then recreate indexes and every view that referenced the table.
pub async fn rebuild_table(
    conn: &mut SqliteConnection,
    plan: &RebuildPlan,
) -> StorageResult<RebuildSummary> {
    let table = plan.target.name.as_str();
    if plan.current.name != plan.target.name {
        return Err(StorageError::Database(format!(
            "cannot rebuild {} into {}",
            plan.current.name, plan.target.name
        )));
    }

    let scratch = plan.scratch_table();
    let columns = plan.copied_columns().join(", ");

    let mut tx = conn.begin().await?;

    // Views are validated on rename, so dependents are dropped and restored
    let views: Vec<(String, String)> = sqlx::query(
        "SELECT name, sql FROM sqlite_master WHERE type = 'view' AND sql LIKE '%' || ? || '%'",
    )
    .bind(table)
    .fetch_all(&mut *tx)
    .await?
    .iter()
    .map(|row| Ok((row.try_get("name")?, row.try_get("sql")?)))
    .collect::<Result<_, sqlx::Error>>()?;

    for (name, _) in &views {
        debug!("Dropping dependent view {}", name);
        sqlx::query(&format!("DROP VIEW IF EXISTS {}", name))
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query(&format!("DROP TABLE IF EXISTS {}", scratch))
        .execute(&mut *tx)
        .await?;
    sqlx::query(&plan.target.create_sql(&scratch))
        .execute(&mut *tx)
        .await?;

    let rows_copied = sqlx::query(&format!(
        "INSERT INTO {scratch} ({columns}) SELECT {columns} FROM {table}"
    ))
    .execute(&mut *tx)
    .await?
    .rows_affected();

    sqlx::query(&format!("DROP TABLE {}", table))
        .execute(&mut *tx)
        .await?;
    sqlx::query(&format!("ALTER TABLE {} RENAME TO {}", scratch, table))
        .execute(&mut *tx)
        .await?;

    for index in &plan.indexes {
        sqlx::query(&index.create_sql()).execute(&mut *tx).await?;
    }

    for (name, sql) in &views {
        debug!("Restoring view {}", name);
        sqlx::query(sql).execute(&mut *tx).await?;
    }

    tx.commit().await?;

    info!(
        "Rebuilt {} ({} rows, {} indexes, {} views)",
        table,
        rows_copied,
        plan.indexes.len(),
        views.len()
    );

    Ok(RebuildSummary {
        rows_copied,
        views_restored: views.len(),
    })
}
