// ABOUTME: Idempotent migration from a free-text department column to a departments table
// ABOUTME: Runs ordered checkpoints, each guarded by a schema inspection, then verifies the result

mod rebuild;
mod verify;

use std::fmt;

use serde::Serialize;
use sqlx::{Connection, SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::schema::{
    self, department_foreign_key, product_indexes_for, TableSchema, BACKUP_TABLE,
    CREATE_MARGIN_VIEW_SQL, DEPARTMENTS_TABLE, DEPARTMENT_ID_COLUMN, LEGACY_DEPARTMENT_COLUMN,
    PRODUCTS_TABLE,
};
use crate::{StorageError, StorageResult};

pub use rebuild::{rebuild_table, RebuildPlan, RebuildSummary};
pub use verify::Verification;

/// Migration checkpoints, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStep {
    Check,
    Backup,
    CreateDepartments,
    Populate,
    Backfill,
    DropLegacyColumn,
    AddForeignKey,
    Verify,
}

impl MigrationStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationStep::Check => "check",
            MigrationStep::Backup => "backup",
            MigrationStep::CreateDepartments => "create_departments",
            MigrationStep::Populate => "populate",
            MigrationStep::Backfill => "backfill",
            MigrationStep::DropLegacyColumn => "drop_legacy_column",
            MigrationStep::AddForeignKey => "add_foreign_key",
            MigrationStep::Verify => "verify",
        }
    }
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Migration step '{step}' failed: {source}")]
    Step {
        step: MigrationStep,
        #[source]
        source: StorageError,
    },
    #[error("No products table to migrate")]
    MissingProducts,
    #[error("{0} products have no matching department; resolve them and re-run")]
    UnresolvedDepartments(i64),
    #[error("Migration verification failed: {}", .0.join("; "))]
    Verification(Vec<String>),
}

trait StepContext<T> {
    fn at(self, step: MigrationStep) -> Result<T, MigrationError>;
}

impl<T, E: Into<StorageError>> StepContext<T> for Result<T, E> {
    fn at(self, step: MigrationStep) -> Result<T, MigrationError> {
        self.map_err(|e| MigrationError::Step {
            step,
            source: e.into(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MigrationOptions {
    /// Drop `products_backup` once verification passes
    pub drop_backup: bool,
}

/// What the schema looks like before (or between) checkpoints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchemaState {
    pub has_products: bool,
    pub has_departments: bool,
    pub has_department_id: bool,
    pub has_legacy_department: bool,
    pub has_foreign_key: bool,
    pub has_backup: bool,
}

impl SchemaState {
    pub fn is_migrated(&self) -> bool {
        self.has_products
            && self.has_departments
            && self.has_department_id
            && !self.has_legacy_department
            && self.has_foreign_key
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub step: MigrationStep,
    /// False when the existence check found nothing to do
    pub applied: bool,
    pub detail: String,
}

impl StepOutcome {
    fn applied(step: MigrationStep, detail: impl Into<String>) -> Self {
        Self {
            step,
            applied: true,
            detail: detail.into(),
        }
    }

    fn skipped(step: MigrationStep, detail: impl Into<String>) -> Self {
        Self {
            step,
            applied: false,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub initial_state: SchemaState,
    pub steps: Vec<StepOutcome>,
    pub verification: Verification,
    pub backup_dropped: bool,
}

impl MigrationReport {
    /// True when at least one checkpoint changed the database
    pub fn changed_anything(&self) -> bool {
        self.backup_dropped || self.steps.iter().any(|s| s.applied)
    }
}

/// Normalizes the products table's department column
pub struct Migrator {
    pool: SqlitePool,
    options: MigrationOptions,
}

impl Migrator {
    pub fn new(pool: SqlitePool, options: MigrationOptions) -> Self {
        Self { pool, options }
    }

    /// Inspect the current schema without changing anything
    pub async fn inspect(&self) -> StorageResult<SchemaState> {
        let mut conn = self.pool.acquire().await?;
        inspect(&mut conn).await
    }

    /// Run the integrity checks on their own
    pub async fn verify(&self) -> StorageResult<Verification> {
        let mut conn = self.pool.acquire().await?;
        verify::verify(&mut conn).await
    }

    /// Run every checkpoint in order. Checkpoints whose work is already done are
    /// recorded as skipped, so re-running against a migrated schema is a no-op.
    pub async fn run(&self) -> Result<MigrationReport, MigrationError> {
        info!("Starting department normalization migration");

        let mut conn = self.pool.acquire().await.at(MigrationStep::Check)?;
        let result = self.run_steps(&mut conn).await;

        match &result {
            Ok(report) if report.changed_anything() => {
                info!("Migration completed successfully")
            }
            Ok(_) => info!("Schema already migrated; nothing to do"),
            Err(e) => {
                error!("Migration failed: {}", e);
                warn!("Backup table {} is left in place for recovery", BACKUP_TABLE);
            }
        }

        result
    }

    async fn run_steps(
        &self,
        conn: &mut SqliteConnection,
    ) -> Result<MigrationReport, MigrationError> {
        let initial_state = inspect(conn).await.at(MigrationStep::Check)?;
        if !initial_state.has_products {
            return Err(MigrationError::MissingProducts);
        }
        info!("Step 1: Checking current schema: {:?}", initial_state);

        let mut steps = vec![StepOutcome::skipped(
            MigrationStep::Check,
            if initial_state.is_migrated() {
                "schema already normalized"
            } else {
                "migration required"
            },
        )];

        steps.push(backup(conn, &initial_state).await?);
        steps.push(create_departments(conn).await?);
        steps.push(populate(conn).await?);
        steps.push(backfill(conn).await?);
        steps.push(drop_legacy_column(conn).await?);
        steps.push(add_foreign_key(conn).await?);

        info!("Step 8: Verifying migration");
        let verification = verify::verify(conn).await.at(MigrationStep::Verify)?;
        let mut failures = verification.failures();
        let drift = verification.backup_drift();
        let migrated_now = !initial_state.is_migrated() || steps.iter().any(|s| s.applied);
        if migrated_now {
            failures.extend(drift);
        } else {
            for difference in &drift {
                warn!("Backup differs from products: {}", difference);
            }
        }
        if !failures.is_empty() {
            for failure in &failures {
                error!("Verification failed: {}", failure);
            }
            return Err(MigrationError::Verification(failures));
        }
        info!(
            "Verification passed: {} departments, {} products",
            verification.department_count, verification.product_count
        );

        let mut backup_dropped = false;
        if self.options.drop_backup
            && schema::table_exists(conn, BACKUP_TABLE)
                .await
                .at(MigrationStep::Verify)?
        {
            sqlx::query("DROP TABLE products_backup")
                .execute(&mut *conn)
                .await
                .at(MigrationStep::Verify)?;
            info!("Dropped backup table {}", BACKUP_TABLE);
            backup_dropped = true;
        }

        Ok(MigrationReport {
            initial_state,
            steps,
            verification,
            backup_dropped,
        })
    }
}

async fn inspect(conn: &mut SqliteConnection) -> StorageResult<SchemaState> {
    let products = schema::read_table_schema(conn, PRODUCTS_TABLE).await?;
    let has_departments = schema::table_exists(conn, DEPARTMENTS_TABLE).await?;
    let has_backup = schema::table_exists(conn, BACKUP_TABLE).await?;

    let column = |name: &str| products.as_ref().is_some_and(|s| s.has_column(name));

    Ok(SchemaState {
        has_products: products.is_some(),
        has_departments,
        has_department_id: column(DEPARTMENT_ID_COLUMN),
        has_legacy_department: column(LEGACY_DEPARTMENT_COLUMN),
        has_foreign_key: products
            .as_ref()
            .is_some_and(|s| s.has_foreign_key_on(DEPARTMENT_ID_COLUMN)),
        has_backup,
    })
}

async fn current_products(
    conn: &mut SqliteConnection,
    step: MigrationStep,
) -> Result<TableSchema, MigrationError> {
    schema::read_table_schema(conn, PRODUCTS_TABLE)
        .await
        .at(step)?
        .ok_or(MigrationError::MissingProducts)
}

async fn backup(
    conn: &mut SqliteConnection,
    state: &SchemaState,
) -> Result<StepOutcome, MigrationError> {
    let step = MigrationStep::Backup;
    if !state.has_legacy_department {
        return Ok(StepOutcome::skipped(step, "legacy column already removed"));
    }
    if state.has_backup {
        return Ok(StepOutcome::skipped(step, "backup already exists"));
    }

    info!("Step 2: Creating backup table");
    let rows = sqlx::query("CREATE TABLE products_backup AS SELECT * FROM products")
        .execute(&mut *conn)
        .await
        .at(step)?;
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products_backup")
        .fetch_one(&mut *conn)
        .await
        .at(step)?;
    info!("Backed up {} products ({} rows affected)", count, rows.rows_affected());

    Ok(StepOutcome::applied(step, format!("{} rows", count)))
}

async fn create_departments(conn: &mut SqliteConnection) -> Result<StepOutcome, MigrationError> {
    let step = MigrationStep::CreateDepartments;
    let existed = schema::table_exists(conn, DEPARTMENTS_TABLE).await.at(step)?;

    // Also restores the name index if it went missing
    schema::create_departments(conn).await.at(step)?;

    if existed {
        Ok(StepOutcome::skipped(step, "departments table exists"))
    } else {
        info!("Step 3: Created departments table");
        Ok(StepOutcome::applied(step, "created departments table"))
    }
}

async fn populate(conn: &mut SqliteConnection) -> Result<StepOutcome, MigrationError> {
    let step = MigrationStep::Populate;
    let products = current_products(conn, step).await?;
    if !products.has_column(LEGACY_DEPARTMENT_COLUMN) {
        return Ok(StepOutcome::skipped(step, "no legacy department values"));
    }

    info!("Step 4: Populating departments from products");
    let inserted = sqlx::query(
        r#"
        INSERT OR IGNORE INTO departments (name)
        SELECT DISTINCT department FROM products
        WHERE department IS NOT NULL
          AND department != ''
          AND department NOT IN (SELECT name FROM departments)
        ORDER BY department
        "#,
    )
    .execute(&mut *conn)
    .await
    .at(step)?
    .rows_affected();

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM departments")
        .fetch_one(&mut *conn)
        .await
        .at(step)?;
    info!("Inserted {} departments ({} total)", inserted, total);

    let detail = format!("{} new, {} total", inserted, total);
    Ok(if inserted > 0 {
        StepOutcome::applied(step, detail)
    } else {
        StepOutcome::skipped(step, detail)
    })
}

async fn backfill(conn: &mut SqliteConnection) -> Result<StepOutcome, MigrationError> {
    let step = MigrationStep::Backfill;
    let products = current_products(conn, step).await?;
    if !products.has_column(LEGACY_DEPARTMENT_COLUMN) {
        return Ok(StepOutcome::skipped(step, "department_id already authoritative"));
    }

    info!("Step 5: Backfilling department_id");
    let mut tx = conn.begin().await.at(step)?;

    if !products.has_column(DEPARTMENT_ID_COLUMN) {
        sqlx::query("ALTER TABLE products ADD COLUMN department_id INTEGER")
            .execute(&mut *tx)
            .await
            .at(step)?;
        info!("Added department_id column");
    }

    let updated = sqlx::query(
        r#"
        UPDATE products
        SET department_id = (
            SELECT d.id FROM departments d WHERE d.name = products.department
        )
        "#,
    )
    .execute(&mut *tx)
    .await
    .at(step)?
    .rows_affected();

    let unresolved: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE department_id IS NULL")
            .fetch_one(&mut *tx)
            .await
            .at(step)?;

    tx.commit().await.at(step)?;

    if unresolved > 0 {
        error!("{} products have no matching department", unresolved);
        return Err(MigrationError::UnresolvedDepartments(unresolved));
    }

    info!("Updated department_id on {} products", updated);
    Ok(StepOutcome::applied(step, format!("{} rows", updated)))
}

async fn drop_legacy_column(conn: &mut SqliteConnection) -> Result<StepOutcome, MigrationError> {
    let step = MigrationStep::DropLegacyColumn;
    let current = current_products(conn, step).await?;
    if !current.has_column(LEGACY_DEPARTMENT_COLUMN) {
        return Ok(StepOutcome::skipped(step, "legacy column already removed"));
    }

    info!("Step 6: Dropping legacy department column");
    let target = current.clone().without_column(LEGACY_DEPARTMENT_COLUMN);
    let plan = RebuildPlan {
        indexes: product_indexes_for(&target),
        current,
        target,
    };
    let summary = rebuild_table(conn, &plan).await.at(step)?;

    Ok(StepOutcome::applied(
        step,
        format!("{} rows copied", summary.rows_copied),
    ))
}

async fn add_foreign_key(conn: &mut SqliteConnection) -> Result<StepOutcome, MigrationError> {
    let step = MigrationStep::AddForeignKey;
    let current = current_products(conn, step).await?;

    if current.has_foreign_key_on(DEPARTMENT_ID_COLUMN) {
        sqlx::query(CREATE_MARGIN_VIEW_SQL)
            .execute(&mut *conn)
            .await
            .at(step)?;
        return Ok(StepOutcome::skipped(step, "foreign key already present"));
    }
    if !current.has_column(DEPARTMENT_ID_COLUMN) {
        return Err(MigrationError::Step {
            step,
            source: StorageError::Database("products has no department_id column".to_string()),
        });
    }

    let unresolved: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM products p LEFT JOIN departments d ON d.id = p.department_id \
         WHERE d.id IS NULL",
    )
    .fetch_one(&mut *conn)
    .await
    .at(step)?;
    if unresolved > 0 {
        error!(
            "Refusing to add foreign key: {} products lack a department",
            unresolved
        );
        return Err(MigrationError::UnresolvedDepartments(unresolved));
    }

    info!("Step 7: Adding foreign key constraint");
    let target = current.clone().with_foreign_key(department_foreign_key());
    let plan = RebuildPlan {
        indexes: product_indexes_for(&target),
        current,
        target,
    };
    let summary = rebuild_table(conn, &plan).await.at(step)?;

    sqlx::query(CREATE_MARGIN_VIEW_SQL)
        .execute(&mut *conn)
        .await
        .at(step)?;
    info!("Created products_with_margin view");

    Ok(StepOutcome::applied(
        step,
        format!("{} rows copied", summary.rows_copied),
    ))
}
