// ABOUTME: Bulk CSV loader for the products table
// ABOUTME: Reads fixed-size chunks, coerces column types and drops rows missing critical fields

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use catalog_core::constants::{DEFAULT_BATCH_SIZE, REQUIRED_CSV_COLUMNS};
use serde::Serialize;
use sqlx::{Connection, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::schema::{self, ProductsLayout, DEPARTMENTS_TABLE};
use crate::StorageError;

/// SQLite caps bound parameters per statement; stay well below it
const MAX_ROWS_PER_STATEMENT: usize = 500;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("CSV file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Missing required column: {0}")]
    MissingColumn(&'static str),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Products table is mid-migration; finish the migration before loading")]
    MidMigration,
    #[error("Products table has neither a department nor a department_id column")]
    UnrecognizedLayout,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<sqlx::Error> for LoaderError {
    fn from(err: sqlx::Error) -> Self {
        LoaderError::Storage(StorageError::Sqlx(err))
    }
}

pub type LoaderResult<T> = Result<T, LoaderError>;

#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub batch_size: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Outcome of a CSV load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_loaded: usize,
    pub rows_dropped: usize,
    pub chunks: usize,
}

/// Post-load data quality figures
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub total_products: i64,
    /// `None` while the departments table does not exist
    pub total_departments: Option<i64>,
    pub invalid_prices: i64,
    /// Products whose department_id resolves; `None` on the legacy layout
    pub linked_products: Option<i64>,
}

/// A CSV row after type coercion
#[derive(Debug, Clone, PartialEq)]
struct ProductRecord {
    id: String,
    cost: f64,
    category: String,
    name: String,
    brand: String,
    retail_price: f64,
    department: String,
    sku: String,
    distribution_center_id: i64,
}

/// Position of every required column in the CSV header
struct ColumnIndex(HashMap<&'static str, usize>);

impl ColumnIndex {
    fn from_headers(headers: &csv::StringRecord) -> LoaderResult<Self> {
        let mut positions = HashMap::new();
        for column in REQUIRED_CSV_COLUMNS {
            let position = headers
                .iter()
                .position(|h| h.trim() == column)
                .ok_or(LoaderError::MissingColumn(column))?;
            positions.insert(column, position);
        }
        Ok(Self(positions))
    }

    fn field<'r>(&self, record: &'r csv::StringRecord, column: &str) -> &'r str {
        self.0
            .get(column)
            .and_then(|&i| record.get(i))
            .map(str::trim)
            .unwrap_or("")
    }

    /// Coerce a raw record; `None` when a critical field is missing or unparsable
    fn coerce(&self, record: &csv::StringRecord) -> Option<ProductRecord> {
        let id = self.field(record, "id");
        if id.is_empty() {
            return None;
        }

        Some(ProductRecord {
            id: id.to_string(),
            cost: parse_decimal(self.field(record, "cost"))?,
            category: self.field(record, "category").to_string(),
            name: self.field(record, "name").to_string(),
            brand: self.field(record, "brand").to_string(),
            retail_price: parse_decimal(self.field(record, "retail_price"))?,
            department: self.field(record, "department").to_string(),
            sku: self.field(record, "sku").to_string(),
            distribution_center_id: parse_integer(self.field(record, "distribution_center_id"))?,
        })
    }
}

fn parse_decimal(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Accepts "3" as well as "3.0", which spreadsheet exports often produce.
/// Whole decimals outside the i64 range are rejected.
fn parse_integer(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().or_else(|| {
        parse_decimal(raw)
            .filter(|v| v.fract() == 0.0)
            .filter(|&v| v >= i64::MIN as f64 && v < i64::MAX as f64)
            .map(|v| v as i64)
    })
}

/// Loads product rows from CSV into the database
pub struct Loader {
    pool: SqlitePool,
    options: LoaderOptions,
}

impl Loader {
    pub fn new(pool: SqlitePool, options: LoaderOptions) -> Self {
        Self { pool, options }
    }

    fn open_reader(path: &Path) -> LoaderResult<(csv::Reader<std::fs::File>, ColumnIndex)> {
        if !path.exists() {
            return Err(LoaderError::FileNotFound(path.to_path_buf()));
        }
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)?;
        let index = ColumnIndex::from_headers(reader.headers()?)?;
        Ok((reader, index))
    }

    /// Append every valid CSV row to the products table.
    ///
    /// Creates the legacy table when none exists. When the table has already
    /// been normalized, departments are populated from the CSV first and rows
    /// are written with a resolved `department_id`.
    pub async fn load_csv(&self, path: &Path) -> LoaderResult<LoadReport> {
        info!("Starting to load data from {}", path.display());

        // Header validation happens before any table is touched
        let (mut reader, index) = Self::open_reader(path)?;

        let mut conn = self.pool.acquire().await.map_err(StorageError::Sqlx)?;

        let layout = match schema::products_layout(&mut conn).await? {
            ProductsLayout::Missing => {
                schema::create_legacy_products(&mut conn).await?;
                ProductsLayout::Legacy
            }
            ProductsLayout::Transitional => return Err(LoaderError::MidMigration),
            ProductsLayout::Unrecognized => return Err(LoaderError::UnrecognizedLayout),
            layout => layout,
        };

        let departments = if layout == ProductsLayout::Normalized {
            drop(conn);
            self.populate_departments(path).await?;
            conn = self.pool.acquire().await.map_err(StorageError::Sqlx)?;
            Some(department_ids(&mut conn).await?)
        } else {
            None
        };

        let batch_size = self.options.batch_size.max(1);
        let mut report = LoadReport::default();
        let mut chunk: Vec<ProductRecord> = Vec::with_capacity(batch_size);

        for result in reader.records() {
            let record = result?;
            report.rows_read += 1;

            match index.coerce(&record) {
                Some(product) => chunk.push(product),
                None => {
                    report.rows_dropped += 1;
                    debug!("Dropping CSV row {}: missing critical field", report.rows_read);
                }
            }

            if chunk.len() >= batch_size {
                self.flush_chunk(&mut conn, &mut chunk, departments.as_ref(), &mut report)
                    .await?;
            }
        }

        if !chunk.is_empty() {
            self.flush_chunk(&mut conn, &mut chunk, departments.as_ref(), &mut report)
                .await?;
        }

        if report.rows_dropped > 0 {
            warn!(
                "Dropped {} of {} rows with missing or invalid critical fields",
                report.rows_dropped, report.rows_read
            );
        }
        info!(
            "Data loading completed. Total rows loaded: {}",
            report.rows_loaded
        );

        Ok(report)
    }

    async fn flush_chunk(
        &self,
        conn: &mut SqliteConnection,
        chunk: &mut Vec<ProductRecord>,
        departments: Option<&HashMap<String, i64>>,
        report: &mut LoadReport,
    ) -> LoaderResult<()> {
        let rows = std::mem::take(chunk);
        let loaded = match departments {
            None => insert_legacy(conn, &rows).await?,
            Some(ids) => {
                let (resolved, unresolved): (Vec<_>, Vec<_>) = rows
                    .into_iter()
                    .partition(|r| ids.contains_key(&r.department));
                if !unresolved.is_empty() {
                    warn!(
                        "Dropping {} rows whose department has no departments entry",
                        unresolved.len()
                    );
                    report.rows_dropped += unresolved.len();
                }
                insert_normalized(conn, &resolved, ids).await?
            }
        };

        report.chunks += 1;
        report.rows_loaded += loaded;
        info!(
            "Loaded chunk {}: {} rows (Total: {})",
            report.chunks, loaded, report.rows_loaded
        );
        Ok(())
    }

    /// Insert the distinct non-empty department values of the CSV into the
    /// departments table, creating it when absent. Returns the number of new rows.
    pub async fn populate_departments(&self, path: &Path) -> LoaderResult<u64> {
        info!("Extracting unique departments from {}", path.display());

        let (mut reader, index) = Self::open_reader(path)?;
        let mut names = BTreeSet::new();
        for result in reader.records() {
            let record = result?;
            let department = index.field(&record, "department");
            if !department.is_empty() {
                names.insert(department.to_string());
            }
        }

        info!("Found {} unique departments: {:?}", names.len(), names);

        let mut conn = self.pool.acquire().await.map_err(StorageError::Sqlx)?;
        let mut tx = conn.begin().await?;
        schema::create_departments(&mut tx).await?;

        let mut inserted = 0;
        for name in &names {
            inserted += sqlx::query("INSERT OR IGNORE INTO departments (name) VALUES (?)")
                .bind(name)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;

        info!("Departments table populated ({} new)", inserted);
        Ok(inserted)
    }

    /// Report counts that show whether the load went well
    pub async fn verify(&self) -> LoaderResult<LoadSummary> {
        let mut conn = self.pool.acquire().await.map_err(StorageError::Sqlx)?;

        let total_products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&mut *conn)
            .await?;
        info!("Total products in database: {}", total_products);

        let invalid_prices: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE cost <= 0 OR retail_price <= 0")
                .fetch_one(&mut *conn)
                .await?;
        info!("Products with invalid prices: {}", invalid_prices);

        let total_departments = if schema::table_exists(&mut conn, DEPARTMENTS_TABLE).await? {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM departments")
                .fetch_one(&mut *conn)
                .await?;
            info!("Total departments in database: {}", count);
            Some(count)
        } else {
            None
        };

        let linked_products = match (
            total_departments,
            schema::products_layout(&mut conn).await?,
        ) {
            (Some(_), ProductsLayout::Normalized | ProductsLayout::Transitional) => {
                let count: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM products p JOIN departments d ON p.department_id = d.id",
                )
                .fetch_one(&mut *conn)
                .await?;
                info!("Products with valid department links: {}", count);
                Some(count)
            }
            _ => None,
        };

        Ok(LoadSummary {
            total_products,
            total_departments,
            invalid_prices,
            linked_products,
        })
    }
}

async fn department_ids(conn: &mut SqliteConnection) -> LoaderResult<HashMap<String, i64>> {
    let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, name FROM departments")
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.into_iter().map(|(id, name)| (name, id)).collect())
}

async fn insert_legacy(conn: &mut SqliteConnection, rows: &[ProductRecord]) -> LoaderResult<usize> {
    let mut tx = conn.begin().await?;
    for batch in rows.chunks(MAX_ROWS_PER_STATEMENT) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO products (id, cost, category, name, brand, retail_price, department, sku, distribution_center_id) ",
        );
        qb.push_values(batch, |mut b, r| {
            b.push_bind(r.id.clone())
                .push_bind(r.cost)
                .push_bind(r.category.clone())
                .push_bind(r.name.clone())
                .push_bind(r.brand.clone())
                .push_bind(r.retail_price)
                .push_bind(r.department.clone())
                .push_bind(r.sku.clone())
                .push_bind(r.distribution_center_id);
        });
        qb.build().execute(&mut *tx).await?;
    }
    tx.commit().await?;
    Ok(rows.len())
}

async fn insert_normalized(
    conn: &mut SqliteConnection,
    rows: &[ProductRecord],
    departments: &HashMap<String, i64>,
) -> LoaderResult<usize> {
    if rows.is_empty() {
        return Ok(0);
    }
    let mut tx = conn.begin().await?;
    for batch in rows.chunks(MAX_ROWS_PER_STATEMENT) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO products (id, cost, category, name, brand, retail_price, department_id, sku, distribution_center_id) ",
        );
        qb.push_values(batch, |mut b, r| {
            b.push_bind(r.id.clone())
                .push_bind(r.cost)
                .push_bind(r.category.clone())
                .push_bind(r.name.clone())
                .push_bind(r.brand.clone())
                .push_bind(r.retail_price)
                .push_bind(departments.get(&r.department).copied())
                .push_bind(r.sku.clone())
                .push_bind(r.distribution_center_id);
        });
        qb.build().execute(&mut *tx).await?;
    }
    tx.commit().await?;
    Ok(rows.len())
}
