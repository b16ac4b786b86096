// ABOUTME: Aggregate catalog statistics
// ABOUTME: Totals, price range and the most populated categories, brands and departments

use catalog_core::constants::TOP_N;
use catalog_core::round2;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::schema::{self, DEPARTMENTS_TABLE, DEPARTMENT_ID_COLUMN, PRODUCTS_TABLE};
use crate::StorageResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceStats {
    pub average_price: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrandCount {
    pub brand: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartmentCount {
    pub department: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogStats {
    pub total_products: i64,
    pub total_categories: i64,
    pub total_brands: i64,
    pub total_departments: i64,
    pub price_stats: PriceStats,
    pub top_categories: Vec<CategoryCount>,
    pub top_brands: Vec<BrandCount>,
    pub top_departments: Vec<DepartmentCount>,
}

pub struct StatsStorage {
    pool: SqlitePool,
}

impl StatsStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn collect(&self) -> StorageResult<CatalogStats> {
        debug!("Collecting catalog statistics");
        let mut conn = self.pool.acquire().await?;

        let (total_products, total_categories, total_brands): (i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(DISTINCT category), COUNT(DISTINCT brand) FROM products",
        )
        .fetch_one(&mut *conn)
        .await?;

        let (average, min, max): (Option<f64>, Option<f64>, Option<f64>) = sqlx::query_as(
            "SELECT AVG(retail_price), MIN(retail_price), MAX(retail_price) FROM products",
        )
        .fetch_one(&mut *conn)
        .await?;

        let top_categories = top_counts(&mut conn, "category")
            .await?
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect();

        let top_brands = top_counts(&mut conn, "brand")
            .await?
            .into_iter()
            .map(|(brand, count)| BrandCount { brand, count })
            .collect();

        let (total_departments, top_departments) = department_counts(&mut conn).await?;

        Ok(CatalogStats {
            total_products,
            total_categories,
            total_brands,
            total_departments,
            price_stats: PriceStats {
                average_price: average.map(round2),
                min_price: min.map(round2),
                max_price: max.map(round2),
            },
            top_categories,
            top_brands,
            top_departments,
        })
    }
}

/// The `TOP_N` most frequent values of a products column, ties by value
async fn top_counts(
    conn: &mut SqliteConnection,
    column: &'static str,
) -> StorageResult<Vec<(String, i64)>> {
    let rows = sqlx::query_as(&format!(
        "SELECT {column}, COUNT(*) AS count FROM products GROUP BY {column} \
         ORDER BY count DESC, {column} ASC LIMIT ?"
    ))
    .bind(TOP_N)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Department total and ranking; empty until departments exist and are linked
async fn department_counts(
    conn: &mut SqliteConnection,
) -> StorageResult<(i64, Vec<DepartmentCount>)> {
    if !schema::table_exists(conn, DEPARTMENTS_TABLE).await? {
        return Ok((0, Vec::new()));
    }

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM departments")
        .fetch_one(&mut *conn)
        .await?;

    let linked = schema::read_table_schema(conn, PRODUCTS_TABLE)
        .await?
        .is_some_and(|s| s.has_column(DEPARTMENT_ID_COLUMN));
    if !linked {
        return Ok((total, Vec::new()));
    }

    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT d.name, COUNT(*) AS count
        FROM products p
        JOIN departments d ON d.id = p.department_id
        GROUP BY d.id, d.name
        ORDER BY count DESC, d.name ASC
        LIMIT ?
        "#,
    )
    .bind(TOP_N)
    .fetch_all(&mut *conn)
    .await?;

    let top = rows
        .into_iter()
        .map(|(department, count)| DepartmentCount { department, count })
        .collect();
    Ok((total, top))
}
