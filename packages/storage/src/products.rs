// ABOUTME: Product read queries joined with their department
// ABOUTME: Filtered, paginated listing plus single lookups and distinct categories/brands

use catalog_core::{profit_margin, profit_margin_percentage, PaginationParams};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::{StorageError, StorageResult};

const PRODUCT_COLUMNS: &str = r#"
    SELECT p.id, p.name, p.brand, p.category, p.cost, p.retail_price, p.sku,
           p.distribution_center_id, p.department_id, p.created_at,
           d.name AS department_name
    FROM products p
    LEFT JOIN departments d ON d.id = p.department_id
"#;

/// Equality filters for product listings; absent fields add no predicate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub department_id: Option<i64>,
    pub department_name: Option<String>,
}

impl ProductFilter {
    /// Trim text filters and treat empty strings as absent
    pub fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            category: clean(self.category),
            brand: clean(self.brand),
            department_id: self.department_id,
            department_name: clean(self.department_name),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.brand.is_none()
            && self.department_id.is_none()
            && self.department_name.is_none()
    }

    /// Append one `AND` predicate per present filter to a query whose
    /// `WHERE 1=1` clause has already been pushed
    fn push_predicates<'a>(&'a self, qb: &mut QueryBuilder<'a, Sqlite>) {
        if let Some(category) = &self.category {
            qb.push(" AND p.category = ").push_bind(category.as_str());
        }
        if let Some(brand) = &self.brand {
            qb.push(" AND p.brand = ").push_bind(brand.as_str());
        }
        if let Some(department_id) = self.department_id {
            qb.push(" AND p.department_id = ").push_bind(department_id);
        }
        if let Some(department_name) = &self.department_name {
            qb.push(" AND d.name = ").push_bind(department_name.as_str());
        }
    }
}

/// Department reference embedded in a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartmentRef {
    pub id: i64,
    pub name: String,
}

/// A product with derived margin fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub cost: f64,
    pub retail_price: f64,
    pub sku: String,
    pub distribution_center_id: i64,
    pub department_id: Option<i64>,
    /// Present when the department reference resolves
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<DepartmentRef>,
    pub profit_margin: f64,
    pub profit_margin_percentage: Option<f64>,
    pub created_at: Option<NaiveDateTime>,
}

fn row_to_product(row: &SqliteRow) -> Result<Product, sqlx::Error> {
    let cost: f64 = row.try_get("cost")?;
    let retail_price: f64 = row.try_get("retail_price")?;
    let department_id: Option<i64> = row.try_get("department_id")?;
    let department_name: Option<String> = row.try_get("department_name")?;

    let department = match (department_id, department_name) {
        (Some(id), Some(name)) => Some(DepartmentRef { id, name }),
        _ => None,
    };

    Ok(Product {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        brand: row.try_get("brand")?,
        category: row.try_get("category")?,
        cost,
        retail_price,
        sku: row.try_get("sku")?,
        distribution_center_id: row.try_get("distribution_center_id")?,
        department_id,
        department,
        profit_margin: profit_margin(cost, retail_price),
        profit_margin_percentage: profit_margin_percentage(cost, retail_price),
        created_at: row.try_get("created_at")?,
    })
}

pub struct ProductStorage {
    pool: SqlitePool,
}

impl ProductStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// One page of products matching `filter`, ordered by id, with the total
    /// match count. The count runs first, on the same connection.
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
        pagination: &PaginationParams,
    ) -> StorageResult<(Vec<Product>, i64)> {
        let (limit, offset) = pagination.validate();
        debug!(
            "Fetching products (filter: {:?}, limit: {}, offset: {})",
            filter, limit, offset
        );

        let mut conn = self.pool.acquire().await?;
        let total = count_matching(&mut conn, filter).await?;

        let mut qb = QueryBuilder::<Sqlite>::new(PRODUCT_COLUMNS);
        qb.push(" WHERE 1=1");
        filter.push_predicates(&mut qb);
        qb.push(" ORDER BY p.id LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = qb.build().fetch_all(&mut *conn).await?;
        let products = rows
            .iter()
            .map(row_to_product)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((products, total))
    }

    /// Number of products matching `filter`
    pub async fn count_products(&self, filter: &ProductFilter) -> StorageResult<i64> {
        let mut conn = self.pool.acquire().await?;
        count_matching(&mut conn, filter).await
    }

    pub async fn get_product(&self, product_id: &str) -> StorageResult<Product> {
        debug!("Fetching product: {}", product_id);

        let row = sqlx::query(&format!("{} WHERE p.id = ?", PRODUCT_COLUMNS))
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StorageError::NotFound("Product"))?;

        Ok(row_to_product(&row)?)
    }

    /// Distinct non-empty categories, sorted
    pub async fn list_categories(&self) -> StorageResult<Vec<String>> {
        let categories = sqlx::query_scalar(
            "SELECT DISTINCT category FROM products WHERE category IS NOT NULL AND category != '' ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    /// Distinct non-empty brands, sorted
    pub async fn list_brands(&self) -> StorageResult<Vec<String>> {
        let brands = sqlx::query_scalar(
            "SELECT DISTINCT brand FROM products WHERE brand IS NOT NULL AND brand != '' ORDER BY brand",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(brands)
    }
}

async fn count_matching(conn: &mut SqliteConnection, filter: &ProductFilter) -> StorageResult<i64> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT COUNT(*) FROM products p LEFT JOIN departments d ON d.id = p.department_id WHERE 1=1",
    );
    filter.push_predicates(&mut qb);
    let total = qb.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_filter_normalization() {
        let filter = ProductFilter {
            category: Some("  Jeans ".to_string()),
            brand: Some("".to_string()),
            department_id: Some(2),
            department_name: Some("   ".to_string()),
        }
        .normalized();

        assert_eq!(filter.category.as_deref(), Some("Jeans"));
        assert_eq!(filter.brand, None);
        assert_eq!(filter.department_id, Some(2));
        assert_eq!(filter.department_name, None);
        assert!(!filter.is_empty());
        assert!(ProductFilter::default().is_empty());
    }

    #[test]
    fn test_predicates_follow_present_filters() {
        let filter = ProductFilter {
            category: Some("Jeans".to_string()),
            department_name: Some("Men".to_string()),
            ..Default::default()
        };

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM products p WHERE 1=1");
        filter.push_predicates(&mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM products p WHERE 1=1 AND p.category = ? AND d.name = ?"
        );

        let empty = ProductFilter::default();
        let mut qb = QueryBuilder::<Sqlite>::new("WHERE 1=1");
        empty.push_predicates(&mut qb);
        assert_eq!(qb.sql(), "WHERE 1=1");
    }

    #[test]
    fn test_orphaned_product_omits_department() {
        let product = Product {
            id: "1".to_string(),
            name: "Scarf".to_string(),
            brand: "MG".to_string(),
            category: "Accessories".to_string(),
            cost: 2.0,
            retail_price: 0.0,
            sku: "SKU1".to_string(),
            distribution_center_id: 1,
            department_id: Some(9),
            department: None,
            profit_margin: -2.0,
            profit_margin_percentage: None,
            created_at: None,
        };

        let json = serde_json::to_value(&product).unwrap();
        assert!(json.get("department").is_none());
        assert!(json["profit_margin_percentage"].is_null());
    }
}
