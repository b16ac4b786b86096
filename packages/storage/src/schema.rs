// ABOUTME: Table definitions and schema introspection for products and departments
// ABOUTME: Describes tables as values so the migrator can compute target schemas

use sqlx::{Row, SqliteConnection};
use tracing::debug;

use crate::StorageResult;

pub const PRODUCTS_TABLE: &str = "products";
pub const DEPARTMENTS_TABLE: &str = "departments";
pub const BACKUP_TABLE: &str = "products_backup";
pub const MARGIN_VIEW: &str = "products_with_margin";

/// Free-text department column of the pre-migration products table
pub const LEGACY_DEPARTMENT_COLUMN: &str = "department";
pub const DEPARTMENT_ID_COLUMN: &str = "department_id";

pub const CREATE_DEPARTMENTS_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS departments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name VARCHAR(255) NOT NULL UNIQUE,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )
"#;

pub const CREATE_DEPARTMENTS_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS idx_departments_name ON departments(name)";

pub const CREATE_MARGIN_VIEW_SQL: &str = r#"
    CREATE VIEW IF NOT EXISTS products_with_margin AS
    SELECT
        p.*,
        d.name AS department_name,
        (p.retail_price - p.cost) AS profit_margin,
        ROUND(((p.retail_price - p.cost) / p.retail_price * 100), 2) AS profit_margin_percentage
    FROM products p
    LEFT JOIN departments d ON p.department_id = d.id
"#;

/// One column of a table definition, as reported by `pragma_table_info`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub decl_type: String,
    pub not_null: bool,
    pub default: Option<String>,
    pub primary_key: bool,
}

impl ColumnDef {
    pub fn new(name: &str, decl_type: &str) -> Self {
        Self {
            name: name.to_string(),
            decl_type: decl_type.to_string(),
            not_null: false,
            default: None,
            primary_key: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn default_value(mut self, expr: &str) -> Self {
        self.default = Some(expr.to_string());
        self
    }

    fn to_sql(&self, single_primary_key: bool) -> String {
        let mut sql = format!("{} {}", self.name, self.decl_type);
        if self.primary_key && single_primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        sql
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDef {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
}

impl ForeignKeyDef {
    pub fn new(column: &str, references_table: &str, references_column: &str) -> Self {
        Self {
            column: column.to_string(),
            references_table: references_table.to_string(),
            references_column: references_column.to_string(),
        }
    }

    fn to_sql(&self) -> String {
        format!(
            "FOREIGN KEY ({}) REFERENCES {}({})",
            self.column, self.references_table, self.references_column
        )
    }
}

/// A table's column set and foreign keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub foreign_keys: Vec<ForeignKeyDef>,
}

impl TableSchema {
    pub fn new(name: &str, columns: Vec<ColumnDef>) -> Self {
        Self {
            name: name.to_string(),
            columns,
            foreign_keys: Vec::new(),
        }
    }

    /// `CREATE TABLE` statement for this schema under `table_name`
    pub fn create_sql(&self, table_name: &str) -> String {
        let primary_keys: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect();
        let single_pk = primary_keys.len() == 1;

        let mut parts: Vec<String> = self.columns.iter().map(|c| c.to_sql(single_pk)).collect();
        if primary_keys.len() > 1 {
            parts.push(format!("PRIMARY KEY ({})", primary_keys.join(", ")));
        }
        parts.extend(self.foreign_keys.iter().map(ForeignKeyDef::to_sql));

        format!("CREATE TABLE {} (\n    {}\n)", table_name, parts.join(",\n    "))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_foreign_key_on(&self, column: &str) -> bool {
        self.foreign_keys.iter().any(|fk| fk.column == column)
    }

    /// Same schema minus one column
    pub fn without_column(mut self, name: &str) -> Self {
        self.columns.retain(|c| c.name != name);
        self.foreign_keys.retain(|fk| fk.column != name);
        self
    }

    /// Same schema with a foreign key; the referencing column becomes NOT NULL
    pub fn with_foreign_key(mut self, fk: ForeignKeyDef) -> Self {
        for column in self.columns.iter_mut().filter(|c| c.name == fk.column) {
            column.not_null = true;
        }
        if !self.has_foreign_key_on(&fk.column) {
            self.foreign_keys.push(fk);
        }
        self
    }
}

/// Secondary index definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    pub name: &'static str,
    pub table: &'static str,
    pub column: &'static str,
}

impl IndexDef {
    pub const fn new(name: &'static str, table: &'static str, column: &'static str) -> Self {
        Self {
            name,
            table,
            column,
        }
    }

    pub fn create_sql(&self) -> String {
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {}({})",
            self.name, self.table, self.column
        )
    }
}

/// Every secondary index the products table may carry
pub const PRODUCT_INDEXES: [IndexDef; 6] = [
    IndexDef::new("idx_products_category", PRODUCTS_TABLE, "category"),
    IndexDef::new("idx_products_brand", PRODUCTS_TABLE, "brand"),
    IndexDef::new("idx_products_department", PRODUCTS_TABLE, LEGACY_DEPARTMENT_COLUMN),
    IndexDef::new("idx_products_department_id", PRODUCTS_TABLE, DEPARTMENT_ID_COLUMN),
    IndexDef::new("idx_products_distribution_center", PRODUCTS_TABLE, "distribution_center_id"),
    IndexDef::new("idx_products_sku", PRODUCTS_TABLE, "sku"),
];

/// Product indexes applicable to a given products schema
pub fn product_indexes_for(schema: &TableSchema) -> Vec<IndexDef> {
    PRODUCT_INDEXES
        .iter()
        .filter(|index| schema.has_column(index.column))
        .cloned()
        .collect()
}

/// The products table as the CSV loader first creates it
pub fn legacy_products_schema() -> TableSchema {
    TableSchema::new(
        PRODUCTS_TABLE,
        vec![
            ColumnDef::new("id", "TEXT").primary_key(),
            ColumnDef::new("cost", "REAL").not_null(),
            ColumnDef::new("category", "TEXT").not_null(),
            ColumnDef::new("name", "TEXT").not_null(),
            ColumnDef::new("brand", "TEXT").not_null(),
            ColumnDef::new("retail_price", "REAL").not_null(),
            ColumnDef::new(LEGACY_DEPARTMENT_COLUMN, "TEXT").not_null(),
            ColumnDef::new("sku", "TEXT").not_null(),
            ColumnDef::new("distribution_center_id", "INTEGER").not_null(),
            ColumnDef::new("created_at", "TIMESTAMP").default_value("CURRENT_TIMESTAMP"),
        ],
    )
}

/// Foreign key linking products to departments
pub fn department_foreign_key() -> ForeignKeyDef {
    ForeignKeyDef::new(DEPARTMENT_ID_COLUMN, DEPARTMENTS_TABLE, "id")
}

/// Shape of the products table, derived from its columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductsLayout {
    /// No products table yet
    Missing,
    /// Free-text department column only
    Legacy,
    /// Both the legacy column and department_id (mid-migration)
    Transitional,
    /// department_id only
    Normalized,
    /// Neither department column; not a table this crate created
    Unrecognized,
}

impl ProductsLayout {
    pub fn of(schema: Option<&TableSchema>) -> Self {
        match schema {
            None => ProductsLayout::Missing,
            Some(s) => match (
                s.has_column(LEGACY_DEPARTMENT_COLUMN),
                s.has_column(DEPARTMENT_ID_COLUMN),
            ) {
                (true, false) => ProductsLayout::Legacy,
                (true, true) => ProductsLayout::Transitional,
                (false, true) => ProductsLayout::Normalized,
                (false, false) => ProductsLayout::Unrecognized,
            },
        }
    }
}

pub async fn table_exists(conn: &mut SqliteConnection, name: &str) -> StorageResult<bool> {
    let exists: i64 = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;
    Ok(exists != 0)
}

/// Read a table's columns and foreign keys; `None` when the table does not exist
pub async fn read_table_schema(
    conn: &mut SqliteConnection,
    table: &str,
) -> StorageResult<Option<TableSchema>> {
    let rows = sqlx::query(
        r#"SELECT name, type, "notnull", dflt_value, pk FROM pragma_table_info(?) ORDER BY cid"#,
    )
    .bind(table)
    .fetch_all(&mut *conn)
    .await?;

    if rows.is_empty() {
        return Ok(None);
    }

    let columns = rows
        .iter()
        .map(|row| {
            Ok(ColumnDef {
                name: row.try_get("name")?,
                decl_type: row.try_get("type")?,
                not_null: row.try_get::<i64, _>("notnull")? != 0,
                default: row.try_get("dflt_value")?,
                primary_key: row.try_get::<i64, _>("pk")? > 0,
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

    let fk_rows = sqlx::query(
        r#"SELECT "from", "table", "to" FROM pragma_foreign_key_list(?) ORDER BY id, seq"#,
    )
    .bind(table)
    .fetch_all(&mut *conn)
    .await?;

    let foreign_keys = fk_rows
        .iter()
        .map(|row| {
            Ok(ForeignKeyDef {
                column: row.try_get("from")?,
                references_table: row.try_get("table")?,
                references_column: row.try_get("to")?,
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

    debug!(
        "Read schema for {}: {} columns, {} foreign keys",
        table,
        columns.len(),
        foreign_keys.len()
    );

    Ok(Some(TableSchema {
        name: table.to_string(),
        columns,
        foreign_keys,
    }))
}

pub async fn products_layout(conn: &mut SqliteConnection) -> StorageResult<ProductsLayout> {
    let schema = read_table_schema(conn, PRODUCTS_TABLE).await?;
    Ok(ProductsLayout::of(schema.as_ref()))
}

/// Create the pre-migration products table and its indexes
pub async fn create_legacy_products(conn: &mut SqliteConnection) -> StorageResult<()> {
    let schema = legacy_products_schema();
    let create = schema
        .create_sql(PRODUCTS_TABLE)
        .replacen("CREATE TABLE", "CREATE TABLE IF NOT EXISTS", 1);
    sqlx::query(&create).execute(&mut *conn).await?;

    for index in product_indexes_for(&schema) {
        sqlx::query(&index.create_sql()).execute(&mut *conn).await?;
    }
    Ok(())
}

/// Create the departments lookup table and its name index
pub async fn create_departments(conn: &mut SqliteConnection) -> StorageResult<()> {
    sqlx::query(CREATE_DEPARTMENTS_SQL).execute(&mut *conn).await?;
    sqlx::query(CREATE_DEPARTMENTS_INDEX_SQL)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_legacy_create_sql() {
        let sql = legacy_products_schema().create_sql("products_new");
        assert!(sql.starts_with("CREATE TABLE products_new ("));
        assert!(sql.contains("id TEXT PRIMARY KEY"));
        assert!(sql.contains("department TEXT NOT NULL"));
        assert!(sql.contains("created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP"));
        assert!(!sql.contains("FOREIGN KEY"));
    }

    #[test]
    fn test_without_column() {
        let schema = legacy_products_schema().without_column(LEGACY_DEPARTMENT_COLUMN);
        assert!(!schema.has_column(LEGACY_DEPARTMENT_COLUMN));
        assert_eq!(schema.columns.len(), 9);
        assert_eq!(schema.column_names()[0], "id");
    }

    #[test]
    fn test_with_foreign_key_sets_not_null() {
        let mut schema = legacy_products_schema().without_column(LEGACY_DEPARTMENT_COLUMN);
        schema
            .columns
            .push(ColumnDef::new(DEPARTMENT_ID_COLUMN, "INTEGER"));

        let schema = schema
            .with_foreign_key(department_foreign_key())
            .with_foreign_key(department_foreign_key());

        assert_eq!(schema.foreign_keys.len(), 1);
        let column = schema
            .columns
            .iter()
            .find(|c| c.name == DEPARTMENT_ID_COLUMN)
            .unwrap();
        assert!(column.not_null);

        let sql = schema.create_sql(PRODUCTS_TABLE);
        assert!(sql.contains("department_id INTEGER NOT NULL"));
        assert!(sql.contains("FOREIGN KEY (department_id) REFERENCES departments(id)"));
    }

    #[test]
    fn test_indexes_follow_columns() {
        let legacy = legacy_products_schema();
        let names: Vec<&str> = product_indexes_for(&legacy).iter().map(|i| i.name).collect();
        assert!(names.contains(&"idx_products_department"));
        assert!(!names.contains(&"idx_products_department_id"));

        let mut normalized = legacy.without_column(LEGACY_DEPARTMENT_COLUMN);
        normalized
            .columns
            .push(ColumnDef::new(DEPARTMENT_ID_COLUMN, "INTEGER"));
        let names: Vec<&str> = product_indexes_for(&normalized)
            .iter()
            .map(|i| i.name)
            .collect();
        assert!(!names.contains(&"idx_products_department"));
        assert!(names.contains(&"idx_products_department_id"));
    }

    #[test]
    fn test_layout_detection() {
        assert_eq!(ProductsLayout::of(None), ProductsLayout::Missing);

        let legacy = legacy_products_schema();
        assert_eq!(ProductsLayout::of(Some(&legacy)), ProductsLayout::Legacy);

        let mut transitional = legacy.clone();
        transitional
            .columns
            .push(ColumnDef::new(DEPARTMENT_ID_COLUMN, "INTEGER"));
        assert_eq!(
            ProductsLayout::of(Some(&transitional)),
            ProductsLayout::Transitional
        );

        let normalized = transitional.without_column(LEGACY_DEPARTMENT_COLUMN);
        assert_eq!(
            ProductsLayout::of(Some(&normalized)),
            ProductsLayout::Normalized
        );

        let bare = normalized.without_column(DEPARTMENT_ID_COLUMN);
        assert_eq!(
            ProductsLayout::of(Some(&bare)),
            ProductsLayout::Unrecognized
        );
    }
}
