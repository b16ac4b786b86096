// ABOUTME: Department read queries with product counts
// ABOUTME: Shapes results as summary or detailed views

use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::products::DepartmentRef;
use crate::{StorageError, StorageResult};

const DEPARTMENT_COLUMNS: &str = r#"
    SELECT d.id, d.name, d.created_at, d.updated_at, COUNT(p.id) AS product_count
    FROM departments d
    LEFT JOIN products p ON p.department_id = d.id
"#;

/// How much of a department to return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepartmentDetail {
    #[default]
    Summary,
    Detailed,
}

impl DepartmentDetail {
    pub fn from_flag(include_details: bool) -> Self {
        if include_details {
            DepartmentDetail::Detailed
        } else {
            DepartmentDetail::Summary
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartmentSummary {
    pub id: i64,
    pub name: String,
    pub product_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartmentDetails {
    pub id: i64,
    pub name: String,
    pub product_count: i64,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// A department in one of its two fixed shapes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DepartmentView {
    Summary(DepartmentSummary),
    Detailed(DepartmentDetails),
}

impl DepartmentView {
    pub fn id(&self) -> i64 {
        match self {
            DepartmentView::Summary(d) => d.id,
            DepartmentView::Detailed(d) => d.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DepartmentView::Summary(d) => &d.name,
            DepartmentView::Detailed(d) => &d.name,
        }
    }

    pub fn product_count(&self) -> i64 {
        match self {
            DepartmentView::Summary(d) => d.product_count,
            DepartmentView::Detailed(d) => d.product_count,
        }
    }
}

fn row_to_view(row: &SqliteRow, detail: DepartmentDetail) -> Result<DepartmentView, sqlx::Error> {
    let id = row.try_get("id")?;
    let name = row.try_get("name")?;
    let product_count = row.try_get("product_count")?;

    Ok(match detail {
        DepartmentDetail::Summary => DepartmentView::Summary(DepartmentSummary {
            id,
            name,
            product_count,
        }),
        DepartmentDetail::Detailed => DepartmentView::Detailed(DepartmentDetails {
            id,
            name,
            product_count,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }),
    })
}

pub struct DepartmentStorage {
    pool: SqlitePool,
}

impl DepartmentStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Every department with its product count, ordered by name
    pub async fn list_departments(
        &self,
        detail: DepartmentDetail,
    ) -> StorageResult<Vec<DepartmentView>> {
        debug!("Fetching departments ({:?})", detail);

        let rows = sqlx::query(&format!(
            "{} GROUP BY d.id, d.name, d.created_at, d.updated_at ORDER BY d.name",
            DEPARTMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let departments = rows
            .iter()
            .map(|row| row_to_view(row, detail))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(departments)
    }

    pub async fn get_department(
        &self,
        department_id: i64,
        detail: DepartmentDetail,
    ) -> StorageResult<DepartmentView> {
        debug!("Fetching department: {}", department_id);

        let row = sqlx::query(&format!(
            "{} WHERE d.id = ? GROUP BY d.id, d.name, d.created_at, d.updated_at",
            DEPARTMENT_COLUMNS
        ))
        .bind(department_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::NotFound("Department"))?;

        Ok(row_to_view(&row, detail)?)
    }

    /// Id and name only; the existence check for per-department listings
    pub async fn get_department_ref(&self, department_id: i64) -> StorageResult<DepartmentRef> {
        let (id, name): (i64, String) =
            sqlx::query_as("SELECT id, name FROM departments WHERE id = ?")
                .bind(department_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(StorageError::NotFound("Department"))?;
        Ok(DepartmentRef { id, name })
    }
}
