// ABOUTME: HTTP request handlers for departments and their products
// ABOUTME: Department existence is checked before any product query runs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use catalog_core::PaginationMeta;
use catalog_storage::{DepartmentDetail, DepartmentRef, DepartmentView, Product, ProductFilter};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{parse_id, AppError};
use crate::products_handlers::ProductsQuery;
use crate::state::DbState;

#[derive(Debug, Default, Deserialize)]
pub struct ListDepartmentsQuery {
    pub include_details: Option<String>,
}

impl ListDepartmentsQuery {
    pub fn detail(&self) -> DepartmentDetail {
        let include = self
            .include_details
            .as_deref()
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
        DepartmentDetail::from_flag(include)
    }
}

#[derive(Debug, Serialize)]
pub struct DepartmentListResponse {
    pub departments: Vec<DepartmentView>,
}

/// Filters echoed by the per-department product listing
#[derive(Debug, Serialize)]
pub struct DepartmentProductFilters {
    pub category: Option<String>,
    pub brand: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DepartmentProductsResponse {
    pub department: DepartmentRef,
    pub products: Vec<Product>,
    pub pagination: PaginationMeta,
    pub filters: DepartmentProductFilters,
}

/// List all departments with product counts
pub async fn list_departments(
    State(db): State<DbState>,
    Query(query): Query<ListDepartmentsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let detail = query.detail();
    info!("Listing departments ({:?})", detail);

    let departments = db.department_storage.list_departments(detail).await?;
    Ok(Json(DepartmentListResponse { departments }))
}

/// Get a single department with its product count and timestamps
pub async fn get_department(
    State(db): State<DbState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let department_id = parse_id(&raw_id, "department")?;
    info!("Getting department: {}", department_id);

    let department = db
        .department_storage
        .get_department(department_id, DepartmentDetail::Detailed)
        .await?;
    Ok(Json(department))
}

/// List the products of one department, optionally narrowed by category and brand
pub async fn list_department_products(
    State(db): State<DbState>,
    Path(raw_id): Path<String>,
    Query(query): Query<ProductsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let department_id = parse_id(&raw_id, "department")?;
    info!("Listing products for department: {}", department_id);

    let department = db
        .department_storage
        .get_department_ref(department_id)
        .await?;

    let scoped = ProductFilter {
        category: query.category.clone(),
        brand: query.brand.clone(),
        department_id: Some(department.id),
        department_name: None,
    }
    .normalized();
    let pagination = query.pagination();

    let (products, total) = db
        .product_storage
        .list_products(&scoped, &pagination)
        .await?;

    Ok(Json(DepartmentProductsResponse {
        department,
        products,
        pagination: PaginationMeta::new(&pagination, total),
        filters: DepartmentProductFilters {
            category: scoped.category,
            brand: scoped.brand,
        },
    }))
}
