// ABOUTME: HTTP request handlers for product listing, lookup and statistics
// ABOUTME: Turns query strings into filters and pagination and shapes the JSON replies

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use catalog_core::pagination::deserialize_lenient_i64;
use catalog_core::{PaginationMeta, PaginationParams};
use catalog_storage::{Product, ProductFilter};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::state::DbState;

/// Query string accepted by product listings
#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub limit: Option<i64>,
    pub category: Option<String>,
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub department_id: Option<i64>,
    pub department_name: Option<String>,
}

impl ProductsQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams::from_options(self.page, self.limit)
    }

    pub fn filter(&self) -> ProductFilter {
        ProductFilter {
            category: self.category.clone(),
            brand: self.brand.clone(),
            department_id: self.department_id,
            department_name: self.department_name.clone(),
        }
        .normalized()
    }
}

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<Product>,
    pub pagination: PaginationMeta,
    pub filters: ProductFilter,
}

/// List products with pagination and optional equality filters
pub async fn list_products(
    State(db): State<DbState>,
    Query(query): Query<ProductsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let pagination = query.pagination();
    let filter = query.filter();
    info!("Listing products (filters: {:?})", filter);

    let (products, total) = db
        .product_storage
        .list_products(&filter, &pagination)
        .await?;

    Ok(Json(ProductListResponse {
        products,
        pagination: PaginationMeta::new(&pagination, total),
        filters: filter,
    }))
}

/// Get a single product by id
pub async fn get_product(
    State(db): State<DbState>,
    Path(product_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    info!("Getting product: {}", product_id);

    let product = db.product_storage.get_product(&product_id).await?;
    Ok(Json(product))
}

/// Aggregate catalog statistics
pub async fn get_stats(State(db): State<DbState>) -> Result<impl IntoResponse, AppError> {
    let stats = db.stats_storage.collect().await?;
    Ok(Json(stats))
}
