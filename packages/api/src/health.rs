use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;
use tracing::warn;

use crate::state::DbState;

pub const SERVICE_NAME: &str = "catalog-api";

pub async fn health_check(State(db): State<DbState>) -> impl IntoResponse {
    let database_ok = sqlx::query("SELECT 1").execute(&db.pool).await.is_ok();
    if !database_ok {
        warn!("Health check could not reach the database");
    }

    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if database_ok { "healthy" } else { "unhealthy" },
            "timestamp": Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION"),
            "service": SERVICE_NAME,
        })),
    )
}

/// API description served at the root path
pub async fn index() -> impl IntoResponse {
    Json(json!({
        "message": "Products REST API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /api/health": "Service health",
            "GET /api/products": "List products (with pagination and filters)",
            "GET /api/products/{id}": "Get a product by id",
            "GET /api/products/stats": "Product statistics",
            "GET /api/departments": "List departments with product counts",
            "GET /api/departments/{id}": "Get a department by id",
            "GET /api/departments/{id}/products": "List the products of a department",
            "GET /api/categories": "All product categories",
            "GET /api/brands": "All product brands"
        },
        "query_parameters": {
            "page": "Page number (default: 1)",
            "limit": "Items per page (default: 10, max: 100)",
            "category": "Filter by category",
            "brand": "Filter by brand",
            "department_id": "Filter by department id",
            "department_name": "Filter by department name",
            "include_details": "Include department timestamps (departments list only)"
        }
    }))
}
