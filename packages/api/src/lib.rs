// ABOUTME: HTTP API layer for the product catalog providing REST endpoints and routing
// ABOUTME: Read-only JSON endpoints over the storage package

use axum::{routing::get, Router};
use catalog_core::Config;
use tower_http::trace::TraceLayer;

pub mod catalog_handlers;
pub mod departments_handlers;
pub mod error;
pub mod health;
pub mod middleware;
pub mod products_handlers;
pub mod state;

pub use error::AppError;
pub use state::DbState;

/// Creates the catalog API router
pub fn create_api_router() -> Router<DbState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/products", get(products_handlers::list_products))
        .route("/products/stats", get(products_handlers::get_stats))
        .route("/products/{id}", get(products_handlers::get_product))
        .route("/departments", get(departments_handlers::list_departments))
        .route("/departments/{id}", get(departments_handlers::get_department))
        .route(
            "/departments/{id}/products",
            get(departments_handlers::list_department_products),
        )
        .route("/categories", get(catalog_handlers::list_categories))
        .route("/brands", get(catalog_handlers::list_brands))
}

/// Full application: API routes, the root description, the JSON 404 fallback
/// and the CORS, tracing and panic layers
pub fn create_router(
    state: DbState,
    config: &Config,
) -> Result<Router, axum::http::header::InvalidHeaderValue> {
    let cors = middleware::cors_layer(config)?;

    Ok(Router::new()
        .route("/", get(health::index))
        .nest("/api", create_api_router())
        .fallback(error::endpoint_not_found)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::create_panic_handler()))
}
