//! Cross-cutting layers: CORS and panic recovery

use std::any::Any;

use axum::{
    http::{header::InvalidHeaderValue, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use catalog_core::Config;
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tracing::error;

/// CORS for a read-only API; `*` allows any origin
pub fn cors_layer(config: &Config) -> Result<CorsLayer, InvalidHeaderValue> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(AnyOrigin);

    if config.allows_any_origin() {
        Ok(cors.allow_origin(AnyOrigin))
    } else {
        Ok(cors.allow_origin(config.cors_origin.parse::<HeaderValue>()?))
    }
}

/// Create a panic handler that answers with the generic 500 body
pub fn create_panic_handler() -> CatchPanicLayer<fn(Box<dyn Any + Send + 'static>) -> Response> {
    CatchPanicLayer::custom(handle_panic as fn(Box<dyn Any + Send + 'static>) -> Response)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let panic_message = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic occurred"
    };

    error!(panic_message = %panic_message, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}
