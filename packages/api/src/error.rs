// ABOUTME: Error type returned by every handler
// ABOUTME: Maps storage failures to HTTP status codes with a JSON error body

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use catalog_storage::StorageError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    /// A known resource kind that does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Endpoint not found")]
    EndpointNotFound,

    #[error("Internal server error")]
    Storage(#[source] StorageError),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => AppError::NotFound(what),
            other => AppError::Storage(other),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) | AppError::EndpointNotFound => StatusCode::NOT_FOUND,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Storage(source) = &self {
            // Detail stays in the log; clients get the generic message
            error!("Storage error while handling request: {}", source);
        }

        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Fallback for unmatched routes
pub async fn endpoint_not_found() -> AppError {
    AppError::EndpointNotFound
}

/// Parse an integer path segment, rejecting anything else with a 400
pub fn parse_id(raw: &str, what: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::BadRequest(format!("Invalid {} id: {}", what, raw)))
}
