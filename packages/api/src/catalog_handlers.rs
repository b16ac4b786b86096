// ABOUTME: HTTP request handlers for the distinct category and brand lists

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::error::AppError;
use crate::state::DbState;

pub async fn list_categories(State(db): State<DbState>) -> Result<impl IntoResponse, AppError> {
    let categories = db.product_storage.list_categories().await?;
    Ok(Json(json!({ "categories": categories })))
}

pub async fn list_brands(State(db): State<DbState>) -> Result<impl IntoResponse, AppError> {
    let brands = db.product_storage.list_brands().await?;
    Ok(Json(json!({ "brands": brands })))
}
