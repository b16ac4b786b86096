// ABOUTME: Integration tests for the catalog HTTP endpoints
// ABOUTME: Exercises pagination, filters, department scoping and error bodies through the router

mod common;

use axum::http::StatusCode;
use common::setup_test_app;
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn test_index_and_health() {
    let app = setup_test_app().await;

    let (status, body) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Products REST API");
    assert!(body["endpoints"]["GET /api/products"].is_string());

    let (status, body) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "catalog-api");
    assert!(body["timestamp"].is_string());
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_products_paginate_filtered_results() {
    let app = setup_test_app().await;

    let (status, body) = app.get("/api/products?category=Jeans&limit=2&page=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["products"].as_array().unwrap().len(), 2);
    assert_eq!(
        body["pagination"],
        json!({
            "page": 1,
            "limit": 2,
            "total_count": 5,
            "total_pages": 3,
            "has_next": true,
            "has_prev": false
        })
    );
    assert_eq!(
        body["filters"],
        json!({
            "category": "Jeans",
            "brand": null,
            "department_id": null,
            "department_name": null
        })
    );

    let first = &body["products"][0];
    assert_eq!(first["id"], "1");
    assert_eq!(first["department"], json!({"id": 1, "name": "Men"}));
    assert_eq!(first["profit_margin"], 30.0);
    assert_eq!(first["profit_margin_percentage"], 75.0);
}

#[tokio::test]
async fn test_products_clamp_and_default_pagination() {
    let app = setup_test_app().await;

    let (status, body) = app.get("/api/products?limit=1000&page=-3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["limit"], 100);
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["products"].as_array().unwrap().len(), 8);

    let (status, body) = app.get("/api/products?limit=abc&page=xyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["limit"], 10);
    assert_eq!(body["pagination"]["page"], 1);
}

#[tokio::test]
async fn test_products_filter_by_department() {
    let app = setup_test_app().await;

    let (_, body) = app.get("/api/products?department_name=Women").await;
    assert_eq!(body["pagination"]["total_count"], 4);

    let (_, body) = app.get("/api/products?department_id=1&brand=Levi%27s").await;
    assert_eq!(body["pagination"]["total_count"], 3);

    let (status, body) = app.get("/api/products?department_id=999").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total_count"], 0);
    assert_eq!(body["products"], json!([]));
}

#[tokio::test]
async fn test_single_product() {
    let app = setup_test_app().await;

    let (status, body) = app.get("/api/products/8").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Rain Jacket");
    assert!(body["profit_margin_percentage"].is_null());

    let (status, body) = app.get("/api/products/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Product not found"}));
}

#[tokio::test]
async fn test_product_stats() {
    let app = setup_test_app().await;

    let (status, body) = app.get("/api/products/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_products"], 8);
    assert_eq!(body["total_departments"], 2);
    assert_eq!(
        body["price_stats"],
        json!({"average_price": 26.0, "min_price": 0.0, "max_price": 45.0})
    );
    assert_eq!(body["top_categories"][0], json!({"category": "Jeans", "count": 5}));
    assert_eq!(body["top_departments"][0], json!({"department": "Men", "count": 4}));
}

#[tokio::test]
async fn test_departments_list_and_details() {
    let app = setup_test_app().await;

    let (status, body) = app.get("/api/departments").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "departments": [
                {"id": 1, "name": "Men", "product_count": 4},
                {"id": 2, "name": "Women", "product_count": 4}
            ]
        })
    );

    let (_, body) = app.get("/api/departments?include_details=true").await;
    assert!(body["departments"][0]["created_at"].is_string());

    let (status, body) = app.get("/api/departments/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Women");
    assert!(body["updated_at"].is_string());

    let (status, body) = app.get("/api/departments/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Department not found"}));

    let (status, body) = app.get("/api/departments/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("abc"));
}

#[tokio::test]
async fn test_department_products() {
    let app = setup_test_app().await;

    let (status, body) = app
        .get("/api/departments/2/products?category=Jeans&limit=2&page=2")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["department"], json!({"id": 2, "name": "Women"}));
    assert_eq!(body["pagination"]["total_count"], 3);
    assert_eq!(body["pagination"]["has_prev"], true);
    assert_eq!(body["products"].as_array().unwrap().len(), 1);
    assert_eq!(body["filters"], json!({"category": "Jeans", "brand": null}));

    let (status, body) = app.get("/api/departments/1/products?brand=Nobody").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["products"], json!([]));

    let (status, body) = app.get("/api/departments/999/products").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Department not found"}));
}

#[tokio::test]
async fn test_categories_and_brands() {
    let app = setup_test_app().await;

    let (_, body) = app.get("/api/categories").await;
    assert_eq!(
        body,
        json!({"categories": ["Accessories", "Jeans", "Outerwear"]})
    );

    let (_, body) = app.get("/api/brands").await;
    assert_eq!(
        body["brands"],
        json!(["Calvin Klein", "Levi's", "MG", "North Face", "Wrangler"])
    );
}

#[tokio::test]
async fn test_unknown_route_returns_json_404() {
    let app = setup_test_app().await;

    let (status, body) = app.get("/api/nothing-here").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Endpoint not found"}));
}

#[tokio::test]
async fn test_storage_failure_returns_generic_500() {
    let app = setup_test_app().await;
    sqlx::query("DROP VIEW products_with_margin")
        .execute(app.db.pool())
        .await
        .unwrap();
    sqlx::query("DROP TABLE products")
        .execute(app.db.pool())
        .await
        .unwrap();

    let (status, body) = app.get("/api/products").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Internal server error"}));
}
