// ABOUTME: Integration tests for product, department and stats queries
// ABOUTME: Runs against a loaded and migrated fixture catalog

mod common;

use catalog_core::{PaginationMeta, PaginationParams};
use catalog_storage::{
    DepartmentDetail, DepartmentStorage, DepartmentView, ProductFilter, ProductStorage,
    StatsStorage, StorageError,
};
use common::{empty_catalog, migrated_catalog};
use pretty_assertions::assert_eq;

fn jeans() -> ProductFilter {
    ProductFilter {
        category: Some("Jeans".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_filtered_pagination() {
    let catalog = migrated_catalog().await;
    let products = ProductStorage::new(catalog.pool());
    let params = PaginationParams::with_page_and_limit(1, 2);

    let (page, total) = products.list_products(&jeans(), &params).await.unwrap();

    assert_eq!(total, 5);
    let ids: Vec<&str> = page.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);

    let meta = PaginationMeta::new(&params, total);
    assert_eq!(meta.total_pages, 3);
    assert!(meta.has_next);
    assert!(!meta.has_prev);

    let last = PaginationParams::with_page_and_limit(3, 2);
    let (page, _) = products.list_products(&jeans(), &last).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, "5");
}

#[tokio::test]
async fn test_count_matches_listing() {
    let catalog = migrated_catalog().await;
    let products = ProductStorage::new(catalog.pool());

    let filter = ProductFilter {
        brand: Some("Levi's".to_string()),
        department_name: Some("Men".to_string()),
        ..Default::default()
    };
    let (page, total) = products
        .list_products(&filter, &PaginationParams::default())
        .await
        .unwrap();

    assert_eq!(total, 3);
    assert_eq!(page.len(), 3);
    assert_eq!(products.count_products(&filter).await.unwrap(), 3);
    assert!(page
        .iter()
        .all(|p| p.department.as_ref().is_some_and(|d| d.name == "Men")));
}

#[tokio::test]
async fn test_unknown_department_id_matches_nothing() {
    let catalog = migrated_catalog().await;
    let products = ProductStorage::new(catalog.pool());

    let filter = ProductFilter {
        department_id: Some(999),
        ..Default::default()
    };
    let (page, total) = products
        .list_products(&filter, &PaginationParams::default())
        .await
        .unwrap();

    assert_eq!(total, 0);
    assert!(page.is_empty());
}

#[tokio::test]
async fn test_get_product_derives_margins() {
    let catalog = migrated_catalog().await;
    let products = ProductStorage::new(catalog.pool());

    let product = products.get_product("1").await.unwrap();
    assert_eq!(product.name, "Slim Jeans");
    assert_eq!(product.profit_margin, 30.0);
    assert_eq!(product.profit_margin_percentage, Some(75.0));
    assert_eq!(product.department.as_ref().map(|d| d.name.as_str()), Some("Men"));
    assert!(product.created_at.is_some());

    let free = products.get_product("8").await.unwrap();
    assert_eq!(free.profit_margin, -20.0);
    assert_eq!(free.profit_margin_percentage, None);

    let err = products.get_product("missing").await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound("Product")));
}

#[tokio::test]
async fn test_distinct_categories_and_brands() {
    let catalog = migrated_catalog().await;
    let products = ProductStorage::new(catalog.pool());

    assert_eq!(
        products.list_categories().await.unwrap(),
        vec!["Accessories", "Jeans", "Outerwear"]
    );
    assert_eq!(
        products.list_brands().await.unwrap(),
        vec!["Calvin Klein", "Levi's", "MG", "North Face", "Wrangler"]
    );
}

#[tokio::test]
async fn test_departments_with_product_counts() {
    let catalog = migrated_catalog().await;
    let departments = DepartmentStorage::new(catalog.pool());

    let summaries = departments
        .list_departments(DepartmentDetail::Summary)
        .await
        .unwrap();
    let counts: Vec<(&str, i64)> = summaries
        .iter()
        .map(|d| (d.name(), d.product_count()))
        .collect();
    assert_eq!(counts, vec![("Men", 4), ("Women", 4)]);
    assert!(matches!(summaries[0], DepartmentView::Summary(_)));

    let men = summaries[0].id();
    let detailed = departments
        .get_department(men, DepartmentDetail::Detailed)
        .await
        .unwrap();
    match detailed {
        DepartmentView::Detailed(d) => {
            assert_eq!(d.name, "Men");
            assert!(d.created_at.is_some());
        }
        other => panic!("expected detailed view, got {:?}", other),
    }

    let reference = departments.get_department_ref(men).await.unwrap();
    assert_eq!(reference.name, "Men");

    let err = departments
        .get_department(999, DepartmentDetail::Detailed)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound("Department")));
    assert!(departments.get_department_ref(999).await.is_err());
}

#[tokio::test]
async fn test_stats_rank_with_name_tie_break() {
    let catalog = migrated_catalog().await;
    let stats = StatsStorage::new(catalog.pool()).collect().await.unwrap();

    assert_eq!(stats.total_products, 8);
    assert_eq!(stats.total_categories, 3);
    assert_eq!(stats.total_brands, 5);
    assert_eq!(stats.total_departments, 2);

    assert_eq!(stats.price_stats.average_price, Some(26.0));
    assert_eq!(stats.price_stats.min_price, Some(0.0));
    assert_eq!(stats.price_stats.max_price, Some(45.0));

    assert_eq!(stats.top_categories[0].category, "Jeans");
    assert_eq!(stats.top_categories[0].count, 5);

    let brands: Vec<&str> = stats.top_brands.iter().map(|b| b.brand.as_str()).collect();
    assert_eq!(
        brands,
        vec!["Levi's", "Calvin Klein", "MG", "North Face", "Wrangler"]
    );

    let departments: Vec<(&str, i64)> = stats
        .top_departments
        .iter()
        .map(|d| (d.department.as_str(), d.count))
        .collect();
    assert_eq!(departments, vec![("Men", 4), ("Women", 4)]);
}

#[tokio::test]
async fn test_stats_on_empty_catalog() {
    let catalog = empty_catalog().await;
    catalog
        .loader()
        .load_csv(&catalog.write_csv(
            "empty.csv",
            "id,cost,category,name,brand,retail_price,department,sku,distribution_center_id\n",
        ))
        .await
        .unwrap();

    let stats = StatsStorage::new(catalog.pool()).collect().await.unwrap();
    assert_eq!(stats.total_products, 0);
    assert_eq!(stats.price_stats.average_price, None);
    assert_eq!(stats.price_stats.max_price, None);
    assert!(stats.top_categories.is_empty());
    assert!(stats.top_departments.is_empty());
}
