//! Stock editor and product intake.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use pg_delivery_core::{PRODUCTS, Product};
use pg_delivery_docstore::{DocumentStore, MemoryObjectStorage, MemoryStore};
use pg_delivery_integration_tests::{TestClient, admin_app, multipart_body, seed_product};

const BOUNDARY: &str = "pgd-test-boundary";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\nnot really a png";

async fn stock_of(store: &MemoryStore, id: &str) -> i64 {
    let doc = store.get(PRODUCTS, id).await.unwrap().unwrap();
    doc.data["stock"].as_i64().unwrap()
}

async fn operator(store: &MemoryStore, objects: &MemoryObjectStorage) -> TestClient {
    let mut client = TestClient::new(admin_app(store, objects));
    client.login().await;
    client
}

#[tokio::test]
async fn test_stock_editor_lists_products() {
    let store = MemoryStore::new();
    seed_product(&store, "chips", "Chips", 20, 5).await;
    seed_product(&store, "cola", "Cola", 40, 0).await;
    let mut operator = operator(&store, &MemoryObjectStorage::default()).await;

    let page = operator.get("/admin/products").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Chips"));
    assert!(page.body.contains("Current Stock: 5"));
    assert!(page.body.contains("Current Stock: 0"));
    assert!(page.body.contains("disabled"));
}

#[tokio::test]
async fn test_increment_and_decrement_by_one() {
    let store = MemoryStore::new();
    seed_product(&store, "chips", "Chips", 20, 5).await;
    let mut operator = operator(&store, &MemoryObjectStorage::default()).await;

    let up = operator
        .post_form(
            "/admin/products/chips/stock",
            &[("adjustment", "increment"), ("observed", "5")],
        )
        .await;
    assert_eq!(up.status, StatusCode::SEE_OTHER);
    assert_eq!(up.location(), Some("/admin/products"));
    assert_eq!(stock_of(&store, "chips").await, 6);

    operator
        .post_form(
            "/admin/products/chips/stock",
            &[("adjustment", "decrement"), ("observed", "6")],
        )
        .await;
    assert_eq!(stock_of(&store, "chips").await, 5);
}

#[tokio::test]
async fn test_decrement_at_zero_is_rejected() {
    let store = MemoryStore::new();
    seed_product(&store, "cola", "Cola", 40, 0).await;
    let mut operator = operator(&store, &MemoryObjectStorage::default()).await;

    let response = operator
        .post_form(
            "/admin/products/cola/stock",
            &[("adjustment", "decrement"), ("observed", "0")],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(store.write_count(), 0);
    assert_eq!(stock_of(&store, "cola").await, 0);

    let page = operator.get("/admin/products").await;
    assert!(page.body.contains("Stock is already 0."));
}

#[tokio::test]
async fn test_stale_decrement_stops_at_zero() {
    let store = MemoryStore::new();
    seed_product(&store, "cola", "Cola", 40, 0).await;
    let mut operator = operator(&store, &MemoryObjectStorage::default()).await;

    // The page still showed one unit when the last one sold
    operator
        .post_form(
            "/admin/products/cola/stock",
            &[("adjustment", "decrement"), ("observed", "1")],
        )
        .await;
    assert_eq!(stock_of(&store, "cola").await, 0);

    let page = operator.get("/admin/products").await;
    assert!(page.body.contains("Stock is already 0."));
}

#[tokio::test]
async fn test_intake_creates_product_with_uploaded_image() {
    let store = MemoryStore::new();
    let objects = MemoryObjectStorage::default();
    let mut operator = operator(&store, &objects).await;

    let form = operator.get("/admin/products/add").await;
    assert_eq!(form.status, StatusCode::OK);
    assert!(form.body.contains("multipart/form-data"));

    let body = multipart_body(
        BOUNDARY,
        &[
            ("name", "Maggi"),
            ("price", "15"),
            ("stock", "10"),
            ("category", "Noodles"),
        ],
        Some(("maggi.png", "image/png", PNG)),
    );
    let response = operator
        .post_multipart("/admin/products/add", body, BOUNDARY)
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER, "{}", response.body);
    assert_eq!(response.location(), Some("/admin/products"));
    assert_eq!(objects.upload_count(), 1);

    let products: Vec<Product> = store
        .list(PRODUCTS)
        .await
        .unwrap()
        .iter()
        .map(|doc| doc.decode().unwrap())
        .collect();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].name, "Maggi");
    assert_eq!(products[0].stock, 10);
    assert_eq!(products[0].category, "Noodles");
    assert!(products[0].image_url.starts_with("https://objects.test/"));
    assert!(products[0].created_at.is_some());
}

#[tokio::test]
async fn test_intake_rejects_non_image_without_uploading() {
    let store = MemoryStore::new();
    let objects = MemoryObjectStorage::default();
    let mut operator = operator(&store, &objects).await;

    let body = multipart_body(
        BOUNDARY,
        &[
            ("name", "Maggi"),
            ("price", "15"),
            ("stock", "10"),
            ("category", "Noodles"),
        ],
        Some(("notes.txt", "text/plain", b"hello")),
    );
    let response = operator
        .post_multipart("/admin/products/add", body, BOUNDARY)
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("Please upload a valid image."));
    assert!(response.body.contains("Maggi"));
    assert_eq!(objects.upload_count(), 0);
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_intake_requires_every_field() {
    let store = MemoryStore::new();
    let objects = MemoryObjectStorage::default();
    let mut operator = operator(&store, &objects).await;

    let body = multipart_body(
        BOUNDARY,
        &[("name", "Maggi"), ("stock", "10"), ("category", "Noodles")],
        Some(("maggi.png", "image/png", PNG)),
    );
    let response = operator
        .post_multipart("/admin/products/add", body, BOUNDARY)
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("All fields are required."));
    assert_eq!(objects.upload_count(), 0);
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_intake_upload_failure_creates_nothing() {
    let store = MemoryStore::new();
    let objects = MemoryObjectStorage::default();
    objects.set_fail(true);
    let mut operator = operator(&store, &objects).await;

    let body = multipart_body(
        BOUNDARY,
        &[
            ("name", "Maggi"),
            ("price", "15"),
            ("stock", "10"),
            ("category", "Noodles"),
        ],
        Some(("maggi.png", "image/png", PNG)),
    );
    let response = operator
        .post_multipart("/admin/products/add", body, BOUNDARY)
        .await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert!(response.body.contains("Failed to add product. Please try again."));
    assert_eq!(store.write_count(), 0);
}
