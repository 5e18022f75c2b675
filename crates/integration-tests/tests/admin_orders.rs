//! Live order feed: orders placed on the storefront reach the dashboard,
//! delivered marks show up in the next frame, logout ends the feed.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use pg_delivery_core::{ORDERS, Order, OrderStatus};
use pg_delivery_docstore::{DocumentStore, MemoryObjectStorage, MemoryStore};
use pg_delivery_integration_tests::{
    TestClient, admin_app, next_event, seed_product, storefront_app, stream_ends,
};

async fn place_chips_order(store: &MemoryStore) -> Order {
    let mut visitor = TestClient::new(storefront_app(store));
    visitor.post_form("/cart/add", &[("product_id", "chips")]).await;
    let placed = visitor
        .post_form(
            "/checkout",
            &[
                ("phone", "9876543210"),
                ("room", "12"),
                ("floor", "2nd"),
                ("building", "Sunrise Hostel"),
            ],
        )
        .await;
    assert_eq!(placed.status, StatusCode::SEE_OTHER);

    let docs = store.list(ORDERS).await.unwrap();
    docs.last().unwrap().decode().unwrap()
}

#[tokio::test]
async fn test_dashboard_lists_orders() {
    let store = MemoryStore::new();
    seed_product(&store, "chips", "Chips", 20, 5).await;
    let order = place_chips_order(&store).await;
    let mut operator = TestClient::new(admin_app(&store, &MemoryObjectStorage::default()));
    operator.login().await;

    let dashboard = operator.get("/admin").await;
    assert_eq!(dashboard.status, StatusCode::OK);
    assert!(dashboard.body.contains(order.id.as_str()));
    assert!(dashboard.body.contains("Room 12, 2nd floor, Sunrise Hostel"));
    assert!(dashboard.body.contains("1 &times; Chips"));
    assert!(dashboard.body.contains("mark-delivered"));
}

#[tokio::test]
async fn test_feed_pushes_new_orders_and_delivered_marks() {
    let store = MemoryStore::new();
    seed_product(&store, "chips", "Chips", 20, 5).await;
    let mut operator = TestClient::new(admin_app(&store, &MemoryObjectStorage::default()));
    operator.login().await;

    let response = operator.open("/admin/orders/stream").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );
    let mut body = response.into_body();

    let initial = next_event(&mut body, "orders").await.unwrap();
    assert!(initial.contains("No orders yet."));

    let order = place_chips_order(&store).await;
    let placed = next_event(&mut body, "orders").await.unwrap();
    assert!(placed.contains(order.id.as_str()));
    assert!(placed.contains("status-pending"));

    let marked = operator
        .post_form(&format!("/admin/orders/{}/delivered", order.id), &[])
        .await;
    assert_eq!(marked.status, StatusCode::NO_CONTENT);

    let delivered = next_event(&mut body, "orders").await.unwrap();
    assert!(delivered.contains("status-delivered"));
    assert!(!delivered.contains("mark-delivered"));

    let stored: Order = store
        .get(ORDERS, order.id.as_str())
        .await
        .unwrap()
        .unwrap()
        .decode()
        .unwrap();
    assert_eq!(stored.status, OrderStatus::Delivered);
}

#[tokio::test]
async fn test_mark_delivered_twice_writes_once() {
    let store = MemoryStore::new();
    seed_product(&store, "chips", "Chips", 20, 5).await;
    let order = place_chips_order(&store).await;
    let mut operator = TestClient::new(admin_app(&store, &MemoryObjectStorage::default()));
    operator.login().await;
    let path = format!("/admin/orders/{}/delivered", order.id);

    assert_eq!(operator.post_form(&path, &[]).await.status, StatusCode::NO_CONTENT);
    let writes = store.write_count();
    assert_eq!(operator.post_form(&path, &[]).await.status, StatusCode::NO_CONTENT);
    assert_eq!(store.write_count(), writes);
}

#[tokio::test]
async fn test_mark_delivered_unknown_order() {
    let store = MemoryStore::new();
    let mut operator = TestClient::new(admin_app(&store, &MemoryObjectStorage::default()));
    operator.login().await;

    let response = operator
        .post_form("/admin/orders/no-such-order/delivered", &[])
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_logout_ends_feed() {
    let store = MemoryStore::new();
    let mut operator = TestClient::new(admin_app(&store, &MemoryObjectStorage::default()));
    operator.login().await;

    let response = operator.open("/admin/orders/stream").await;
    let mut body = response.into_body();
    next_event(&mut body, "orders").await.unwrap();

    let logout = operator.post_form("/admin/logout", &[]).await;
    assert_eq!(logout.status, StatusCode::SEE_OTHER);
    assert!(stream_ends(&mut body).await);

    // The session is gone as well
    let dashboard = operator.get("/admin").await;
    assert!(dashboard.body.contains("name=\"password\""));
}

#[tokio::test]
async fn test_feed_reports_store_failure() {
    let store = MemoryStore::new();
    let mut operator = TestClient::new(admin_app(&store, &MemoryObjectStorage::default()));
    operator.login().await;
    store.set_fail_reads(true);

    let response = operator.open("/admin/orders/stream").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
