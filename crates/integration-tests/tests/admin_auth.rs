//! Operator login, logout and access control.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use pg_delivery_docstore::{MemoryObjectStorage, MemoryStore};
use pg_delivery_integration_tests::{TestClient, admin_app};

fn client() -> TestClient {
    TestClient::new(admin_app(&MemoryStore::new(), &MemoryObjectStorage::default()))
}

#[tokio::test]
async fn test_logged_out_dashboard_shows_login() {
    let mut visitor = client();
    let page = visitor.get("/admin").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("name=\"password\""));
}

#[tokio::test]
async fn test_wrong_password() {
    let mut visitor = client();
    let response = visitor
        .post_form("/admin/login", &[("password", "guess")])
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.body.contains("Wrong password"));

    let page = visitor.get("/admin/products").await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_login_then_logout() {
    let mut operator = client();
    operator.login().await;
    assert_eq!(operator.get("/admin/products").await.status, StatusCode::OK);

    let logout = operator.post_form("/admin/logout", &[]).await;
    assert_eq!(logout.status, StatusCode::SEE_OTHER);
    assert_eq!(logout.location(), Some("/admin"));

    let page = operator.get("/admin/products").await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_unauthenticated_requests_are_refused() {
    let mut visitor = client();

    let stream = visitor.get("/admin/orders/stream").await;
    assert_eq!(stream.status, StatusCode::UNAUTHORIZED);

    let delivered = visitor.post_form("/admin/orders/abc/delivered", &[]).await;
    assert_eq!(delivered.status, StatusCode::UNAUTHORIZED);

    for path in ["/admin/products", "/admin/products/add"] {
        let page = visitor.get(path).await;
        assert_eq!(page.status, StatusCode::SEE_OTHER, "{path}");
        assert_eq!(page.location(), Some("/admin"));
    }

    let stock = visitor
        .post_form(
            "/admin/products/chips/stock",
            &[("adjustment", "increment"), ("observed", "1")],
        )
        .await;
    assert_eq!(stock.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_login_is_rate_limited() {
    let mut visitor = client();
    let mut statuses = Vec::new();
    for _ in 0..10 {
        let response = visitor
            .post_form("/admin/login", &[("password", "guess")])
            .await;
        statuses.push(response.status);
    }
    assert!(statuses.contains(&StatusCode::UNAUTHORIZED));
    assert!(statuses.contains(&StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn test_forged_forwarded_for_does_not_reset_the_limit() {
    let mut visitor = client();
    let mut statuses = Vec::new();
    for i in 0..20 {
        let forwarded = format!("10.0.0.{i}, 203.0.113.9");
        let response = visitor
            .post_form_with_headers(
                "/admin/login",
                &[("password", "guess")],
                &[
                    ("x-forwarded-for", forwarded.as_str()),
                    ("x-real-ip", forwarded.as_str()),
                ],
            )
            .await;
        statuses.push(response.status);
    }
    assert!(statuses.contains(&StatusCode::TOO_MANY_REQUESTS), "{statuses:?}");
    assert_eq!(statuses.last(), Some(&StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn test_health() {
    let mut visitor = client();
    assert_eq!(visitor.get("/health").await.status, StatusCode::OK);
    assert_eq!(visitor.get("/health/ready").await.status, StatusCode::OK);
}
