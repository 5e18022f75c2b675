//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Liveness check
//! GET  /health/ready                   - Readiness check (document store)
//!
//! # Auth
//! GET  /admin                          - Login page, or the dashboard once logged in
//! POST /admin/login                    - Password check (rate limited)
//! POST /admin/logout                   - End the session and its live feeds
//!
//! # Orders
//! GET  /admin/orders/stream            - Live order list (server-sent events)
//! POST /admin/orders/{id}/delivered    - Mark an order delivered
//!
//! # Products
//! GET  /admin/products                 - Stock editor
//! POST /admin/products/{id}/stock      - One-unit stock change
//! GET  /admin/products/add             - Intake form
//! POST /admin/products/add             - Create a product with its image
//! ```

pub mod auth;
pub mod health;
pub mod intake;
pub mod orders;
pub mod products;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::config::AdminConfig;
use crate::middleware::login_rate_limiter;
use crate::state::AppState;

/// Create the login router with its rate limiter.
fn login_routes(config: &AdminConfig) -> Router<AppState> {
    Router::new()
        .route("/admin/login", post(auth::login))
        .layer(login_rate_limiter(&config.trusted_proxies))
}

/// Create all routes for admin.
pub fn routes(config: &AdminConfig) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/admin", get(orders::dashboard))
        .route("/admin/logout", post(auth::logout))
        .route("/admin/orders/stream", get(orders::stream))
        .route("/admin/orders/{id}/delivered", post(orders::mark_delivered))
        .route("/admin/products", get(products::index))
        .route("/admin/products/{id}/stock", post(products::adjust))
        .route(
            "/admin/products/add",
            get(intake::show)
                .post(intake::submit)
                .layer(DefaultBodyLimit::max(intake::MAX_UPLOAD_BYTES)),
        )
        .merge(login_routes(config))
}
