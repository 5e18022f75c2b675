//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Catalog
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (document store)
//!
//! # Cart (form posts, redirect back)
//! POST /cart/add               - Add one unit
//! POST /cart/decrease          - Remove one unit
//! POST /cart/remove            - Remove the line
//!
//! # Checkout
//! GET  /checkout               - Order summary and delivery form
//! POST /checkout               - Place the order
//! GET  /order/success          - Confirmation, opens the messaging deep link
//! ```

pub mod cart;
pub mod checkout;
pub mod health;
pub mod home;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(cart::add))
        .route("/decrease", post(cart::decrease))
        .route("/remove", post(cart::remove))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/cart", cart_routes())
        .route("/checkout", get(checkout::show).post(checkout::place))
        .route("/order/success", get(checkout::success))
}
