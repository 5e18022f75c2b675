//! Session-related types.
//!
//! The storefront keeps no visitor accounts; the session holds the cart
//! mirror, a one-shot flash message and the most recent order confirmation.

use serde::{Deserialize, Serialize};

use pg_delivery_core::{OrderId, Price};

/// Confirmation data for the order just placed in this session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastOrder {
    pub id: OrderId,
    pub total: Price,
    /// Chat link carrying the order message to the owner.
    pub deep_link: String,
}

/// Session keys used by the storefront.
pub mod keys {
    /// Key for the JSON snapshot of the visitor's cart.
    pub const CART: &str = "pg_delivery_cart";

    /// Key for a message shown once on the next page render.
    pub const FLASH: &str = "flash";

    /// Key for the most recently placed order.
    pub const LAST_ORDER: &str = "last_order";
}
