//! Core types for PG Delivery.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod price;
pub mod status;

pub use id::*;
pub use price::{CURRENCY_SYMBOL, Price, PriceError};
pub use status::*;

/// Document collection holding catalog products.
pub const PRODUCTS: &str = "products";

/// Document collection holding placed orders.
pub const ORDERS: &str = "orders";
