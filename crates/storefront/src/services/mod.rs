//! Business logic services for storefront.
//!
//! # Services
//!
//! - `catalog` - Product reads from the document store
//! - `cart_store` - Session-mirrored cart extractor
//! - `checkout` - Atomic order placement and the messaging deep link
//! - `flash` - One-shot messages across redirects

pub mod cart_store;
pub mod catalog;
pub mod checkout;
pub mod flash;

pub use cart_store::{CartStore, CartStoreError};
pub use catalog::{Catalog, CatalogError};
pub use checkout::{CheckoutError, PlacedOrder, place_order};
