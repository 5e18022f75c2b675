//! PG Delivery Core - Shared domain library.
//!
//! This crate provides the domain model used across all PG Delivery components:
//! - `storefront` - Public catalog, cart and checkout
//! - `admin` - Operator dashboard (orders, stock, product intake)
//! - `cli` - Command-line tools for migrations and operator setup
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. The cart state machine and the order message
//! formatting live here so they can be tested without a store.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices and order status
//! - [`product`] - Catalog products and product intake input
//! - [`cart`] - Cart lines and the add/decrease/remove state machine
//! - [`order`] - Delivery details, order snapshots and validation
//! - [`message`] - Order notification text and messaging deep links

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod message;
pub mod order;
pub mod product;
pub mod types;

pub use cart::{AddOutcome, Cart, CartLine, CartSnapshotError};
pub use message::{DEFAULT_MESSAGING_BASE_URL, MessagingLink, RecipientError, order_message};
pub use order::{DeliveryDetails, DeliveryError, DeliveryField, NewOrder, Order, OrderItem};
pub use product::{NewProduct, Product};
pub use types::*;
