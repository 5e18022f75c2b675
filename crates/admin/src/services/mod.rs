//! Business logic services for admin.
//!
//! # Services
//!
//! - `auth` - Operator password hashing and verification (Argon2id)
//! - `feeds` - Revocation of live order feeds on logout
//! - `orders` - Order listing and the delivered transition
//! - `stock` - One-unit stock adjustments with a zero floor
//! - `intake` - New products: validation, image upload, document creation
//! - `flash` - Notices across redirects

pub mod auth;
pub mod feeds;
pub mod flash;
pub mod intake;
pub mod orders;
pub mod stock;

pub use auth::{AuthError, hash_password, verify_password};
pub use feeds::{FeedRegistry, Revocation};
pub use intake::{ImageUpload, IntakeError, IntakeField, IntakeFields, IntakeForm, add_product};
pub use orders::{DeliveredOutcome, OrderError, list_orders, mark_delivered, orders_newest_first};
pub use stock::{StockAdjustment, StockError, adjust_stock, list_products};
