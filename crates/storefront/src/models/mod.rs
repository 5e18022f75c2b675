//! Session-stored types for the storefront.

pub mod session;

pub use session::{LastOrder, keys as session_keys};
