//! Domain models for admin.

pub mod session;

pub use session::{CurrentOperator, keys as session_keys};
