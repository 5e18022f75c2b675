//! Session-related types for operator authentication.
//!
//! Types stored in the session for authentication state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session-stored operator identity.
///
/// There is a single operator password, so the identity is the login
/// itself. `login_id` keys the live feeds opened under this login so logout
/// can revoke them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentOperator {
    pub login_id: Uuid,
    pub logged_in_at: DateTime<Utc>,
}

impl CurrentOperator {
    /// A fresh login starting now.
    #[must_use]
    pub fn new_login() -> Self {
        Self {
            login_id: Uuid::new_v4(),
            logged_in_at: Utc::now(),
        }
    }
}

/// Session keys for operator data.
pub mod keys {
    /// Key for storing the logged-in operator.
    pub const CURRENT_OPERATOR: &str = "current_operator";

    /// One-shot notice shown on the next page render.
    pub const FLASH: &str = "flash";
}
