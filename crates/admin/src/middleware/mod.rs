//! HTTP middleware stack for admin.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions, holds the operator login)
//! 5. Rate limiter (login route only)
//!
//! Authentication is enforced per handler with the [`RequireOperator`]
//! extractor.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{OptionalOperator, RequireOperator, clear_current_operator, set_current_operator};
pub use rate_limit::login_rate_limiter;
pub use request_id::request_id_middleware;
pub use session::{SESSION_EXPIRY, admin_session_store, create_session_layer};
