//! Notices carried across a post-redirect-get.

use tower_sessions::Session;

use crate::models::session_keys;

/// Queue a notice for the next page render. Failures are logged and dropped.
pub async fn set(session: &Session, message: impl Into<String>) {
    if let Err(e) = session.insert(session_keys::FLASH, message.into()).await {
        tracing::warn!(error = %e, "failed to store flash notice");
    }
}

/// Take the queued notice, if any.
pub async fn take(session: &Session) -> Option<String> {
    match session.remove::<String>(session_keys::FLASH).await {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read flash notice");
            None
        }
    }
}
