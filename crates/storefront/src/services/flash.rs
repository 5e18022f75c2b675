//! One-shot messages carried across a redirect.

use tower_sessions::Session;

use crate::models::session_keys;

/// Queue `message` for the next page render.
///
/// A session write failure only loses the message, so it is logged rather
/// than returned.
pub async fn set(session: &Session, message: impl Into<String>) {
    if let Err(e) = session.insert(session_keys::FLASH, message.into()).await {
        tracing::warn!(error = %e, "failed to store flash message");
    }
}

/// Take the queued message, if any.
pub async fn take(session: &Session) -> Option<String> {
    session
        .remove::<String>(session_keys::FLASH)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to read flash message");
            None
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_flash_is_shown_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        set(&session, "Your cart is empty").await;
        assert_eq!(take(&session).await.as_deref(), Some("Your cart is empty"));
        assert_eq!(take(&session).await, None);
    }
}
