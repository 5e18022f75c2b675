//! Live feed revocation.
//!
//! Every order stream opened under a login holds a receiver from this
//! registry. Logging out drops the login's sender, which ends those streams
//! and releases their store subscriptions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use uuid::Uuid;

/// Tracks open live feeds per login.
#[derive(Debug, Clone, Default)]
pub struct FeedRegistry {
    logins: Arc<Mutex<HashMap<Uuid, watch::Sender<bool>>>>,
}

/// Fires once the owning login is revoked.
#[derive(Debug)]
pub struct Revocation {
    receiver: watch::Receiver<bool>,
}

impl Revocation {
    /// Resolve when the login is revoked.
    pub async fn revoked(&mut self) {
        // An error means the sender was dropped, which is a revocation too.
        let _ = self.receiver.wait_for(|revoked| *revoked).await;
    }
}

impl FeedRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a feed under `login_id`.
    pub fn register(&self, login_id: Uuid) -> Revocation {
        let mut logins = self.logins.lock().unwrap_or_else(PoisonError::into_inner);
        // Forget logins whose feeds have all disconnected.
        logins.retain(|_, sender| sender.receiver_count() > 0);
        let sender = logins
            .entry(login_id)
            .or_insert_with(|| watch::channel(false).0);
        Revocation {
            receiver: sender.subscribe(),
        }
    }

    /// End every feed opened under `login_id`. Returns how many were open.
    pub fn revoke(&self, login_id: Uuid) -> usize {
        let sender = self
            .logins
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&login_id);
        sender.map_or(0, |sender| {
            let open = sender.receiver_count();
            sender.send_replace(true);
            open
        })
    }

    /// Number of feeds currently open under `login_id`.
    #[must_use]
    pub fn open_feeds(&self, login_id: Uuid) -> usize {
        self.logins
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&login_id)
            .map_or(0, watch::Sender::receiver_count)
    }
}
