//! Application state shared across handlers.

use std::sync::Arc;

use pg_delivery_docstore::{DocumentStore, ObjectStorage};

use crate::config::AdminConfig;
use crate::services::FeedRegistry;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// document store, image storage and open live feeds.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    store: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStorage>,
    feeds: FeedRegistry,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        config: AdminConfig,
        store: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                objects,
                feeds: FeedRegistry::new(),
            }),
        }
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the document store.
    #[must_use]
    pub fn store(&self) -> &dyn DocumentStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the product image storage.
    #[must_use]
    pub fn objects(&self) -> &dyn ObjectStorage {
        self.inner.objects.as_ref()
    }

    /// Live feeds open per login.
    #[must_use]
    pub fn feeds(&self) -> &FeedRegistry {
        &self.inner.feeds
    }
}
