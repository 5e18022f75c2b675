//! Per-visitor cart persisted in the session.
//!
//! [`CartStore`] is an axum extractor: it loads the visitor's cart from the
//! session when a handler asks for it and writes the full line collection
//! back after every mutation.

use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use pg_delivery_core::{AddOutcome, Cart, CartSnapshotError, Product, ProductId};
use thiserror::Error;
use tower_sessions::Session;

use crate::models::session_keys;

/// Errors that can occur while persisting the cart.
#[derive(Debug, Error)]
pub enum CartStoreError {
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error(transparent)]
    Snapshot(#[from] CartSnapshotError),
}

/// The visitor's cart plus the session it is mirrored to.
pub struct CartStore {
    session: Session,
    cart: Cart,
}

impl CartStore {
    /// Load the cart mirrored in `session`.
    ///
    /// A missing, unreadable or malformed snapshot yields an empty cart.
    pub async fn load(session: Session) -> Self {
        let cart = match session.get::<String>(session_keys::CART).await {
            Ok(Some(snapshot)) => Cart::from_snapshot(&snapshot).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "discarding malformed cart snapshot");
                Cart::new()
            }),
            Ok(None) => Cart::new(),
            Err(e) => {
                tracing::warn!(error = %e, "could not read cart from session");
                Cart::new()
            }
        };
        Self { session, cart }
    }

    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Add one unit of `product`.
    ///
    /// # Errors
    ///
    /// Returns `CartStoreError` if the cart cannot be written back.
    pub async fn add(&mut self, product: &Product) -> Result<AddOutcome, CartStoreError> {
        let outcome = self.cart.add(product);
        self.persist().await?;
        Ok(outcome)
    }

    /// Take one unit off a line, dropping the line at zero.
    ///
    /// # Errors
    ///
    /// Returns `CartStoreError` if the cart cannot be written back.
    pub async fn decrease(&mut self, id: &ProductId) -> Result<bool, CartStoreError> {
        let changed = self.cart.decrease(id);
        self.persist().await?;
        Ok(changed)
    }

    /// Drop a line regardless of its quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartStoreError` if the cart cannot be written back.
    pub async fn remove(&mut self, id: &ProductId) -> Result<bool, CartStoreError> {
        let changed = self.cart.remove(id);
        self.persist().await?;
        Ok(changed)
    }

    /// Empty the cart and erase its mirror.
    ///
    /// # Errors
    ///
    /// Returns `CartStoreError` if the session cannot be written.
    pub async fn clear(&mut self) -> Result<(), CartStoreError> {
        self.cart.clear();
        self.session.remove::<String>(session_keys::CART).await?;
        Ok(())
    }

    async fn persist(&self) -> Result<(), CartStoreError> {
        let snapshot = self.cart.to_snapshot()?;
        self.session.insert(session_keys::CART, snapshot).await?;
        Ok(())
    }
}

impl<S> FromRequestParts<S> for CartStore
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        Ok(Self::load(session).await)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use pg_delivery_core::Price;
    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn chips() -> Product {
        Product {
            id: ProductId::new("a"),
            name: "Chips".to_string(),
            price: Price::from_whole(20),
            stock: 5,
            category: "snacks".to_string(),
            image_url: String::new(),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_mutations_are_mirrored() {
        let session = session();
        let mut store = CartStore::load(session.clone()).await;
        store.add(&chips()).await.unwrap();
        store.add(&chips()).await.unwrap();

        let reloaded = CartStore::load(session).await;
        assert_eq!(reloaded.cart().item_count(), 2);
        assert_eq!(reloaded.cart().total(), Price::from_whole(40));
    }

    #[tokio::test]
    async fn test_malformed_snapshot_yields_empty_cart() {
        let session = session();
        session
            .insert(session_keys::CART, "{not json".to_string())
            .await
            .unwrap();
        let store = CartStore::load(session).await;
        assert!(store.cart().is_empty());
    }

    #[tokio::test]
    async fn test_clear_erases_mirror() {
        let session = session();
        let mut store = CartStore::load(session.clone()).await;
        store.add(&chips()).await.unwrap();
        store.clear().await.unwrap();

        assert!(store.cart().is_empty());
        assert!(
            session
                .get::<String>(session_keys::CART)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_decrease_to_zero_drops_line() {
        let session = session();
        let mut store = CartStore::load(session.clone()).await;
        store.add(&chips()).await.unwrap();
        assert!(store.decrease(&ProductId::new("a")).await.unwrap());
        assert!(CartStore::load(session).await.cart().is_empty());
    }
}
