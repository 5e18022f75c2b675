//! Catalog reads.
//!
//! Every page load fetches the full product set; nothing is cached between
//! requests.

use pg_delivery_core::{PRODUCTS, Product, ProductId};
use pg_delivery_docstore::{DocumentStore, StoreError};
use thiserror::Error;
use tracing::instrument;

/// Errors that can occur while reading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The store could not be read.
    #[error("failed to load products: {0}")]
    Store(#[from] StoreError),
}

/// Read-only access to the `products` collection.
pub struct Catalog<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> Catalog<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// All products, in store order.
    ///
    /// A product document that does not decode is skipped with a warning so
    /// one bad record cannot take the catalog down.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Store` if the fetch itself fails.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Vec<Product>, CatalogError> {
        let documents = self.store.list(PRODUCTS).await?;
        let total = documents.len();

        let products: Vec<Product> = documents
            .iter()
            .filter_map(|doc| match doc.decode::<Product>() {
                Ok(product) => Some(product),
                Err(e) => {
                    tracing::warn!(product_id = %doc.id, error = %e, "skipping undecodable product");
                    None
                }
            })
            .collect();

        tracing::debug!(total, decoded = products.len(), "catalog loaded");
        Ok(products)
    }

    /// One product, or `None` if it does not exist or does not decode.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Store` if the fetch fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        let Some(doc) = self.store.get(PRODUCTS, id.as_str()).await? else {
            return Ok(None);
        };
        match doc.decode::<Product>() {
            Ok(product) => Ok(Some(product)),
            Err(e) => {
                tracing::warn!(error = %e, "product does not decode");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pg_delivery_docstore::MemoryStore;
    use serde_json::json;

    use super::*;

    async fn store_with(docs: &[(&str, serde_json::Value)]) -> MemoryStore {
        let store = MemoryStore::new();
        for (id, value) in docs {
            store
                .insert(PRODUCTS, id, value.as_object().cloned().unwrap())
                .await;
        }
        store
    }

    #[tokio::test]
    async fn test_products_skips_undecodable() {
        let store = store_with(&[
            ("a", json!({"name": "Chips", "price": 20, "stock": 5})),
            ("b", json!({"name": "Broken", "price": "lots"})),
            ("c", json!({"name": "Cola", "price": 35.5, "stock": 0, "category": "drinks"})),
        ])
        .await;

        let products = Catalog::new(&store).products().await.unwrap();
        let names: Vec<_> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Chips", "Cola"]);
        assert_eq!(products[0].id.as_str(), "a");
    }

    #[tokio::test]
    async fn test_empty_catalog_is_not_an_error() {
        let store = MemoryStore::new();
        assert!(Catalog::new(&store).products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_an_error() {
        let store = MemoryStore::new();
        store.set_fail_reads(true);
        assert!(matches!(
            Catalog::new(&store).products().await,
            Err(CatalogError::Store(_))
        ));
    }

    #[tokio::test]
    async fn test_product_lookup() {
        let store = store_with(&[("a", json!({"name": "Chips", "price": 20, "stock": 5}))]).await;
        let catalog = Catalog::new(&store);
        assert_eq!(
            catalog.product(&ProductId::new("a")).await.unwrap().unwrap().stock,
            5
        );
        assert!(catalog.product(&ProductId::new("zz")).await.unwrap().is_none());
    }
}
