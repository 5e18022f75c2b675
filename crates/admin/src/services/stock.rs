//! Stock editor writes.
//!
//! Each click moves stock by exactly one unit through the same conditional
//! increment checkout uses, so the editor can never take stock below zero
//! even when a checkout lands between the page render and the click.

use pg_delivery_core::{PRODUCTS, Product, ProductId};
use pg_delivery_docstore::{DocumentStore, StoreError, Write};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

/// Stock field adjusted by the editor.
const STOCK_FIELD: &str = "stock";

/// One click in the stock editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockAdjustment {
    Increment,
    Decrement,
}

impl StockAdjustment {
    const fn delta(self) -> i64 {
        match self {
            Self::Increment => 1,
            Self::Decrement => -1,
        }
    }
}

/// Errors that can occur while adjusting stock.
#[derive(Debug, Error)]
pub enum StockError {
    /// A decrement was asked for at zero stock. Nothing was written.
    #[error("stock is already zero")]
    AtZero,

    /// No product with this id.
    #[error("product {0} not found")]
    NotFound(ProductId),

    /// The store rejected or failed the write.
    #[error("stock update failed: {0}")]
    Store(StoreError),
}

/// Adjust a product's stock by one unit.
///
/// `observed` is the stock the operator saw when clicking. A decrement
/// observed at zero is rejected here, before any store call.
///
/// # Errors
///
/// - `StockError::AtZero` for a decrement at zero, observed or actual
/// - `StockError::NotFound` if the product does not exist
/// - `StockError::Store` for any other store failure
#[instrument(skip(store), fields(product_id = %id))]
pub async fn adjust_stock(
    store: &dyn DocumentStore,
    id: &ProductId,
    adjustment: StockAdjustment,
    observed: u32,
) -> Result<(), StockError> {
    if adjustment == StockAdjustment::Decrement && observed == 0 {
        return Err(StockError::AtZero);
    }

    let write = Write::increment(PRODUCTS, id.as_str(), STOCK_FIELD, adjustment.delta()).at_least(0);
    store.apply_all(vec![write]).await.map_err(|e| match e {
        StoreError::PreconditionFailed { .. } => StockError::AtZero,
        StoreError::NotFound { .. } => StockError::NotFound(id.clone()),
        other => StockError::Store(other),
    })?;

    tracing::info!(?adjustment, "stock adjusted");
    Ok(())
}

/// All products for the stock editor, in store order.
///
/// Documents that do not decode are skipped with a warning.
///
/// # Errors
///
/// Returns `StoreError` if the fetch fails.
#[instrument(skip(store))]
pub async fn list_products(store: &dyn DocumentStore) -> Result<Vec<Product>, StoreError> {
    let documents = store.list(PRODUCTS).await?;
    Ok(documents
        .iter()
        .filter_map(|doc| match doc.decode::<Product>() {
            Ok(product) => Some(product),
            Err(e) => {
                tracing::warn!(product_id = %doc.id, error = %e, "skipping undecodable product");
                None
            }
        })
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use pg_delivery_docstore::MemoryStore;
    use serde_json::json;

    use super::*;

    async fn store_with_stock(stock: u32) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert(
                PRODUCTS,
                "a",
                json!({"name": "Chips", "price": 20, "stock": stock})
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await;
        store
    }

    async fn stock_of(store: &MemoryStore) -> u32 {
        list_products(store).await.unwrap()[0].stock
    }

    #[tokio::test]
    async fn test_increment_and_decrement_by_one() {
        let store = store_with_stock(2).await;
        let id = ProductId::new("a");

        adjust_stock(&store, &id, StockAdjustment::Increment, 2)
            .await
            .unwrap();
        assert_eq!(stock_of(&store).await, 3);

        adjust_stock(&store, &id, StockAdjustment::Decrement, 3)
            .await
            .unwrap();
        assert_eq!(stock_of(&store).await, 2);
    }

    #[tokio::test]
    async fn test_decrement_observed_at_zero_never_reaches_store() {
        let store = store_with_stock(0).await;
        store.set_fail_writes(true);

        let result =
            adjust_stock(&store, &ProductId::new("a"), StockAdjustment::Decrement, 0).await;

        assert!(matches!(result, Err(StockError::AtZero)));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_decrement_is_floored() {
        // Page showed 1 but a checkout took the last unit meanwhile.
        let store = store_with_stock(0).await;

        let result =
            adjust_stock(&store, &ProductId::new("a"), StockAdjustment::Decrement, 1).await;

        assert!(matches!(result, Err(StockError::AtZero)));
        assert_eq!(stock_of(&store).await, 0);
    }

    #[tokio::test]
    async fn test_missing_product() {
        let store = MemoryStore::new();
        assert!(matches!(
            adjust_stock(&store, &ProductId::new("zz"), StockAdjustment::Increment, 0).await,
            Err(StockError::NotFound(_))
        ));
    }

    #[test]
    fn test_adjustment_from_form_value() {
        let parsed: StockAdjustment = serde_json::from_value(json!("decrement")).unwrap();
        assert_eq!(parsed, StockAdjustment::Decrement);
    }
}
