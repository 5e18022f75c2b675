//! Order reads and the delivered transition.

use pg_delivery_core::{ORDERS, Order, OrderId, OrderStatus};
use pg_delivery_docstore::{Document, DocumentStore, Fields, StoreError};
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

/// Status field written by [`mark_delivered`].
const STATUS_FIELD: &str = "status";

/// Errors that can occur while working with orders.
#[derive(Debug, Error)]
pub enum OrderError {
    /// No order with this id.
    #[error("order {0} not found")]
    NotFound(OrderId),

    /// The stored status is not one we know.
    #[error("order {id} has unknown status {status}")]
    UnknownStatus { id: OrderId, status: String },

    /// The store could not be read or written.
    #[error("order store error: {0}")]
    Store(#[from] StoreError),
}

/// What [`mark_delivered`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveredOutcome {
    /// The order went from pending to delivered.
    Marked,
    /// The order was already delivered; nothing was written.
    AlreadyDelivered,
}

/// Decode a snapshot of the `orders` collection, newest first.
///
/// Documents that do not decode are skipped with a warning. Orders without
/// a creation time sort last.
#[must_use]
pub fn orders_newest_first(documents: &[Document]) -> Vec<Order> {
    let mut orders: Vec<Order> = documents
        .iter()
        .rev()
        .filter_map(|doc| match doc.decode::<Order>() {
            Ok(order) => Some(order),
            Err(e) => {
                tracing::warn!(order_id = %doc.id, error = %e, "skipping undecodable order");
                None
            }
        })
        .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders
}

/// All orders, newest first.
///
/// # Errors
///
/// Returns `OrderError::Store` if the fetch fails.
#[instrument(skip(store))]
pub async fn list_orders(store: &dyn DocumentStore) -> Result<Vec<Order>, OrderError> {
    let documents = store.list(ORDERS).await?;
    Ok(orders_newest_first(&documents))
}

fn stored_status(doc: &Document, id: &OrderId) -> Result<OrderStatus, OrderError> {
    match doc.data.get(STATUS_FIELD) {
        None | Some(Value::Null) => Ok(OrderStatus::default()),
        Some(Value::String(raw)) => raw.parse().map_err(|_| OrderError::UnknownStatus {
            id: id.clone(),
            status: raw.clone(),
        }),
        Some(other) => Err(OrderError::UnknownStatus {
            id: id.clone(),
            status: other.to_string(),
        }),
    }
}

/// Move an order from pending to delivered.
///
/// Only the status field is written. Marking an order that is already
/// delivered writes nothing.
///
/// # Errors
///
/// - `OrderError::NotFound` if the order does not exist
/// - `OrderError::UnknownStatus` if the stored status cannot be read
/// - `OrderError::Store` if the read or write fails
#[instrument(skip(store), fields(order_id = %id))]
pub async fn mark_delivered(
    store: &dyn DocumentStore,
    id: &OrderId,
) -> Result<DeliveredOutcome, OrderError> {
    let doc = store
        .get(ORDERS, id.as_str())
        .await?
        .ok_or_else(|| OrderError::NotFound(id.clone()))?;

    let current = stored_status(&doc, id)?;
    if current.is_delivered() {
        tracing::debug!("order already delivered");
        return Ok(DeliveredOutcome::AlreadyDelivered);
    }
    debug_assert!(current.can_transition_to(OrderStatus::Delivered));

    let mut fields = Fields::new();
    fields.insert(
        STATUS_FIELD.to_string(),
        Value::String(OrderStatus::Delivered.to_string()),
    );
    store
        .update(ORDERS, id.as_str(), fields)
        .await
        .map_err(|e| match e {
            StoreError::NotFound { .. } => OrderError::NotFound(id.clone()),
            other => OrderError::Store(other),
        })?;

    tracing::info!("order marked delivered");
    Ok(DeliveredOutcome::Marked)
}
