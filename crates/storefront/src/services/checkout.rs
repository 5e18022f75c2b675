//! Order placement.
//!
//! One checkout is one atomic batch: a conditional stock decrement per cart
//! line plus the order document. Either all of it lands or none of it does.

use chrono::{DateTime, Utc};
use pg_delivery_core::{
    Cart, DeliveryDetails, DeliveryError, MessagingLink, NewOrder, ORDERS, OrderId, PRODUCTS,
    order_message,
};
use pg_delivery_docstore::{DocumentStore, StoreError, Write, fields_of};
use thiserror::Error;
use tracing::instrument;

/// Stock field decremented on checkout.
const STOCK_FIELD: &str = "stock";

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Empty cart or blank delivery field. Nothing was written.
    #[error(transparent)]
    Invalid(#[from] DeliveryError),

    /// A line asks for more units than the store has left. Nothing was written.
    #[error("some items are no longer available")]
    OutOfStock,

    /// The store rejected or failed the batch. Nothing was written.
    #[error("failed to place order: {0}")]
    Store(StoreError),
}

impl From<StoreError> for CheckoutError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PreconditionFailed { .. } => Self::OutOfStock,
            StoreError::NotFound { ref collection, .. } if collection == PRODUCTS => {
                Self::OutOfStock
            }
            other => Self::Store(other),
        }
    }
}

/// A successfully written order.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub id: OrderId,
    pub order: NewOrder,
    /// Chat link carrying the order message to the owner.
    pub deep_link: String,
}

/// Validate, then write the stock decrements and the order in one batch.
///
/// The cart is left untouched; clearing it is the caller's job once this
/// returns `Ok`.
///
/// # Errors
///
/// - `CheckoutError::Invalid` before any store call if the cart is empty or a
///   delivery field is blank
/// - `CheckoutError::OutOfStock` if any decrement would take stock below zero
/// - `CheckoutError::Store` for any other store failure
#[instrument(skip_all, fields(lines = cart.lines().len(), order_id = tracing::field::Empty))]
pub async fn place_order(
    store: &dyn DocumentStore,
    messaging: &MessagingLink,
    cart: &Cart,
    delivery: DeliveryDetails,
    now: DateTime<Utc>,
) -> Result<PlacedOrder, CheckoutError> {
    let order = NewOrder::from_cart(cart, delivery, now)?;
    let id = OrderId::generate();
    tracing::Span::current().record("order_id", id.as_str());

    let mut writes: Vec<Write> = order
        .items
        .iter()
        .map(|item| {
            Write::increment(
                PRODUCTS,
                item.product_id.as_str(),
                STOCK_FIELD,
                -i64::from(item.qty),
            )
            .at_least(0)
        })
        .collect();
    writes.push(Write::create(ORDERS, id.as_str(), fields_of(&order)?));

    store.apply_all(writes).await?;

    let deep_link = messaging.deep_link(&order_message(&order));
    tracing::info!(total = %order.total, "order placed");

    Ok(PlacedOrder {
        id,
        order,
        deep_link,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pg_delivery_core::{OrderStatus, Price, Product, ProductId};
    use pg_delivery_docstore::MemoryStore;
    use serde_json::json;

    use super::*;

    fn product(id: &str, name: &str, price: u32, stock: u32) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            price: Price::from_whole(price),
            stock,
            category: String::new(),
            image_url: String::new(),
            created_at: None,
        }
    }

    fn delivery() -> DeliveryDetails {
        DeliveryDetails {
            phone: "9876543210".to_string(),
            room: "12".to_string(),
            floor: "2".to_string(),
            building: "Sunrise PG".to_string(),
        }
    }

    fn messaging() -> MessagingLink {
        MessagingLink::new("https://wa.me", "919876543210").unwrap()
    }

    async fn store_with_chips(stock: u32) -> MemoryStore {
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

    #[tokio::test]
    async fn test_place_order_decrements_stock_and_writes_order() {
        let store = store_with_chips(5).await;
        let mut cart = Cart::new();
        let chips = product("a", "Chips", 20, 5);
        cart.add(&chips);
        cart.add(&chips);

        let placed = place_order(&store, &messaging(), &cart, delivery(), Utc::now())
            .await
            .unwrap();

        let stock = store.get(PRODUCTS, "a").await.unwrap().unwrap();
        assert_eq!(stock.data["stock"], 3);

        let order = store.get(ORDERS, placed.id.as_str()).await.unwrap().unwrap();
        assert_eq!(order.data["total"], 40.0);
        assert_eq!(order.data["status"], "pending");
        assert_eq!(order.data["room"], "12");
        assert!(order.data["items"][0].get("stock").is_none());
        assert_eq!(placed.order.status, OrderStatus::Pending);
        assert!(placed.deep_link.starts_with("https://wa.me/919876543210?text=New%20Order!"));
    }

    #[tokio::test]
    async fn test_empty_cart_writes_nothing() {
        let store = store_with_chips(5).await;
        let err = place_order(&store, &messaging(), &Cart::new(), delivery(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Invalid(DeliveryError::EmptyCart)));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_field_writes_nothing() {
        let store = store_with_chips(5).await;
        let mut cart = Cart::new();
        cart.add(&product("a", "Chips", 20, 5));
        let details = DeliveryDetails {
            building: "   ".to_string(),
            ..delivery()
        };

        let err = place_order(&store, &messaging(), &cart, details, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Invalid(DeliveryError::MissingField(_))));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_insufficient_stock_is_out_of_stock() {
        // Cart captured stock 5 but only 1 is left in the store.
        let store = store_with_chips(1).await;
        let mut cart = Cart::new();
        let chips = product("a", "Chips", 20, 5);
        cart.add(&chips);
        cart.add(&chips);

        let err = place_order(&store, &messaging(), &cart, delivery(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::OutOfStock));
        assert!(store.list(ORDERS).await.unwrap().is_empty());
        assert_eq!(
            store.get(PRODUCTS, "a").await.unwrap().unwrap().data["stock"],
            1
        );
    }

    #[tokio::test]
    async fn test_store_outage_is_store_error() {
        let store = store_with_chips(5).await;
        store.set_fail_writes(true);
        let mut cart = Cart::new();
        cart.add(&product("a", "Chips", 20, 5));

        let err = place_order(&store, &messaging(), &cart, delivery(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Store(StoreError::Unavailable(_))));
    }
}
