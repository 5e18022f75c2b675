//! Live orders: dashboard page, server-sent event feed, delivered action.

use std::convert::Infallible;
use std::time::Duration;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        IntoResponse, Response, Sse,
        sse::{Event, KeepAlive},
    },
};
use futures::Stream;
use pg_delivery_core::{ORDERS, Order, OrderId};
use pg_delivery_docstore::{Document, Subscription};
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::{OptionalOperator, RequireOperator, SESSION_EXPIRY};
use crate::routes::auth::LoginTemplate;
use crate::services::{self, DeliveredOutcome, Revocation, list_orders, orders_newest_first};
use crate::state::AppState;

/// SSE event carrying a freshly rendered order list.
pub const ORDERS_EVENT: &str = "orders";
/// SSE event telling the page the feed hit a store error.
pub const FEED_ERROR_EVENT: &str = "feed-error";

const FEED_ERROR_MESSAGE: &str = "live updates interrupted, retrying";

/// One purchased line for display.
#[derive(Clone)]
pub struct OrderItemView {
    pub name: String,
    pub qty: u32,
}

/// Order display data for templates.
#[derive(Clone)]
pub struct OrderView {
    pub id: String,
    pub status: String,
    pub delivered: bool,
    pub placed_at: String,
    pub phone: String,
    pub room: String,
    pub floor: String,
    pub building: String,
    pub items: Vec<OrderItemView>,
    pub total: String,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            status: order.status.to_string(),
            delivered: order.status.is_delivered(),
            placed_at: order
                .created_at
                .map(|at| at.format("%d %b %Y, %H:%M UTC").to_string())
                .unwrap_or_default(),
            phone: order.delivery.phone.clone(),
            room: order.delivery.room.clone(),
            floor: order.delivery.floor.clone(),
            building: order.delivery.building.clone(),
            items: order
                .items
                .iter()
                .map(|item| OrderItemView {
                    name: item.name.clone(),
                    qty: item.qty,
                })
                .collect(),
            total: order.total.to_string(),
        }
    }
}

fn order_views(orders: &[Order]) -> Vec<OrderView> {
    orders.iter().map(OrderView::from).collect()
}

/// Orders dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub orders: Vec<OrderView>,
}

/// The order list alone, pushed over the live feed.
#[derive(Template)]
#[template(path = "orders_list.html")]
pub struct OrderListTemplate {
    pub orders: Vec<OrderView>,
}

/// Render one snapshot of the `orders` collection.
///
/// # Errors
///
/// Returns an error if the template fails to render.
pub fn render_order_list(documents: &[Document]) -> std::result::Result<String, askama::Error> {
    OrderListTemplate {
        orders: order_views(&orders_newest_first(documents)),
    }
    .render()
}

/// Show the orders dashboard, or the login form when nobody is logged in.
#[instrument(skip_all)]
pub async fn dashboard(
    State(state): State<AppState>,
    OptionalOperator(operator): OptionalOperator,
) -> Result<Response> {
    if operator.is_none() {
        return Ok(LoginTemplate::default().into_response());
    }

    let orders = list_orders(state.store()).await?;
    Ok(DashboardTemplate {
        orders: order_views(&orders),
    }
    .into_response())
}

/// Stream the order list on every change.
///
/// The first event carries the current list. The store subscription lives
/// inside the response stream and is released when the client goes away or
/// the store closes it. The feed also ends on logout and once the session
/// expiry has passed, after which the browser's reconnect must authenticate
/// again.
#[instrument(skip_all, fields(login_id = %operator.login_id))]
pub async fn stream(
    State(state): State<AppState>,
    RequireOperator(operator): RequireOperator,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let subscription = state.store().watch(ORDERS).await?;
    let revocation = state.feeds().register(operator.login_id);
    tracing::info!("order feed opened");

    Ok(Sse::new(order_feed(subscription, revocation, SESSION_EXPIRY))
        .keep_alive(KeepAlive::default()))
}

fn order_feed(
    mut subscription: Subscription,
    mut revocation: Revocation,
    lifetime: Duration,
) -> impl Stream<Item = std::result::Result<Event, Infallible>> {
    async_stream::stream! {
        let expiry = tokio::time::sleep(lifetime);
        tokio::pin!(expiry);

        loop {
            let next = tokio::select! {
                next = subscription.next() => next,
                () = revocation.revoked() => {
                    tracing::info!("order feed revoked");
                    break;
                }
                () = &mut expiry => {
                    tracing::info!("order feed outlived the session expiry");
                    break;
                }
            };
            let Some(snapshot) = next else {
                tracing::debug!("order subscription closed");
                break;
            };

            match snapshot {
                Ok(documents) => match render_order_list(&documents) {
                    // SSE cannot carry carriage returns.
                    Ok(html) => yield Ok(Event::default().event(ORDERS_EVENT).data(html.replace('\r', ""))),
                    Err(e) => tracing::error!(error = %e, "failed to render order list"),
                },
                Err(e) => {
                    tracing::warn!(error = %e, "order snapshot failed");
                    yield Ok(Event::default().event(FEED_ERROR_EVENT).data(FEED_ERROR_MESSAGE));
                }
            }
        }
    }
}

/// Mark an order delivered. Idempotent; 404 for an unknown order.
#[instrument(skip_all, fields(order_id = %id))]
pub async fn mark_delivered(
    State(state): State<AppState>,
    RequireOperator(_operator): RequireOperator,
    Path(id): Path<OrderId>,
) -> Result<StatusCode> {
    let outcome = services::mark_delivered(state.store(), &id).await?;
    if outcome == DeliveredOutcome::Marked {
        add_breadcrumb(
            "orders",
            "Order marked delivered",
            Some(&[("order_id", id.as_str())]),
        );
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures::StreamExt;
    use pg_delivery_docstore::{DocumentStore, MemoryStore};
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::services::FeedRegistry;

    #[tokio::test]
    async fn test_feed_ends_after_its_lifetime() {
        let store = MemoryStore::new();
        let registry = FeedRegistry::new();
        let subscription = store.watch(ORDERS).await.unwrap();
        let revocation = registry.register(Uuid::new_v4());

        let feed = order_feed(subscription, revocation, Duration::from_millis(50));
        let events = tokio::time::timeout(Duration::from_secs(5), feed.collect::<Vec<_>>())
            .await
            .expect("feed should end at its lifetime");

        assert_eq!(events.len(), 1);
        drop(registry);
    }

    #[tokio::test]
    async fn test_feed_ends_on_revocation() {
        let store = MemoryStore::new();
        let registry = FeedRegistry::new();
        let login_id = Uuid::new_v4();
        let subscription = store.watch(ORDERS).await.unwrap();
        let revocation = registry.register(login_id);

        let mut feed = Box::pin(order_feed(subscription, revocation, SESSION_EXPIRY));
        assert!(feed.next().await.is_some());
        assert_eq!(registry.revoke(login_id), 1);

        let end = tokio::time::timeout(Duration::from_secs(5), feed.next())
            .await
            .expect("feed should end on revocation");
        assert!(end.is_none());
    }

    #[test]
    fn test_order_list_renders_pending_action() {
        let doc = Document::new(
            "o1",
            json!({
                "items": [{"productId": "a", "name": "Chips", "qty": 2, "price": 20}],
                "total": 40,
                "phone": "9876543210",
                "room": "204",
                "floor": "2nd",
                "building": "Sunrise PG",
                "status": "pending",
                "createdAt": "2026-01-05T10:00:00Z",
            })
            .as_object()
            .cloned()
            .unwrap(),
        );

        let html = render_order_list(&[doc]).unwrap();
        assert!(html.contains("Order ID: o1"));
        assert!(html.contains("2 &times; Chips"));
        assert!(html.contains("Total: ₹40"));
        assert!(html.contains("mark-delivered"));
    }

    #[test]
    fn test_empty_order_list() {
        let html = render_order_list(&[]).unwrap();
        assert!(html.contains("No orders yet."));
    }
}
