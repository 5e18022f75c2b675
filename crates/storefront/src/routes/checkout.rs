//! Checkout and order confirmation route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use pg_delivery_core::{Cart, DeliveryDetails, DeliveryError};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::models::{LastOrder, session_keys};
use crate::services::{CartStore, CheckoutError, flash, place_order};
use crate::state::AppState;

const EMPTY_CART_MESSAGE: &str = "Your cart is empty. Please add items first.";
const MISSING_DETAILS_MESSAGE: &str = "Please fill all delivery details.";
const OUT_OF_STOCK_MESSAGE: &str =
    "Some items are no longer available. Please review your cart and try again.";
const PLACE_FAILED_MESSAGE: &str = "Failed to place order. Please try again.";

/// Cart line display data for templates.
#[derive(Clone)]
pub struct LineView {
    pub product_id: String,
    pub name: String,
    pub qty: u32,
    pub line_total: String,
    pub can_add: bool,
}

fn line_views(cart: &Cart) -> Vec<LineView> {
    cart.lines()
        .iter()
        .map(|line| LineView {
            product_id: line.product_id.to_string(),
            name: line.name.clone(),
            qty: line.qty,
            line_total: line.line_total().to_string(),
            can_add: !line.at_stock_limit(),
        })
        .collect()
}

/// Delivery details form data.
#[derive(Debug, Default, Deserialize)]
pub struct DeliveryForm {
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub floor: String,
    #[serde(default)]
    pub building: String,
}

impl From<DeliveryForm> for DeliveryDetails {
    fn from(form: DeliveryForm) -> Self {
        Self {
            phone: form.phone,
            room: form.room,
            floor: form.floor,
            building: form.building,
        }
    }
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout.html")]
pub struct CheckoutTemplate {
    pub lines: Vec<LineView>,
    pub total: String,
    pub form: DeliveryDetails,
    pub error: Option<String>,
    pub flash: Option<String>,
}

impl CheckoutTemplate {
    fn new(cart: &Cart, form: DeliveryDetails) -> Self {
        Self {
            lines: line_views(cart),
            total: cart.total().to_string(),
            form,
            error: None,
            flash: None,
        }
    }

    fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "success.html")]
pub struct SuccessTemplate {
    pub order_id: String,
    pub total: String,
    pub deep_link: String,
    /// `tel:` target for calling the owner.
    pub owner_phone: String,
}

impl SuccessTemplate {
    fn new(order: &LastOrder, state: &AppState) -> Self {
        Self {
            order_id: order.id.to_string(),
            total: order.total.to_string(),
            deep_link: order.deep_link.clone(),
            owner_phone: format!("+{}", state.messaging().recipient()),
        }
    }
}

async fn redirect_empty_cart(session: &Session) -> Response {
    flash::set(session, EMPTY_CART_MESSAGE).await;
    Redirect::to("/").into_response()
}

/// Display the checkout page.
#[instrument(skip(cart))]
pub async fn show(cart: CartStore) -> Response {
    if cart.cart().is_empty() {
        return redirect_empty_cart(cart.session()).await;
    }

    let mut template = CheckoutTemplate::new(cart.cart(), DeliveryDetails::default());
    template.flash = flash::take(cart.session()).await;
    template.into_response()
}

/// Place the order.
///
/// Validation failures re-render the form with the entered values and write
/// nothing. On success the cart is cleared and the visitor lands on the
/// confirmation page, which opens the messaging deep link.
#[instrument(skip(state, cart, form))]
pub async fn place(
    State(state): State<AppState>,
    mut cart: CartStore,
    Form(form): Form<DeliveryForm>,
) -> Result<Response> {
    if cart.cart().is_empty() {
        return Ok(redirect_empty_cart(cart.session()).await);
    }

    let details = DeliveryDetails::from(form);
    let placed = match place_order(
        state.store(),
        state.messaging(),
        cart.cart(),
        details.clone(),
        Utc::now(),
    )
    .await
    {
        Ok(placed) => placed,
        Err(CheckoutError::Invalid(DeliveryError::EmptyCart)) => {
            return Ok(redirect_empty_cart(cart.session()).await);
        }
        Err(CheckoutError::Invalid(DeliveryError::MissingField(field))) => {
            tracing::debug!(field = field.label(), "delivery details incomplete");
            let template =
                CheckoutTemplate::new(cart.cart(), details).with_error(MISSING_DETAILS_MESSAGE);
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, template).into_response());
        }
        Err(CheckoutError::OutOfStock) => {
            tracing::warn!("checkout rejected: insufficient stock");
            let template =
                CheckoutTemplate::new(cart.cart(), details).with_error(OUT_OF_STOCK_MESSAGE);
            return Ok((StatusCode::CONFLICT, template).into_response());
        }
        Err(err @ CheckoutError::Store(_)) => {
            let event_id = sentry::capture_error(&err);
            tracing::error!(error = %err, sentry_event_id = %event_id, "checkout failed");
            let template =
                CheckoutTemplate::new(cart.cart(), details).with_error(PLACE_FAILED_MESSAGE);
            return Ok((StatusCode::BAD_GATEWAY, template).into_response());
        }
    };

    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_id", placed.id.as_str())]),
    );

    // The order is already written; session hiccups from here on must not
    // turn it into an error page.
    if let Err(e) = cart.clear().await {
        tracing::error!(error = %e, order_id = %placed.id, "failed to clear cart after checkout");
    }

    let last_order = LastOrder {
        id: placed.id,
        total: placed.order.total,
        deep_link: placed.deep_link,
    };
    if let Err(e) = cart
        .session()
        .insert(session_keys::LAST_ORDER, &last_order)
        .await
    {
        tracing::error!(error = %e, order_id = %last_order.id, "failed to store order confirmation");
        return Ok(SuccessTemplate::new(&last_order, &state).into_response());
    }

    Ok(Redirect::to("/order/success").into_response())
}

/// Display the confirmation for the order placed in this session.
#[instrument(skip(state, session))]
pub async fn success(State(state): State<AppState>, session: Session) -> Result<Response> {
    let Some(order) = session.get::<LastOrder>(session_keys::LAST_ORDER).await? else {
        return Ok(Redirect::to("/").into_response());
    };
    Ok(SuccessTemplate::new(&order, &state).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_form_maps_fields() {
        let details = DeliveryDetails::from(DeliveryForm {
            phone: "98".to_string(),
            room: "12".to_string(),
            floor: "2".to_string(),
            building: "Sunrise".to_string(),
        });
        assert_eq!(details.room, "12");
        assert_eq!(details.building, "Sunrise");
    }
}
