//! Cart route handlers.
//!
//! Every cart action is a form post that redirects back to the page it came
//! from. The cart itself lives in the session (see [`CartStore`]).

use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use pg_delivery_core::{AddOutcome, ProductId};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::services::{CartStore, Catalog, flash};
use crate::state::AppState;

/// Cart item form data.
#[derive(Debug, Deserialize)]
pub struct CartItemForm {
    pub product_id: String,
    /// Page to return to: `/checkout`, otherwise the catalog.
    #[serde(default)]
    pub return_to: Option<String>,
}

/// Only known pages are valid redirect targets.
fn return_target(return_to: Option<&str>) -> &'static str {
    match return_to {
        Some("/checkout") => "/checkout",
        _ => "/",
    }
}

/// Add one unit of a product.
///
/// The product is re-read from the store so the line picks up its current
/// name, price and stock.
#[instrument(skip(state, cart))]
pub async fn add(
    State(state): State<AppState>,
    mut cart: CartStore,
    Form(form): Form<CartItemForm>,
) -> Result<Response> {
    let id = ProductId::new(form.product_id);
    let product = Catalog::new(state.store())
        .product(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let message = match cart.add(&product).await? {
        AddOutcome::Added | AddOutcome::Incremented => {
            add_breadcrumb("cart", "Added to cart", Some(&[("product_id", id.as_str())]));
            format!("{} added", product.name)
        }
        AddOutcome::AtStockLimit if product.in_stock() => {
            format!("Only {} {} in stock", product.stock, product.name)
        }
        AddOutcome::AtStockLimit => format!("{} is out of stock", product.name),
    };
    flash::set(cart.session(), message).await;

    Ok(Redirect::to(return_target(form.return_to.as_deref())).into_response())
}

/// Take one unit off a line.
#[instrument(skip(cart))]
pub async fn decrease(mut cart: CartStore, Form(form): Form<CartItemForm>) -> Result<Response> {
    cart.decrease(&ProductId::new(form.product_id)).await?;
    Ok(Redirect::to(return_target(form.return_to.as_deref())).into_response())
}

/// Drop a line entirely.
#[instrument(skip(cart))]
pub async fn remove(mut cart: CartStore, Form(form): Form<CartItemForm>) -> Result<Response> {
    cart.remove(&ProductId::new(form.product_id)).await?;
    Ok(Redirect::to(return_target(form.return_to.as_deref())).into_response())
}
