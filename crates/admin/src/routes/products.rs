//! Stock editor route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use pg_delivery_core::{Product, ProductId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireOperator;
use crate::services::{StockAdjustment, StockError, adjust_stock, flash, list_products};
use crate::state::AppState;

const AT_ZERO_MESSAGE: &str = "Stock is already 0.";
const MISSING_PRODUCT_MESSAGE: &str = "That product no longer exists.";
const UPDATE_FAILED_MESSAGE: &str = "Failed to update stock. Please try again.";

/// Product row display data.
#[derive(Clone)]
pub struct ProductRow {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: String,
    pub stock: u32,
}

impl From<&Product> for ProductRow {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            category: product.category.clone(),
            price: product.price.to_string(),
            stock: product.stock,
        }
    }
}

/// Stock editor template.
#[derive(Template, WebTemplate)]
#[template(path = "products.html")]
pub struct ProductsTemplate {
    pub products: Vec<ProductRow>,
    pub flash: Option<String>,
}

/// One stock editor click.
#[derive(Debug, Deserialize)]
pub struct StockForm {
    pub adjustment: StockAdjustment,
    /// Stock shown on the page when the button was clicked.
    #[serde(default)]
    pub observed: u32,
}

/// Show every product with its stock.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireOperator(_operator): RequireOperator,
    session: Session,
) -> Result<Response> {
    let products = list_products(state.store()).await?;
    Ok(ProductsTemplate {
        products: products.iter().map(ProductRow::from).collect(),
        flash: flash::take(&session).await,
    }
    .into_response())
}

/// Apply one click, then send the operator back to a freshly read list.
#[instrument(skip_all, fields(product_id = %id, adjustment = ?form.adjustment))]
pub async fn adjust(
    State(state): State<AppState>,
    RequireOperator(_operator): RequireOperator,
    session: Session,
    Path(id): Path<ProductId>,
    Form(form): Form<StockForm>,
) -> Redirect {
    match adjust_stock(state.store(), &id, form.adjustment, form.observed).await {
        Ok(()) => {}
        Err(StockError::AtZero) => {
            tracing::debug!("decrement at zero rejected");
            flash::set(&session, AT_ZERO_MESSAGE).await;
        }
        Err(StockError::NotFound(_)) => {
            tracing::warn!("stock change for missing product");
            flash::set(&session, MISSING_PRODUCT_MESSAGE).await;
        }
        Err(err @ StockError::Store(_)) => {
            let event_id = sentry::capture_error(&err);
            tracing::error!(error = %err, sentry_event_id = %event_id, "stock update failed");
            flash::set(&session, UPDATE_FAILED_MESSAGE).await;
        }
    }
    Redirect::to("/admin/products")
}
