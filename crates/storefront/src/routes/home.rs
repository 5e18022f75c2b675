//! Home page route handler: the product catalog.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use pg_delivery_core::{Cart, Product};
use tracing::instrument;

use crate::error::Result;
use crate::services::{CartStore, Catalog, flash};
use crate::state::AppState;

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductCard {
    pub id: String,
    pub name: String,
    pub price: String,
    pub category: String,
    pub image_url: String,
    pub stock: u32,
    /// Units of this product already in the visitor's cart.
    pub in_cart: u32,
    pub can_add: bool,
}

impl ProductCard {
    fn new(product: &Product, cart: &Cart) -> Self {
        let in_cart = cart.line(&product.id).map_or(0, |line| line.qty);
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            price: product.price.to_string(),
            category: product.category.clone(),
            image_url: product.image_url.clone(),
            stock: product.stock,
            in_cart,
            can_add: product.in_stock() && in_cart < product.stock,
        }
    }
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub products: Vec<ProductCard>,
    pub cart_count: u32,
    pub cart_total: String,
    pub flash: Option<String>,
}

/// Display the catalog.
#[instrument(skip(state, cart))]
pub async fn home(State(state): State<AppState>, cart: CartStore) -> Result<HomeTemplate> {
    let products = Catalog::new(state.store()).products().await?;
    let flash = flash::take(cart.session()).await;

    Ok(HomeTemplate {
        products: products
            .iter()
            .map(|product| ProductCard::new(product, cart.cart()))
            .collect(),
        cart_count: cart.cart().item_count(),
        cart_total: cart.cart().total().to_string(),
        flash,
    })
}
