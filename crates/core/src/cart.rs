//! Shopping cart state machine.
//!
//! A [`Cart`] is an ordered list of [`CartLine`]s keyed by product. Each line
//! carries the product's name, price and stock as they were when the line was
//! last touched; quantities never exceed that captured stock. The cart knows
//! nothing about persistence beyond producing and reading a JSON snapshot.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::product::Product;
use crate::types::{Price, ProductId};

/// A cart snapshot that could not be read back.
#[derive(Debug, Error)]
#[error("malformed cart snapshot: {0}")]
pub struct CartSnapshotError(#[from] serde_json::Error);

/// One product entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    /// Unit price captured when the line was last touched.
    pub price: Price,
    /// Stock ceiling captured when the line was last touched.
    pub stock: u32,
    pub qty: u32,
}

impl CartLine {
    /// `qty × price` for this line.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.qty)
    }

    /// Whether another unit would exceed the captured stock.
    #[must_use]
    pub const fn at_stock_limit(&self) -> bool {
        self.qty >= self.stock
    }
}

/// Result of [`Cart::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new line was inserted with quantity 1.
    Added,
    /// An existing line's quantity went up by one.
    Incremented,
    /// Nothing changed: the line is already at the stock ceiling, or the
    /// product has no stock at all.
    AtStockLimit,
}

impl AddOutcome {
    /// Whether the cart was modified.
    #[must_use]
    pub const fn changed(self) -> bool {
        !matches!(self, Self::AtStockLimit)
    }
}

/// The visitor's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Read a cart back from a snapshot produced by [`Cart::to_snapshot`].
    ///
    /// Lines with a zero quantity are dropped.
    ///
    /// # Errors
    ///
    /// Returns `CartSnapshotError` if the snapshot is not a JSON list of lines.
    pub fn from_snapshot(snapshot: &str) -> Result<Self, CartSnapshotError> {
        let mut lines: Vec<CartLine> = serde_json::from_str(snapshot)?;
        lines.retain(|line| line.qty > 0);
        Ok(Self { lines })
    }

    /// Serialize the full line collection.
    ///
    /// # Errors
    ///
    /// Returns `CartSnapshotError` if serialization fails.
    pub fn to_snapshot(&self) -> Result<String, CartSnapshotError> {
        Ok(serde_json::to_string(&self.lines)?)
    }

    /// Add one unit of `product`.
    ///
    /// Inserts a new line with quantity 1 if the product is not in the cart.
    /// Otherwise increments the line unless it already holds as many units as
    /// the product has in stock, in which case the cart is left untouched.
    /// Touching a line refreshes its captured name, price and stock.
    pub fn add(&mut self, product: &Product) -> AddOutcome {
        match self.lines.iter_mut().find(|l| l.product_id == product.id) {
            Some(line) => {
                if line.qty >= product.stock {
                    return AddOutcome::AtStockLimit;
                }
                line.name.clone_from(&product.name);
                line.price = product.price;
                line.stock = product.stock;
                line.qty += 1;
                AddOutcome::Incremented
            }
            None => {
                if !product.in_stock() {
                    return AddOutcome::AtStockLimit;
                }
                self.lines.push(CartLine {
                    product_id: product.id.clone(),
                    name: product.name.clone(),
                    price: product.price,
                    stock: product.stock,
                    qty: 1,
                });
                AddOutcome::Added
            }
        }
    }

    /// Take one unit off the line for `id`, dropping the line at zero.
    ///
    /// Returns whether a line was found.
    pub fn decrease(&mut self, id: &ProductId) -> bool {
        let Some(line) = self.lines.iter_mut().find(|l| &l.product_id == id) else {
            return false;
        };
        line.qty = line.qty.saturating_sub(1);
        self.lines.retain(|l| l.qty > 0);
        true
    }

    /// Delete the line for `id`.
    ///
    /// Returns whether a line was removed.
    pub fn remove(&mut self, id: &ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| &l.product_id != id);
        self.lines.len() != before
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Σ(qty × price) over all lines, recomputed on every call.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Σ qty over all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.qty).sum()
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn line(&self, id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product_id == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
