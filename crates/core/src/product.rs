//! Catalog products.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// A product as read back from the `products` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Store-assigned identifier.
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    /// Sellable units left.
    pub stock: u32,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Whether at least one unit can be added to a cart.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// A product about to be written by product intake.
///
/// Field values are normalized on construction: the name is trimmed and the
/// category is trimmed and lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub price: Price,
    pub stock: u32,
    pub category: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

impl NewProduct {
    /// Build a normalized product document.
    #[must_use]
    pub fn new(
        name: &str,
        price: Price,
        stock: u32,
        category: &str,
        image_url: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.trim().to_owned(),
            price,
            stock,
            category: normalize_category(category),
            image_url: image_url.into(),
            created_at,
        }
    }
}

/// Trim and lowercase a free-text category.
#[must_use]
pub fn normalize_category(raw: &str) -> String {
    raw.trim().to_lowercase()
}
