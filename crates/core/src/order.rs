//! Orders and delivery details.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::{Cart, CartLine};
use crate::types::{OrderId, OrderStatus, Price, ProductId};

/// One of the four required delivery fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryField {
    Phone,
    Room,
    Floor,
    Building,
}

impl DeliveryField {
    /// Form label shown to the visitor.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Phone => "Phone Number",
            Self::Room => "Room No",
            Self::Floor => "Floor",
            Self::Building => "Building Name/Hostel Name",
        }
    }
}

/// Reasons an order cannot be built.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("your cart is empty")]
    EmptyCart,
    #[error("missing delivery field: {}", .0.label())]
    MissingField(DeliveryField),
}

/// Where to bring the order. All fields are free text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub phone: String,
    pub room: String,
    pub floor: String,
    pub building: String,
}

impl DeliveryDetails {
    /// Trim every field and require each to be non-empty.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::MissingField` naming the first empty field.
    pub fn validated(self) -> Result<Self, DeliveryError> {
        let details = Self {
            phone: self.phone.trim().to_owned(),
            room: self.room.trim().to_owned(),
            floor: self.floor.trim().to_owned(),
            building: self.building.trim().to_owned(),
        };

        let checks = [
            (&details.phone, DeliveryField::Phone),
            (&details.room, DeliveryField::Room),
            (&details.floor, DeliveryField::Floor),
            (&details.building, DeliveryField::Building),
        ];
        if let Some((_, field)) = checks.iter().find(|(value, _)| value.is_empty()) {
            return Err(DeliveryError::MissingField(*field));
        }

        Ok(details)
    }
}

/// Snapshot of one purchased line. Stock is deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub qty: u32,
    pub price: Price,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.qty)
    }
}

impl From<&CartLine> for OrderItem {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id.clone(),
            name: line.name.clone(),
            qty: line.qty,
            price: line.price,
        }
    }
}

/// An order about to be written to the `orders` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub items: Vec<OrderItem>,
    pub total: Price,
    #[serde(flatten)]
    pub delivery: DeliveryDetails,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    /// Snapshot the cart into a pending order.
    ///
    /// The total is computed here, at placement time.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::EmptyCart` for an empty cart, or
    /// `DeliveryError::MissingField` if any delivery field is blank.
    pub fn from_cart(
        cart: &Cart,
        delivery: DeliveryDetails,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DeliveryError> {
        if cart.is_empty() {
            return Err(DeliveryError::EmptyCart);
        }
        let delivery = delivery.validated()?;

        Ok(Self {
            items: cart.lines().iter().map(OrderItem::from).collect(),
            total: cart.total(),
            delivery,
            status: OrderStatus::Pending,
            created_at,
        })
    }
}

/// An order as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub total: Price,
    #[serde(flatten)]
    pub delivery: DeliveryDetails,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::product::Product;

    fn details() -> DeliveryDetails {
        DeliveryDetails {
            phone: "9876543210".to_string(),
            room: "204".to_string(),
            floor: "2nd".to_string(),
            building: "Sunrise PG".to_string(),
        }
    }

    fn chips_cart() -> Cart {
        let chips = Product {
            id: ProductId::new("a"),
            name: "Chips".to_string(),
            price: Price::from_whole(20),
            stock: 5,
            category: "chips".to_string(),
            image_url: String::new(),
            created_at: None,
        };
        let mut cart = Cart::new();
        cart.add(&chips);
        cart.add(&chips);
        cart
    }

    #[test]
    fn test_validated_trims_fields() {
        let mut raw = details();
        raw.room = "  204 ".to_string();
        assert_eq!(raw.validated().unwrap().room, "204");
    }

    #[test]
    fn test_validated_rejects_blank_field() {
        let mut raw = details();
        raw.floor = "   ".to_string();
        assert_eq!(
            raw.validated(),
            Err(DeliveryError::MissingField(DeliveryField::Floor))
        );
    }

    #[test]
    fn test_from_cart_rejects_empty_cart() {
        let result = NewOrder::from_cart(&Cart::new(), details(), Utc::now());
        assert_eq!(result, Err(DeliveryError::EmptyCart));
    }

    #[test]
    fn test_from_cart_snapshots_lines() {
        let order = NewOrder::from_cart(&chips_cart(), details(), Utc::now()).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total, Price::from_whole(40));
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].qty, 2);
    }

    #[test]
    fn test_order_document_strips_stock_and_flattens_delivery() {
        let order = NewOrder::from_cart(&chips_cart(), details(), Utc::now()).unwrap();
        let value = serde_json::to_value(&order).unwrap();

        assert!(value["items"][0].get("stock").is_none());
        assert_eq!(value["items"][0]["productId"], "a");
        assert_eq!(value["room"], "204");
        assert_eq!(value["status"], "pending");
        assert!(value.get("delivery").is_none());
    }
}
