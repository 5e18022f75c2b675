//! Order notification text and the messaging deep link.
//!
//! After checkout the visitor is handed a link that opens a chat with the
//! store owner, pre-filled with a summary of the order.

use std::fmt::Write as _;

use thiserror::Error;

use crate::order::NewOrder;

/// Default host for chat deep links.
pub const DEFAULT_MESSAGING_BASE_URL: &str = "https://wa.me";

/// Errors that can occur when parsing a messaging recipient.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecipientError {
    #[error("recipient cannot be empty")]
    Empty,
    #[error("recipient must be a phone number in international format (digits only)")]
    NotANumber,
}

/// Render the fixed order notification template.
#[must_use]
pub fn order_message(order: &NewOrder) -> String {
    let delivery = &order.delivery;
    let mut message = String::from("New Order!\n\n");
    let _ = writeln!(message, "Room: {}, Floor: {}", delivery.room, delivery.floor);
    let _ = writeln!(message, "Building: {}", delivery.building);
    let _ = writeln!(message, "Phone: {}", delivery.phone);
    message.push_str("\nItems:\n");
    for item in &order.items {
        let _ = writeln!(message, "{} × {} ({})", item.qty, item.name, item.price);
    }
    let _ = write!(message, "\nTotal: {}", order.total);
    message
}

/// Builds `https://<host>/<recipient>?text=<message>` links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagingLink {
    base_url: String,
    recipient: String,
}

impl MessagingLink {
    /// Create a link builder for `recipient`.
    ///
    /// A leading `+` and any spaces or dashes are dropped; what remains must
    /// be digits.
    ///
    /// # Errors
    ///
    /// Returns `RecipientError` if the recipient is empty or not numeric.
    pub fn new(base_url: &str, recipient: &str) -> Result<Self, RecipientError> {
        let digits: String = recipient
            .trim()
            .trim_start_matches('+')
            .chars()
            .filter(|c| !matches!(c, ' ' | '-'))
            .collect();
        if digits.is_empty() {
            return Err(RecipientError::Empty);
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(RecipientError::NotANumber);
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            recipient: digits,
        })
    }

    /// The normalized recipient number.
    #[must_use]
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Deep link carrying `message` as percent-encoded text.
    #[must_use]
    pub fn deep_link(&self, message: &str) -> String {
        format!(
            "{}/{}?text={}",
            self.base_url,
            self.recipient,
            encode_uri_component(message)
        )
    }
}

/// Marks a browser's `encodeURIComponent` leaves unescaped on top of the
/// unreserved set `urlencoding` already keeps.
const URI_MARKS: [char; 5] = ['!', '\'', '(', ')', '*'];

/// Percent-encode `text` with the same reserved set as `encodeURIComponent`.
fn encode_uri_component(text: &str) -> String {
    let mut encoded = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(at) = rest.find(URI_MARKS) {
        encoded.push_str(&urlencoding::encode(&rest[..at]));
        encoded.push_str(&rest[at..=at]);
        rest = &rest[at + 1..];
    }
    encoded.push_str(&urlencoding::encode(rest));
    encoded
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::cart::Cart;
    use crate::order::DeliveryDetails;
    use crate::product::Product;
    use crate::types::{Price, ProductId};

    fn order() -> NewOrder {
        let mut cart = Cart::new();
        let chips = Product {
            id: ProductId::new("a"),
            name: "Chips".to_string(),
            price: Price::from_whole(20),
            stock: 5,
            category: String::new(),
            image_url: String::new(),
            created_at: None,
        };
        let cola = Product {
            id: ProductId::new("b"),
            name: "Cola".to_string(),
            price: Price::from_whole(40),
            stock: 5,
            ..chips.clone()
        };
        cart.add(&chips);
        cart.add(&chips);
        cart.add(&cola);
        let delivery = DeliveryDetails {
            phone: "9876543210".to_string(),
            room: "204".to_string(),
            floor: "2nd".to_string(),
            building: "Sunrise PG".to_string(),
        };
        NewOrder::from_cart(&cart, delivery, Utc::now()).unwrap()
    }

    #[test]
    fn test_order_message_matches_template() {
        let expected = "New Order!\n\
                        \n\
                        Room: 204, Floor: 2nd\n\
                        Building: Sunrise PG\n\
                        Phone: 9876543210\n\
                        \n\
                        Items:\n\
                        2 × Chips (₹20)\n\
                        1 × Cola (₹40)\n\
                        \n\
                        Total: ₹80";
        assert_eq!(order_message(&order()), expected);
    }

    #[test]
    fn test_recipient_normalization() {
        let link = MessagingLink::new("https://wa.me/", "+91 98765-43210").unwrap();
        assert_eq!(link.recipient(), "919876543210");
        assert_eq!(MessagingLink::new("https://wa.me", "  "), Err(RecipientError::Empty));
        assert_eq!(
            MessagingLink::new("https://wa.me", "owner"),
            Err(RecipientError::NotANumber)
        );
    }

    #[test]
    fn test_deep_link_percent_encodes_like_uri_component() {
        let link = MessagingLink::new(DEFAULT_MESSAGING_BASE_URL, "919876543210").unwrap();
        let url = link.deep_link("New Order!\n2 × Chips (₹20)");
        assert_eq!(
            url,
            "https://wa.me/919876543210?text=New%20Order!%0A2%20%C3%97%20Chips%20(%E2%82%B920)"
        );
    }

    #[test]
    fn test_encode_uri_component_reserved_set() {
        assert_eq!(encode_uri_component("it's *ok* (really)!"), "it's%20*ok*%20(really)!");
        assert_eq!(encode_uri_component("a&b=c?d#e/f+g"), "a%26b%3Dc%3Fd%23e%2Ff%2Bg");
        assert_eq!(encode_uri_component("-_.~"), "-_.~");
        assert_eq!(encode_uri_component("100%"), "100%25");
        assert_eq!(encode_uri_component(""), "");
    }
}
