//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are whole-unit rupee amounts (no minor-unit encoding). They are
//! stored in documents as JSON numbers and displayed with the rupee sign.

use core::fmt;
use core::iter::Sum;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Currency symbol used for every displayed amount.
pub const CURRENCY_SYMBOL: &str = "₹";

/// Errors that can occur when constructing a [`Price`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The input is not a decimal number.
    #[error("price must be a number")]
    NotANumber,
}

/// A non-negative price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    /// Zero rupees.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if the amount is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        Ok(Self(amount))
    }

    /// Create a price from a whole number of rupees.
    #[must_use]
    pub fn from_whole(amount: u32) -> Self {
        Self(Decimal::from(amount))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `qty` units at this unit price.
    #[must_use]
    pub fn times(self, qty: u32) -> Self {
        Self(self.0 * Decimal::from(qty))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CURRENCY_SYMBOL}{}", self.0.normalize())
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = Decimal::from_str(s.trim()).map_err(|_| PriceError::NotANumber)?;
        Self::new(amount)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.map(|p| p.0).sum())
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = rust_decimal::serde::float::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_price_rejects_negative() {
        assert_eq!(Price::new(Decimal::from(-1)), Err(PriceError::Negative));
        assert!(Price::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_price_display_uses_rupee_sign() {
        assert_eq!(Price::from_whole(20).to_string(), "₹20");
        assert_eq!("12.50".parse::<Price>().unwrap().to_string(), "₹12.5");
    }

    #[test]
    fn test_price_parse_errors() {
        assert_eq!("abc".parse::<Price>(), Err(PriceError::NotANumber));
        assert_eq!("-5".parse::<Price>(), Err(PriceError::Negative));
    }

    #[test]
    fn test_price_times_and_sum() {
        let total: Price = [Price::from_whole(20).times(2), Price::from_whole(15)]
            .into_iter()
            .sum();
        assert_eq!(total, Price::from_whole(55));
    }

    #[test]
    fn test_price_json_is_numeric() {
        let value = serde_json::to_value(Price::from_whole(20)).unwrap();
        assert!(value.is_number());

        let parsed: Price = serde_json::from_value(serde_json::json!(20)).unwrap();
        assert_eq!(parsed, Price::from_whole(20));

        let negative = serde_json::from_value::<Price>(serde_json::json!(-3));
        assert!(negative.is_err());
    }
}
