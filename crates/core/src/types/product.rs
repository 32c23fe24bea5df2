//! Catalog product as seen by the client.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// A product in the store.
///
/// Products are sourced from the backend and never modified by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Current unit price.
    pub price: Decimal,
    /// Price before discount, if on sale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Decimal>,
    /// Image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Category name.
    #[serde(default)]
    pub category: String,
    /// Plain text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Average review rating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Discount percentage as reported by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<u8>,
}

impl Product {
    /// Create a product with only the fields the cart needs.
    #[must_use]
    pub fn new(id: ProductId, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            original_price: None,
            image: None,
            category: String::new(),
            description: None,
            rating: None,
            discount: None,
        }
    }

    /// Discount percentage, derived from `original_price` when the backend
    /// did not send one.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u8> {
        if self.discount.is_some() {
            return self.discount;
        }
        let original = self.original_price?;
        if original <= self.price || original.is_zero() {
            return None;
        }
        ((original - self.price) / original * Decimal::ONE_HUNDRED)
            .round()
            .to_u8()
    }
}
