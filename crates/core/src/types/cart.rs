//! Cart line items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::product::Product;

/// A product plus purchase quantity within a cart.
///
/// A stored line always has `quantity >= 1`; a cart holds at most one line
/// per product id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// The product being purchased.
    pub product: Product,
    /// Number of units.
    pub quantity: u32,
}

impl CartLine {
    /// A new line with quantity 1.
    #[must_use]
    pub const fn single(product: Product) -> Self {
        Self {
            product,
            quantity: 1,
        }
    }

    /// Product ID of this line.
    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        self.product.id
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// Merge two carts, summing quantities per product.
///
/// Order follows `first`, then products only present in `second`. Lines with
/// a zero quantity are dropped.
#[must_use]
pub fn merge_lines(first: &[CartLine], second: &[CartLine]) -> Vec<CartLine> {
    let mut merged: Vec<CartLine> = Vec::with_capacity(first.len() + second.len());
    for line in first.iter().chain(second) {
        if line.quantity == 0 {
            continue;
        }
        match merged
            .iter_mut()
            .find(|existing| existing.product_id() == line.product_id())
        {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(line.quantity);
            }
            None => merged.push(line.clone()),
        }
    }
    merged
}
