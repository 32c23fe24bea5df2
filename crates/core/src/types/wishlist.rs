//! Named, shareable wishlists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ProductId, WishlistId};
use super::product::Product;
use super::status::ShareStatus;
use super::user::Uid;

/// Errors that can occur when parsing a [`WishlistName`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WishlistNameError {
    /// The name is empty after trimming.
    #[error("wishlist name cannot be empty")]
    Empty,
    /// The name is too long.
    #[error("wishlist name must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// A user-chosen wishlist name: non-empty after trimming, at most 50
/// characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WishlistName(String);

impl WishlistName {
    /// Maximum length in characters.
    pub const MAX_LENGTH: usize = 50;

    /// Parse a wishlist name.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed name is empty or longer than
    /// [`Self::MAX_LENGTH`] characters.
    pub fn parse(s: &str) -> Result<Self, WishlistNameError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(WishlistNameError::Empty);
        }
        if s.chars().count() > Self::MAX_LENGTH {
            return Err(WishlistNameError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WishlistName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for WishlistName {
    type Error = WishlistNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WishlistName> for String {
    fn from(name: WishlistName) -> Self {
        name.0
    }
}

/// A product saved to a wishlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistEntry {
    /// The saved product.
    pub product: Product,
    /// When the product was added.
    pub added_at: DateTime<Utc>,
}

/// A named wishlist owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wishlist {
    /// Backend-issued ID.
    pub id: WishlistId,
    /// Owner.
    pub user_id: Uid,
    /// Display name.
    pub name: WishlistName,
    /// Entries in insertion order, unique by product id.
    pub entries: Vec<WishlistEntry>,
    /// Visibility.
    #[serde(default)]
    pub share_status: ShareStatus,
}

impl Wishlist {
    /// Number of products in the wishlist.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.entries.len()
    }

    /// Whether the product is already saved.
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.entries.iter().any(|e| e.product.id == product_id)
    }

    /// Drop later duplicates of the same product, keeping the first entry.
    pub fn dedup_entries(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.entries.retain(|e| seen.insert(e.product.id));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_name_validation() {
        assert_eq!(WishlistName::parse(" Birthday ").unwrap().as_str(), "Birthday");
        assert_eq!(WishlistName::parse("   "), Err(WishlistNameError::Empty));
        assert!(WishlistName::parse(&"x".repeat(50)).is_ok());
        assert_eq!(
            WishlistName::parse(&"x".repeat(51)),
            Err(WishlistNameError::TooLong { max: 50 })
        );
    }

    #[test]
    fn test_dedup_keeps_first_entry() {
        let product = Product::new(ProductId::new(3), "Kettle", Decimal::new(40, 0));
        let first = WishlistEntry {
            product: product.clone(),
            added_at: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
        };
        let second = WishlistEntry {
            product,
            added_at: DateTime::<Utc>::from_timestamp(1_700_000_100, 0).unwrap(),
        };
        let mut wishlist = Wishlist {
            id: WishlistId::new("wl"),
            user_id: Uid::new("u1"),
            name: WishlistName::parse("Home").unwrap(),
            entries: vec![first.clone(), second],
            share_status: ShareStatus::Private,
        };

        wishlist.dedup_entries();
        assert_eq!(wishlist.item_count(), 1);
        assert_eq!(wishlist.entries[0], first);
        assert!(wishlist.contains(ProductId::new(3)));
    }
}
