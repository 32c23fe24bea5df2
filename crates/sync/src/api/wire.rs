//! Backend wire shapes and their conversion into domain types.
//!
//! The backend is loose about product fields (`image` vs `imageUrl`,
//! numeric vs string prices, `name` vs `title`). Everything is normalized
//! here so the rest of the crate only sees [`Product`] and [`CartLine`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::warn;

use shopsync_core::{
    CartLine, Product, ProductId, ShareStatus, Uid, Wishlist, WishlistEntry, WishlistId,
    WishlistName, merge_lines,
};

use super::{ApiError, CartSnapshot};

// =============================================================================
// Responses
// =============================================================================

/// Product as sent by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct WireProduct {
    pub id: i64,
    #[serde(alias = "title")]
    pub name: String,
    pub price: Decimal,
    #[serde(default, alias = "originalPrice")]
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub discount: Option<f64>,
}

/// One cart line as sent by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct WireCartItem {
    #[serde(alias = "product")]
    pub product_details: WireProduct,
    pub quantity: i64,
}

/// Cart response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireCart {
    #[serde(default)]
    pub items: Vec<WireCartItem>,
}

/// One wishlist entry as sent by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct WireWishlistItem {
    #[serde(alias = "product_details")]
    pub product: WireProduct,
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
}

/// Wishlist response body.
#[derive(Debug, Clone, Deserialize)]
pub struct WireWishlist {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default, alias = "products")]
    pub items: Vec<WireWishlistItem>,
    #[serde(default)]
    pub share_status: ShareStatus,
}

// =============================================================================
// Requests
// =============================================================================

/// Product as sent to the backend alongside an add-to-cart.
#[derive(Debug, Clone, Serialize)]
pub struct WireProductOut<'a> {
    pub id: i64,
    pub name: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<&'a str>,
    pub category: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<u8>,
}

impl<'a> From<&'a Product> for WireProductOut<'a> {
    fn from(p: &'a Product) -> Self {
        Self {
            id: p.id.as_i64(),
            name: &p.name,
            price: p.price,
            original_price: p.original_price,
            image: p.image.as_deref(),
            category: &p.category,
            description: p.description.as_deref(),
            rating: p.rating,
            discount: p.discount,
        }
    }
}

/// `POST /cart/items` body.
#[derive(Debug, Serialize)]
pub struct AddItemRequest<'a> {
    pub user_id: &'a str,
    pub product_id: i64,
    pub quantity: u32,
    pub product: WireProductOut<'a>,
}

/// `PUT /cart/items/{product_id}` body.
#[derive(Debug, Serialize)]
pub struct UpdateQuantityRequest<'a> {
    pub user_id: &'a str,
    pub quantity: i64,
}

/// `POST /wishlist` body.
#[derive(Debug, Serialize)]
pub struct CreateWishlistRequest<'a> {
    pub name: &'a str,
    pub user_id: &'a str,
}

/// `POST /wishlist/{id}/products` body.
#[derive(Debug, Serialize)]
pub struct AddWishlistProductRequest {
    pub product_id: i64,
}

// =============================================================================
// Normalization
// =============================================================================

/// Convert a backend product into a domain [`Product`].
///
/// `image` wins over `image_url`/`imageUrl`; a fractional discount is
/// rounded to the nearest whole percent.
#[must_use]
pub fn normalize_product(wire: WireProduct) -> Product {
    Product {
        id: ProductId::new(wire.id),
        name: wire.name,
        price: wire.price,
        original_price: wire.original_price,
        image: wire.image.or(wire.image_url).filter(|s| !s.is_empty()),
        category: wire.category.unwrap_or_default(),
        description: wire.description,
        rating: wire.rating,
        discount: wire
            .discount
            .and_then(|d| Decimal::try_from(d).ok())
            .and_then(|d| d.round().to_u8()),
    }
}

/// Convert a backend cart into a [`CartSnapshot`].
///
/// Lines with a non-positive quantity are dropped and duplicate product
/// lines are merged so the snapshot upholds the cart invariants.
#[must_use]
pub fn normalize_cart(wire: WireCart) -> CartSnapshot {
    let lines: Vec<CartLine> = wire
        .items
        .into_iter()
        .filter_map(|item| {
            let Ok(quantity) = u32::try_from(item.quantity) else {
                warn!(
                    product_id = item.product_details.id,
                    quantity = item.quantity,
                    "Dropping cart line with invalid quantity"
                );
                return None;
            };
            Some(CartLine {
                product: normalize_product(item.product_details),
                quantity,
            })
        })
        .collect();
    merge_lines(&lines, &[])
}

/// Convert a backend wishlist into a [`Wishlist`].
///
/// # Errors
///
/// Returns `ApiError::Parse` if the backend sent an invalid name.
pub fn normalize_wishlist(wire: WireWishlist) -> Result<Wishlist, ApiError> {
    let name = WishlistName::parse(&wire.name)
        .map_err(|e| ApiError::Parse(format!("wishlist {}: {e}", wire.id)))?;
    let mut wishlist = Wishlist {
        id: WishlistId::new(wire.id),
        user_id: Uid::new(wire.user_id),
        name,
        entries: wire
            .items
            .into_iter()
            .map(|item| WishlistEntry {
                product: normalize_product(item.product),
                added_at: item.added_at.unwrap_or_else(Utc::now),
            })
            .collect(),
        share_status: wire.share_status,
    };
    wishlist.dedup_entries();
    Ok(wishlist)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_product_image_aliases() {
        let wire: WireProduct = serde_json::from_str(
            r#"{"id": 1, "name": "Mug", "price": 9.99, "imageUrl": "https://cdn/mug.png"}"#,
        )
        .unwrap();
        let product = normalize_product(wire);
        assert_eq!(product.image.as_deref(), Some("https://cdn/mug.png"));
        assert_eq!(product.price, Decimal::new(999, 2));

        let wire: WireProduct = serde_json::from_str(
            r#"{"id": 1, "title": "Mug", "price": "9.99", "image": "a.png", "image_url": "b.png"}"#,
        )
        .unwrap();
        let product = normalize_product(wire);
        assert_eq!(product.name, "Mug");
        assert_eq!(product.image.as_deref(), Some("a.png"));
    }

    #[test]
    fn test_normalize_product_rounds_discount() {
        let wire: WireProduct = serde_json::from_str(
            r#"{"id": 2, "name": "Lamp", "price": 30, "originalPrice": 40, "discount": 24.6}"#,
        )
        .unwrap();
        let product = normalize_product(wire);
        assert_eq!(product.discount, Some(25));
        assert_eq!(product.original_price, Some(Decimal::new(40, 0)));
    }

    #[test]
    fn test_normalize_cart_enforces_invariants() {
        let wire: WireCart = serde_json::from_str(
            r#"{"items": [
                {"product_details": {"id": 1, "name": "A", "price": 1}, "quantity": 2},
                {"product_details": {"id": 2, "name": "B", "price": 1}, "quantity": 0},
                {"product_details": {"id": 1, "name": "A", "price": 1}, "quantity": 1},
                {"product_details": {"id": 3, "name": "C", "price": 1}, "quantity": -4}
            ]}"#,
        )
        .unwrap();
        let cart = normalize_cart(wire);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].product_id(), ProductId::new(1));
        assert_eq!(cart[0].quantity, 3);
    }

    #[test]
    fn test_missing_items_is_empty_cart() {
        let wire: WireCart = serde_json::from_str("{}").unwrap();
        assert!(normalize_cart(wire).is_empty());
    }

    #[test]
    fn test_product_out_sends_numeric_price() {
        let product = Product::new(ProductId::new(4), "Pen", Decimal::new(250, 2));
        let json = serde_json::to_value(WireProductOut::from(&product)).unwrap();
        assert_eq!(json["price"], serde_json::json!(2.5));
        assert!(json.get("image").is_none());
    }

    #[test]
    fn test_normalize_wishlist() {
        let wire: WireWishlist = serde_json::from_str(
            r#"{"id": "wl1", "user_id": "u1", "name": "Gifts", "share_status": "public",
                "products": [
                    {"product": {"id": 1, "name": "A", "price": 1}, "added_at": "2024-01-01T00:00:00Z"},
                    {"product": {"id": 1, "name": "A", "price": 1}}
                ]}"#,
        )
        .unwrap();
        let wishlist = normalize_wishlist(wire).unwrap();
        assert_eq!(wishlist.item_count(), 1);
        assert_eq!(wishlist.share_status, ShareStatus::Public);
        assert_eq!(wishlist.name.as_str(), "Gifts");
    }

    #[test]
    fn test_normalize_wishlist_rejects_bad_name() {
        let wire: WireWishlist =
            serde_json::from_str(r#"{"id": "wl1", "user_id": "u1", "name": "  "}"#).unwrap();
        assert!(matches!(normalize_wishlist(wire), Err(ApiError::Parse(_))));
    }
}
