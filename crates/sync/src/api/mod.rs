//! Remote persistence adapter for the cart/wishlist backend.
//!
//! # Architecture
//!
//! - [`CartBackend`] and [`WishlistBackend`] are the seams the sync layer
//!   depends on; tests swap in mocks
//! - [`ApiClient`] implements both over `reqwest` against the REST backend
//! - Backend product shapes are normalized in exactly one place
//!   ([`wire::normalize_product`])
//!
//! # Endpoints
//!
//! ## Cart
//! - `GET /cart?user_id=` / `DELETE /cart?user_id=`
//! - `POST /cart/items`, `PUT /cart/items/{product_id}`,
//!   `DELETE /cart/items/{product_id}?user_id=`
//!
//! ## Wishlists
//! - `GET /wishlist?user_id=`, `POST /wishlist`
//! - `POST /wishlist/{id}/products?user_id=`,
//!   `DELETE /wishlist/{id}/products/{product_id}?user_id=`
//! - `DELETE /wishlist/{id}?user_id=`

mod cart;
mod client;
mod wishlist;
pub mod wire;

pub use client::ApiClient;

use async_trait::async_trait;
use thiserror::Error;

use shopsync_core::{CartLine, Product, ProductId, Uid, Wishlist, WishlistId, WishlistName};

/// The authoritative cart returned by the backend after a mutation.
pub type CartSnapshot = Vec<CartLine>;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connection refused, DNS, TLS, body read).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("HTTP error: {status} - {message}")]
    HttpStatus { status: u16, message: String },

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request was rejected before or by the backend as malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The response body could not be understood.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ApiError {
    /// Whether re-issuing the same request could succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            Self::NotFound(_) | Self::Validation(_) | Self::Parse(_) => false,
        }
    }
}

/// Cart persistence operations, keyed by authenticated user.
#[async_trait]
pub trait CartBackend: Send + Sync {
    /// Fetch the current cart. A missing cart is an empty cart.
    async fn get_cart(&self, user_id: &Uid) -> Result<CartSnapshot, ApiError>;

    /// Add `quantity` units of a product. The backend decides the resulting
    /// quantity.
    async fn add_item(
        &self,
        user_id: &Uid,
        product: &Product,
        quantity: u32,
    ) -> Result<CartSnapshot, ApiError>;

    /// Remove a product's line.
    async fn remove_item(
        &self,
        user_id: &Uid,
        product_id: ProductId,
    ) -> Result<CartSnapshot, ApiError>;

    /// Set a line's quantity. `quantity` must be at least 1.
    async fn update_quantity(
        &self,
        user_id: &Uid,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartSnapshot, ApiError>;

    /// Remove every line.
    async fn clear_cart(&self, user_id: &Uid) -> Result<(), ApiError>;

    /// Push a pre-login local cart into the backend.
    async fn sync_local_cart_to_remote(
        &self,
        user_id: &Uid,
        lines: &[CartLine],
    ) -> Result<(), ApiError>;
}

/// Named wishlist operations, keyed by authenticated user.
#[async_trait]
pub trait WishlistBackend: Send + Sync {
    async fn list_wishlists(&self, user_id: &Uid) -> Result<Vec<Wishlist>, ApiError>;

    async fn create_wishlist(
        &self,
        user_id: &Uid,
        name: &WishlistName,
    ) -> Result<Wishlist, ApiError>;

    async fn add_product(
        &self,
        user_id: &Uid,
        wishlist_id: &WishlistId,
        product_id: ProductId,
    ) -> Result<Wishlist, ApiError>;

    async fn remove_product(
        &self,
        user_id: &Uid,
        wishlist_id: &WishlistId,
        product_id: ProductId,
    ) -> Result<Wishlist, ApiError>;

    async fn delete_wishlist(&self, user_id: &Uid, wishlist_id: &WishlistId)
    -> Result<(), ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::HttpStatus {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error: 503 - unavailable");

        let err = ApiError::Validation("quantity must be at least 1".to_string());
        assert_eq!(err.to_string(), "Validation error: quantity must be at least 1");
    }

    #[test]
    fn test_transient_classification() {
        let status = |status| ApiError::HttpStatus {
            status,
            message: String::new(),
        };
        assert!(status(500).is_transient());
        assert!(status(429).is_transient());
        assert!(!status(400).is_transient());
        assert!(!ApiError::Validation(String::new()).is_transient());
        assert!(!ApiError::NotFound(String::new()).is_transient());
    }
}
