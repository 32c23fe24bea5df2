//! Wishlist endpoints.

use async_trait::async_trait;
use reqwest::Method;
use tracing::instrument;

use shopsync_core::{ProductId, Uid, Wishlist, WishlistId, WishlistName};

use super::wire::{
    AddWishlistProductRequest, CreateWishlistRequest, WireWishlist, normalize_wishlist,
};
use super::{ApiClient, ApiError, WishlistBackend};

#[async_trait]
impl WishlistBackend for ApiClient {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list_wishlists(&self, user_id: &Uid) -> Result<Vec<Wishlist>, ApiError> {
        let url = self.url(&["wishlist"], Some(user_id))?;
        let wishlists: Vec<WireWishlist> = match self.send_json(self.request(Method::GET, url)).await
        {
            Ok(wishlists) => wishlists,
            Err(ApiError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };
        wishlists.into_iter().map(normalize_wishlist).collect()
    }

    #[instrument(skip(self), fields(user_id = %user_id, name = %name))]
    async fn create_wishlist(
        &self,
        user_id: &Uid,
        name: &WishlistName,
    ) -> Result<Wishlist, ApiError> {
        let url = self.url(&["wishlist"], None)?;
        let body = CreateWishlistRequest {
            name: name.as_str(),
            user_id: user_id.as_str(),
        };
        let wishlist: WireWishlist = self
            .send_json(self.request(Method::POST, url).json(&body))
            .await?;
        normalize_wishlist(wishlist)
    }

    #[instrument(skip(self), fields(user_id = %user_id, wishlist_id = %wishlist_id))]
    async fn add_product(
        &self,
        user_id: &Uid,
        wishlist_id: &WishlistId,
        product_id: ProductId,
    ) -> Result<Wishlist, ApiError> {
        let url = self.url(&["wishlist", wishlist_id.as_str(), "products"], Some(user_id))?;
        let body = AddWishlistProductRequest {
            product_id: product_id.as_i64(),
        };
        let wishlist: WireWishlist = self
            .send_json(self.request(Method::POST, url).json(&body))
            .await?;
        normalize_wishlist(wishlist)
    }

    #[instrument(skip(self), fields(user_id = %user_id, wishlist_id = %wishlist_id))]
    async fn remove_product(
        &self,
        user_id: &Uid,
        wishlist_id: &WishlistId,
        product_id: ProductId,
    ) -> Result<Wishlist, ApiError> {
        let id = product_id.to_string();
        let url = self.url(
            &["wishlist", wishlist_id.as_str(), "products", &id],
            Some(user_id),
        )?;
        let wishlist: WireWishlist = self.send_json(self.request(Method::DELETE, url)).await?;
        normalize_wishlist(wishlist)
    }

    #[instrument(skip(self), fields(user_id = %user_id, wishlist_id = %wishlist_id))]
    async fn delete_wishlist(
        &self,
        user_id: &Uid,
        wishlist_id: &WishlistId,
    ) -> Result<(), ApiError> {
        let url = self.url(&["wishlist", wishlist_id.as_str()], Some(user_id))?;
        self.send_empty(self.request(Method::DELETE, url)).await
    }
}
