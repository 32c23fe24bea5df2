//! Backend-owned named wishlists.
//!
//! Unlike cart mutations these are explicit user actions, so failures are
//! returned to the caller instead of falling back locally.

use std::sync::Arc;

use tracing::{info, instrument};

use shopsync_core::{ProductId, Uid, Wishlist, WishlistId, WishlistName};

use crate::api::WishlistBackend;
use crate::error::{Result, SyncError};
use crate::events::ShopEvent;
use crate::sync::ShopSync;

/// Named wishlist operations for the signed-in user of a [`ShopSync`].
#[derive(Clone)]
pub struct WishlistService {
    backend: Arc<dyn WishlistBackend>,
    sync: ShopSync,
}

impl std::fmt::Debug for WishlistService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WishlistService")
            .field("sync", &self.sync)
            .finish_non_exhaustive()
    }
}

impl WishlistService {
    #[must_use]
    pub fn new(backend: Arc<dyn WishlistBackend>, sync: ShopSync) -> Self {
        Self { backend, sync }
    }

    fn current_uid(&self) -> Result<Uid> {
        self.sync
            .user()
            .map(|user| user.uid)
            .ok_or(SyncError::NotAuthenticated)
    }

    fn changed(&self, wishlist_id: &WishlistId) {
        self.sync.events().publish(ShopEvent::WishlistsChanged {
            wishlist_id: wishlist_id.clone(),
        });
    }

    /// List the user's wishlists.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` without a signed-in user, or the backend
    /// error.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Wishlist>> {
        let uid = self.current_uid()?;
        Ok(self.backend.list_wishlists(&uid).await?)
    }

    /// Create a wishlist. The name is validated before any request is made.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a bad name, `NotAuthenticated` without a
    /// signed-in user, or the backend error.
    #[instrument(skip(self))]
    pub async fn create(&self, name: &str) -> Result<Wishlist> {
        let name = WishlistName::parse(name)?;
        let uid = self.current_uid()?;
        let wishlist = self.backend.create_wishlist(&uid, &name).await?;
        info!(wishlist_id = %wishlist.id, "Created wishlist");
        self.changed(&wishlist.id);
        Ok(wishlist)
    }

    /// Add a product to a wishlist.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` without a signed-in user, or the backend
    /// error.
    #[instrument(skip(self))]
    pub async fn add_product(
        &self,
        wishlist_id: &WishlistId,
        product_id: ProductId,
    ) -> Result<Wishlist> {
        let uid = self.current_uid()?;
        let wishlist = self
            .backend
            .add_product(&uid, wishlist_id, product_id)
            .await?;
        self.changed(wishlist_id);
        Ok(wishlist)
    }

    /// Remove a product from a wishlist.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` without a signed-in user, or the backend
    /// error.
    #[instrument(skip(self))]
    pub async fn remove_product(
        &self,
        wishlist_id: &WishlistId,
        product_id: ProductId,
    ) -> Result<Wishlist> {
        let uid = self.current_uid()?;
        let wishlist = self
            .backend
            .remove_product(&uid, wishlist_id, product_id)
            .await?;
        self.changed(wishlist_id);
        Ok(wishlist)
    }

    /// Delete a wishlist.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` without a signed-in user, or the backend
    /// error.
    #[instrument(skip(self))]
    pub async fn delete(&self, wishlist_id: &WishlistId) -> Result<()> {
        let uid = self.current_uid()?;
        self.backend.delete_wishlist(&uid, wishlist_id).await?;
        info!(%wishlist_id, "Deleted wishlist");
        self.changed(wishlist_id);
        Ok(())
    }
}
