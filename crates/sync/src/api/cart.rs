//! Cart endpoints.

use async_trait::async_trait;
use reqwest::Method;
use tracing::{debug, instrument};

use shopsync_core::{CartLine, Product, ProductId, Uid};

use super::wire::{AddItemRequest, UpdateQuantityRequest, WireCart, WireProductOut, normalize_cart};
use super::{ApiClient, ApiError, CartBackend, CartSnapshot};

#[async_trait]
impl CartBackend for ApiClient {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn get_cart(&self, user_id: &Uid) -> Result<CartSnapshot, ApiError> {
        let url = self.url(&["cart"], Some(user_id))?;
        match self.send_json::<WireCart>(self.request(Method::GET, url)).await {
            Ok(cart) => Ok(normalize_cart(cart)),
            Err(ApiError::NotFound(_)) => {
                debug!("No remote cart yet, treating as empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, product), fields(user_id = %user_id, product_id = %product.id))]
    async fn add_item(
        &self,
        user_id: &Uid,
        product: &Product,
        quantity: u32,
    ) -> Result<CartSnapshot, ApiError> {
        if quantity == 0 {
            return Err(ApiError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }
        let url = self.url(&["cart", "items"], None)?;
        let body = AddItemRequest {
            user_id: user_id.as_str(),
            product_id: product.id.as_i64(),
            quantity,
            product: WireProductOut::from(product),
        };
        let cart: WireCart = self
            .send_json(self.request(Method::POST, url).json(&body))
            .await?;
        Ok(normalize_cart(cart))
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn remove_item(
        &self,
        user_id: &Uid,
        product_id: ProductId,
    ) -> Result<CartSnapshot, ApiError> {
        let id = product_id.to_string();
        let url = self.url(&["cart", "items", &id], Some(user_id))?;
        let cart: WireCart = self.send_json(self.request(Method::DELETE, url)).await?;
        Ok(normalize_cart(cart))
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn update_quantity(
        &self,
        user_id: &Uid,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartSnapshot, ApiError> {
        if quantity < 1 {
            return Err(ApiError::Validation(format!(
                "quantity must be at least 1 (got {quantity}); remove the item instead"
            )));
        }
        let id = product_id.to_string();
        let url = self.url(&["cart", "items", &id], None)?;
        let body = UpdateQuantityRequest {
            user_id: user_id.as_str(),
            quantity,
        };
        let cart: WireCart = self
            .send_json(self.request(Method::PUT, url).json(&body))
            .await?;
        Ok(normalize_cart(cart))
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn clear_cart(&self, user_id: &Uid) -> Result<(), ApiError> {
        let url = self.url(&["cart"], Some(user_id))?;
        self.send_empty(self.request(Method::DELETE, url)).await
    }

    #[instrument(skip(self, lines), fields(user_id = %user_id, lines = lines.len()))]
    async fn sync_local_cart_to_remote(
        &self,
        user_id: &Uid,
        lines: &[CartLine],
    ) -> Result<(), ApiError> {
        // The backend has no bulk endpoint; lines are pushed one at a time
        // so a failure part-way leaves earlier lines committed.
        for line in lines.iter().filter(|l| l.quantity > 0) {
            self.add_item(user_id, &line.product, line.quantity).await?;
        }
        Ok(())
    }
}
