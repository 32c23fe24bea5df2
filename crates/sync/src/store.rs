//! Local state store.
//!
//! [`reduce`] is the only way [`ShopState`] changes. It is pure and
//! synchronous: no I/O, no logging, no clocks.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopsync_core::{CartLine, Product, ProductId};

/// The shopper's cart and session wishlist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShopState {
    /// Cart lines, unique by product id, each with quantity >= 1.
    pub cart: Vec<CartLine>,
    /// Saved products, unique by product id.
    pub wishlist: Vec<Product>,
    /// Whether a remote cart operation is in flight.
    #[serde(skip)]
    pub is_loading: bool,
}

impl ShopState {
    /// Sum of `price * quantity` over the cart.
    #[must_use]
    pub fn cart_total(&self) -> Decimal {
        self.cart.iter().map(CartLine::line_total).sum()
    }

    /// Total number of units in the cart.
    #[must_use]
    pub fn cart_count(&self) -> u32 {
        self.cart
            .iter()
            .fold(0u32, |acc, line| acc.saturating_add(line.quantity))
    }

    /// Quantity of a product in the cart, if present.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> Option<u32> {
        self.cart
            .iter()
            .find(|line| line.product_id() == product_id)
            .map(|line| line.quantity)
    }

    #[must_use]
    pub fn is_in_cart(&self, product_id: ProductId) -> bool {
        self.quantity_of(product_id).is_some()
    }

    #[must_use]
    pub fn is_in_wishlist(&self, product_id: ProductId) -> bool {
        self.wishlist.iter().any(|p| p.id == product_id)
    }
}

/// State transitions understood by [`reduce`].
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Add one unit, creating the line if needed.
    AddToCart(Product),
    /// Drop the line for a product. No-op if absent.
    RemoveFromCart(ProductId),
    /// Set a line's quantity. `<= 0` removes the line.
    UpdateQuantity(ProductId, i64),
    /// Empty the cart.
    ClearCart,
    /// Save a product. No-op if already saved.
    AddToWishlist(Product),
    /// Unsave a product.
    RemoveFromWishlist(ProductId),
    /// Replace the whole state.
    LoadUserData(ShopState),
    /// Replace the cart with a backend snapshot and clear the loading flag.
    LoadCartFromRemote(Vec<CartLine>),
    /// Set the loading flag only.
    SetLoading(bool),
}

/// Apply an action to a state, returning the new state.
#[must_use]
pub fn reduce(mut state: ShopState, action: Action) -> ShopState {
    match action {
        Action::AddToCart(product) => {
            match state.cart.iter_mut().find(|l| l.product_id() == product.id) {
                Some(line) => line.quantity = line.quantity.saturating_add(1),
                None => state.cart.push(CartLine::single(product)),
            }
        }
        Action::RemoveFromCart(product_id) => {
            state.cart.retain(|l| l.product_id() != product_id);
        }
        Action::UpdateQuantity(product_id, quantity) => {
            if quantity <= 0 {
                return reduce(state, Action::RemoveFromCart(product_id));
            }
            let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
            if let Some(line) = state.cart.iter_mut().find(|l| l.product_id() == product_id) {
                line.quantity = quantity;
            }
        }
        Action::ClearCart => state.cart.clear(),
        Action::AddToWishlist(product) => {
            if !state.is_in_wishlist(product.id) {
                state.wishlist.push(product);
            }
        }
        Action::RemoveFromWishlist(product_id) => {
            state.wishlist.retain(|p| p.id != product_id);
        }
        Action::LoadUserData(next) => return next,
        Action::LoadCartFromRemote(cart) => {
            state.cart = cart;
            state.is_loading = false;
        }
        Action::SetLoading(is_loading) => state.is_loading = is_loading,
    }
    state
}
