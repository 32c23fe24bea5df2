//! Command implementations and the shared session they run in.

pub mod cart;
pub mod lists;
pub mod wishlist;

use std::sync::Arc;

use thiserror::Error;

use shopsync::{ApiClient, FileStore, ShopSync, SyncConfig, WishlistService};
use shopsync_core::{CurrencyCode, Email, EmailError, Price, Uid, User};

/// Errors that can occur while setting up a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The email given for the user is invalid.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// The command needs a signed-in user.
    #[error("This command needs --user")]
    MissingUser,

    /// The command needs `SHOPSYNC_API_BASE_URL`.
    #[error("No backend configured (set SHOPSYNC_API_BASE_URL)")]
    NoBackend,
}

/// A sync layer with the requested user signed in.
pub struct Session {
    pub sync: ShopSync,
    pub lists: Option<WishlistService>,
    pub currency: CurrencyCode,
}

impl Session {
    /// Build the sync layer from configuration and sign `user` in.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be opened, the backend
    /// client cannot be built, or the email is invalid.
    pub async fn open(
        config: &SyncConfig,
        user: Option<String>,
        email: Option<String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let store = Arc::new(FileStore::open(&config.data_dir)?);
        let client = config.api.as_ref().map(ApiClient::new).transpose()?;

        let sync = ShopSync::new(
            client
                .clone()
                .map(|c| Arc::new(c) as Arc<dyn shopsync::CartBackend>),
            store,
        );
        let lists = client.map(|c| WishlistService::new(Arc::new(c), sync.clone()));

        if let Some(uid) = user {
            let email = email.unwrap_or_else(|| format!("{uid}@localhost"));
            let user = User::new(Uid::new(uid), Email::parse(&email)?);
            let report = sync.login(user).await;
            if report.migration_failed {
                tracing::warn!("Local cart could not be migrated; it will be retried next time");
            }
        } else {
            tracing::info!("No --user given, changes are kept in memory only");
        }

        Ok(Self {
            sync,
            lists,
            currency: config.currency,
        })
    }

    fn price(&self, amount: rust_decimal::Decimal) -> String {
        Price::new(amount, self.currency).display()
    }

    /// Backend wishlist service for a signed-in user.
    ///
    /// # Errors
    ///
    /// Returns an error without a user or without a backend.
    pub fn lists(&self) -> Result<&WishlistService, SessionError> {
        if self.sync.user().is_none() {
            return Err(SessionError::MissingUser);
        }
        self.lists.as_ref().ok_or(SessionError::NoBackend)
    }
}

/// Print the cart and session wishlist.
#[allow(clippy::print_stdout)]
pub fn print_state(session: &Session) {
    let state = session.sync.state();

    println!("Cart ({} items)", state.cart_count());
    for line in &state.cart {
        println!(
            "  [{}] {} x{} @ {} = {}",
            line.product.id,
            line.product.name,
            line.quantity,
            session.price(line.product.price),
            session.price(line.line_total()),
        );
    }
    println!("  Total: {}", session.price(state.cart_total()));

    println!("Wishlist ({} items)", state.wishlist.len());
    for product in &state.wishlist {
        let discount = product
            .discount_percent()
            .map(|d| format!(" (-{d}%)"))
            .unwrap_or_default();
        println!(
            "  [{}] {} {}{discount}",
            product.id,
            product.name,
            session.price(product.price)
        );
    }
}
