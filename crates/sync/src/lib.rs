//! Shopsync - Cart and wishlist synchronization layer.
//!
//! Keeps a shopper's cart and wishlist consistent between in-memory state,
//! per-user local storage and a remote backend. Cart mutations try the
//! backend first and degrade to a local update when it fails, so the cart
//! never blocks on the network.
//!
//! # Modules
//!
//! - [`store`] - Pure reducer over [`ShopState`]
//! - [`api`] - Backend traits and the `reqwest` client
//! - [`sync`] - [`ShopSync`], the reconciliation layer
//! - [`wishlists`] - Backend-owned named wishlists
//! - [`storage`] - Per-user local persistence
//! - [`events`] - Change notifications
//! - [`config`], [`error`], [`telemetry`] - Ambient setup

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod storage;
pub mod store;
pub mod sync;
pub mod telemetry;
pub mod wishlists;

pub use api::{ApiClient, ApiError, CartBackend, CartSnapshot, WishlistBackend};
pub use config::{ApiConfig, ConfigError, SyncConfig};
pub use error::{Result, SyncError};
pub use events::{CartOrigin, EventBus, ShopEvent};
pub use storage::{FileStore, LocalStore, MemoryStore, StorageError};
pub use store::{Action, ShopState, reduce};
pub use sync::{LoginReport, MutationOutcome, ShopSync};
pub use wishlists::WishlistService;
