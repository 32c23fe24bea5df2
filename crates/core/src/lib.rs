//! Shopsync Core - Shared domain types.
//!
//! This crate provides the types shared by every shopsync component:
//! - `shopsync` - Cart/wishlist synchronization layer
//! - `shopsync-cli` - Command-line driver
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no HTTP
//! clients, no storage. This keeps it lightweight and allows it to be used
//! anywhere, including by mock backends in tests.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, emails, products, cart lines and wishlists

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
