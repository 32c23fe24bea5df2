//! Core types for shopsync.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod email;
pub mod id;
pub mod price;
pub mod product;
pub mod status;
pub mod user;
pub mod wishlist;

pub use cart::{CartLine, merge_lines};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use product::Product;
pub use status::ShareStatus;
pub use user::{Uid, User};
pub use wishlist::{Wishlist, WishlistEntry, WishlistName, WishlistNameError};
