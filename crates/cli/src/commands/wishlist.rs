//! Session wishlist commands.

use shopsync_core::{Product, ProductId};

use super::Session;

pub fn add(session: &Session, product: Product) {
    session.sync.add_to_wishlist(product);
}

pub fn remove(session: &Session, id: i64) {
    session.sync.remove_from_wishlist(ProductId::new(id));
}
