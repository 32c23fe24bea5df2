//! Cart commands.
//!
//! Backend failures never fail these commands; the change is applied
//! locally and a warning is logged.

use shopsync::MutationOutcome;
use shopsync_core::{Product, ProductId};

use super::Session;

fn log_outcome(operation: &str, outcome: MutationOutcome) {
    match outcome {
        MutationOutcome::FallenBack => {
            tracing::warn!(operation, "Backend unavailable, change kept locally");
        }
        outcome => tracing::debug!(operation, ?outcome, "Cart updated"),
    }
}

/// Add `quantity` units of a product, one at a time.
pub async fn add(session: &Session, product: Product, quantity: u32) {
    for _ in 0..quantity {
        let outcome = session.sync.add_to_cart(product.clone()).await;
        log_outcome("add", outcome);
    }
}

pub async fn remove(session: &Session, id: i64) {
    let outcome = session.sync.remove_from_cart(ProductId::new(id)).await;
    log_outcome("remove", outcome);
}

pub async fn update(session: &Session, id: i64, quantity: i64) {
    let outcome = session
        .sync
        .update_quantity(ProductId::new(id), quantity)
        .await;
    log_outcome("update", outcome);
}

pub async fn clear(session: &Session) {
    let outcome = session.sync.clear_cart().await;
    log_outcome("clear", outcome);
}
