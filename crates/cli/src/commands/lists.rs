//! Named wishlist commands.
//!
//! These talk to the backend directly and fail when it does.

use shopsync_core::{ProductId, WishlistId};

use super::Session;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Print every named wishlist of the signed-in user.
#[allow(clippy::print_stdout)]
pub async fn show(session: &Session) -> CommandResult {
    let wishlists = session.lists()?.list().await?;

    if wishlists.is_empty() {
        println!("No wishlists");
    }
    for wishlist in &wishlists {
        println!(
            "{} [{}] {} ({} items)",
            wishlist.name,
            wishlist.id,
            wishlist.share_status,
            wishlist.item_count()
        );
        for entry in &wishlist.entries {
            println!(
                "  [{}] {} added {}",
                entry.product.id,
                entry.product.name,
                entry.added_at.format("%Y-%m-%d")
            );
        }
    }
    Ok(())
}

pub async fn create(session: &Session, name: &str) -> CommandResult {
    let wishlist = session.lists()?.create(name).await?;
    tracing::info!(wishlist_id = %wishlist.id, "Wishlist created");
    Ok(())
}

pub async fn add(session: &Session, wishlist: &str, product: i64) -> CommandResult {
    session
        .lists()?
        .add_product(&WishlistId::new(wishlist), ProductId::new(product))
        .await?;
    Ok(())
}

pub async fn remove(session: &Session, wishlist: &str, product: i64) -> CommandResult {
    session
        .lists()?
        .remove_product(&WishlistId::new(wishlist), ProductId::new(product))
        .await?;
    Ok(())
}

pub async fn delete(session: &Session, wishlist: &str) -> CommandResult {
    session.lists()?.delete(&WishlistId::new(wishlist)).await?;
    Ok(())
}
