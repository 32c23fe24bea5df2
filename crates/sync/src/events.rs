//! Typed change notifications.
//!
//! Readers subscribe with [`EventBus::subscribe`] and re-read state when an
//! event arrives. Events carry enough to update a badge without a re-read.

use tokio::sync::broadcast;

use shopsync_core::{Uid, WishlistId};

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 64;

/// How a cart change came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartOrigin {
    /// Applied locally with no backend involved.
    Local,
    /// Adopted from a backend snapshot.
    Remote,
    /// Applied locally after the backend call failed.
    Fallback,
}

/// Something in the shop state changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShopEvent {
    /// The cart slice changed.
    CartChanged { origin: CartOrigin, item_count: u32 },
    /// The session wishlist changed.
    WishlistChanged { item_count: usize },
    /// A backend wishlist was created, changed or deleted.
    WishlistsChanged { wishlist_id: WishlistId },
    /// A user signed in and their data finished loading.
    LoggedIn { uid: Uid },
    /// The signed-in user signed out.
    LoggedOut,
}

/// Publish/subscribe channel for [`ShopEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ShopEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Receive every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ShopEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: ShopEvent) {
        tracing::trace!(?event, "Publishing shop event");
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(ShopEvent::WishlistChanged { item_count: 1 });
        bus.publish(ShopEvent::LoggedOut);

        assert_eq!(rx.recv().await.unwrap(), ShopEvent::WishlistChanged { item_count: 1 });
        assert_eq!(rx.recv().await.unwrap(), ShopEvent::LoggedOut);
    }

    #[test]
    fn test_publish_without_subscribers() {
        EventBus::new().publish(ShopEvent::LoggedOut);
    }
}
