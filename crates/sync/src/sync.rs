//! Reconciliation between local shop state and the cart backend.
//!
//! Every cart mutation goes through [`ShopSync::persist_or_fallback`]:
//!
//! ```text
//! Idle -> Persisting -> Committed    backend snapshot adopted
//!                    -> Superseded   a newer snapshot was already adopted
//!                    -> FallenBack   backend failed, action applied locally
//!                    -> Discarded    user logged out/in while in flight
//! ```
//!
//! Without a signed-in user, or without a backend, mutations are applied
//! locally right away.
//!
//! Shared state sits behind one mutex that is never held across an
//! `.await`, so each transition is atomic.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use shopsync_core::{CartLine, Product, ProductId, Uid, User, merge_lines};

use crate::api::{ApiError, CartBackend, CartSnapshot};
use crate::error::{clear_sentry_user, report_fallback, set_sentry_user};
use crate::events::{CartOrigin, EventBus, ShopEvent};
use crate::storage::{self, LocalStore};
use crate::store::{Action, ShopState, reduce};

/// What happened to a cart mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Applied locally; no backend call was made.
    Local,
    /// The backend accepted it and its snapshot is now the cart.
    Committed,
    /// The backend accepted it but a newer snapshot had already been adopted.
    Superseded,
    /// The backend call failed; the action was applied locally instead.
    FallenBack,
    /// The session changed while the call was in flight; nothing applied.
    Discarded,
}

/// What the login transition did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoginReport {
    /// Lines pushed from the local snapshot into the backend.
    pub migrated_lines: usize,
    /// Whether the local snapshot could not be migrated and was kept.
    pub migration_failed: bool,
    /// Whether the remote cart could not be loaded and local lines were used.
    pub remote_cart_failed: bool,
}

/// Owner of [`ShopState`] and the policy that keeps it in step with the
/// backend.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ShopSync {
    inner: Arc<ShopSyncInner>,
}

struct ShopSyncInner {
    shared: Mutex<Shared>,
    backend: Option<Arc<dyn CartBackend>>,
    store: Arc<dyn LocalStore>,
    events: EventBus,
}

#[derive(Default)]
struct Shared {
    state: ShopState,
    user: Option<User>,
    /// Bumped on every login/logout; completions from an older epoch are
    /// dropped.
    epoch: u64,
    /// Wishlist storage writes are allowed only once the user's data has
    /// been loaded.
    initialized: bool,
    next_seq: u64,
    applied_seq: u64,
    in_flight: usize,
}

impl Shared {
    fn apply(&mut self, action: Action) {
        self.state = reduce(std::mem::take(&mut self.state), action);
    }

    fn settle_loading(&mut self) {
        let loading = self.in_flight > 0;
        if self.state.is_loading != loading {
            self.apply(Action::SetLoading(loading));
        }
    }
}

/// A cart mutation that has been handed to the backend.
struct Ticket {
    seq: u64,
    epoch: u64,
    uid: Uid,
    backend: Arc<dyn CartBackend>,
}

impl std::fmt::Debug for ShopSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopSync")
            .field("has_backend", &self.inner.backend.is_some())
            .finish_non_exhaustive()
    }
}

impl ShopSync {
    /// Create a sync layer.
    ///
    /// `backend` is `None` for local-only mode.
    #[must_use]
    pub fn new(backend: Option<Arc<dyn CartBackend>>, store: Arc<dyn LocalStore>) -> Self {
        Self {
            inner: Arc::new(ShopSyncInner {
                shared: Mutex::new(Shared::default()),
                backend,
                store,
                events: EventBus::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.inner
            .shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> ShopState {
        self.lock().state.clone()
    }

    /// Signed-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.lock().state.is_loading
    }

    #[must_use]
    pub fn cart_total(&self) -> Decimal {
        self.lock().state.cart_total()
    }

    #[must_use]
    pub fn cart_count(&self) -> u32 {
        self.lock().state.cart_count()
    }

    /// Whether a backend is configured.
    #[must_use]
    pub fn has_backend(&self) -> bool {
        self.inner.backend.is_some()
    }

    /// Event channel for state changes.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    // =========================================================================
    // Cart mutations
    // =========================================================================

    /// Add one unit of a product.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_to_cart(&self, product: Product) -> MutationOutcome {
        let remote_product = product.clone();
        self.persist_or_fallback("add_item", Action::AddToCart(product), |backend, uid| {
            async move { backend.add_item(&uid, &remote_product, 1).await }
        })
        .await
    }

    /// Remove a product's line.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(&self, product_id: ProductId) -> MutationOutcome {
        self.persist_or_fallback(
            "remove_item",
            Action::RemoveFromCart(product_id),
            |backend, uid| async move { backend.remove_item(&uid, product_id).await },
        )
        .await
    }

    /// Set a line's quantity; `quantity <= 0` removes the line.
    #[instrument(skip(self))]
    pub async fn update_quantity(&self, product_id: ProductId, quantity: i64) -> MutationOutcome {
        let action = Action::UpdateQuantity(product_id, quantity);
        if quantity <= 0 {
            return self
                .persist_or_fallback("remove_item", action, |backend, uid| async move {
                    backend.remove_item(&uid, product_id).await
                })
                .await;
        }
        self.persist_or_fallback("update_quantity", action, |backend, uid| async move {
            backend.update_quantity(&uid, product_id, quantity).await
        })
        .await
    }

    /// Empty the cart.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> MutationOutcome {
        self.persist_or_fallback("clear_cart", Action::ClearCart, |backend, uid| async move {
            backend.clear_cart(&uid).await.map(|()| CartSnapshot::new())
        })
        .await
    }

    /// Re-read the backend cart and adopt it.
    ///
    /// This is the user-initiated way to reconcile after a fallback. On
    /// failure the local cart is kept as is.
    #[instrument(skip(self))]
    pub async fn refresh_cart(&self) -> MutationOutcome {
        let Some(ticket) = self.begin_remote() else {
            return MutationOutcome::Local;
        };
        let result = ticket.backend.get_cart(&ticket.uid).await;
        match result {
            Ok(snapshot) => self.complete_success(&ticket, snapshot),
            Err(e) => {
                warn!(error = %e, "Failed to refresh cart from backend");
                let mut shared = self.lock();
                if shared.epoch != ticket.epoch {
                    return MutationOutcome::Discarded;
                }
                shared.in_flight = shared.in_flight.saturating_sub(1);
                shared.settle_loading();
                MutationOutcome::FallenBack
            }
        }
    }

    /// Attempt the backend call, falling back to `local` when it fails.
    ///
    /// `remote` receives the backend and the signed-in uid and returns the
    /// resulting cart snapshot.
    async fn persist_or_fallback<F, Fut>(
        &self,
        operation: &'static str,
        local: Action,
        remote: F,
    ) -> MutationOutcome
    where
        F: FnOnce(Arc<dyn CartBackend>, Uid) -> Fut,
        Fut: Future<Output = Result<CartSnapshot, ApiError>>,
    {
        let Some(ticket) = self.begin_remote() else {
            self.apply_locally(local, CartOrigin::Local);
            return MutationOutcome::Local;
        };

        debug!(operation, seq = ticket.seq, "Persisting cart mutation");
        let result = remote(Arc::clone(&ticket.backend), ticket.uid.clone()).await;

        match result {
            Ok(snapshot) => self.complete_success(&ticket, snapshot),
            Err(e) => {
                let outcome = {
                    let mut shared = self.lock();
                    if shared.epoch == ticket.epoch {
                        shared.in_flight = shared.in_flight.saturating_sub(1);
                        shared.apply(local);
                        shared.settle_loading();
                        MutationOutcome::FallenBack
                    } else {
                        MutationOutcome::Discarded
                    }
                };
                if outcome == MutationOutcome::FallenBack {
                    report_fallback(operation, &e);
                    self.publish_cart(CartOrigin::Fallback);
                } else {
                    debug!(operation, error = %e, "Dropping failure from a previous session");
                }
                outcome
            }
        }
    }

    /// Register an in-flight backend call, or `None` when the mutation must
    /// be applied locally.
    fn begin_remote(&self) -> Option<Ticket> {
        let backend = self.inner.backend.as_ref()?;
        let mut shared = self.lock();
        let uid = shared.user.as_ref()?.uid.clone();
        shared.next_seq += 1;
        shared.in_flight += 1;
        shared.settle_loading();
        Some(Ticket {
            seq: shared.next_seq,
            epoch: shared.epoch,
            uid,
            backend: Arc::clone(backend),
        })
    }

    fn complete_success(&self, ticket: &Ticket, snapshot: CartSnapshot) -> MutationOutcome {
        let outcome = {
            let mut shared = self.lock();
            if shared.epoch != ticket.epoch {
                MutationOutcome::Discarded
            } else {
                shared.in_flight = shared.in_flight.saturating_sub(1);
                let outcome = if ticket.seq > shared.applied_seq {
                    shared.applied_seq = ticket.seq;
                    shared.apply(Action::LoadCartFromRemote(snapshot));
                    MutationOutcome::Committed
                } else {
                    MutationOutcome::Superseded
                };
                shared.settle_loading();
                outcome
            }
        };

        match outcome {
            MutationOutcome::Committed => self.publish_cart(CartOrigin::Remote),
            MutationOutcome::Superseded => {
                debug!(seq = ticket.seq, "Ignoring snapshot older than the current cart");
            }
            _ => debug!(seq = ticket.seq, "Dropping snapshot from a previous session"),
        }
        outcome
    }

    fn apply_locally(&self, action: Action, origin: CartOrigin) {
        let snapshot = {
            let mut shared = self.lock();
            shared.apply(action);
            // Local-only mode keeps a per-user snapshot for later migration.
            match (&self.inner.backend, &shared.user) {
                (None, Some(user)) => Some((user.uid.clone(), shared.state.cart.clone())),
                _ => None,
            }
        };

        if let Some((uid, cart)) = snapshot {
            self.save_cart_snapshot(&uid, &cart);
        }
        self.publish_cart(origin);
    }

    fn publish_cart(&self, origin: CartOrigin) {
        let item_count = self.cart_count();
        self.inner
            .events
            .publish(ShopEvent::CartChanged { origin, item_count });
    }

    fn save_cart_snapshot(&self, uid: &Uid, cart: &[CartLine]) {
        let key = storage::cart_key(uid);
        let result = if cart.is_empty() {
            self.inner.store.remove(&key)
        } else {
            storage::save_json(self.inner.store.as_ref(), &key, cart)
        };
        if let Err(e) = result {
            warn!(error = %e, %key, "Failed to save cart snapshot");
        }
    }

    // =========================================================================
    // Wishlist mutations
    // =========================================================================

    /// Save a product to the session wishlist. Saving twice is a no-op.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add_to_wishlist(&self, product: Product) {
        self.mutate_wishlist(Action::AddToWishlist(product));
    }

    /// Remove a product from the session wishlist.
    #[instrument(skip(self))]
    pub fn remove_from_wishlist(&self, product_id: ProductId) {
        self.mutate_wishlist(Action::RemoveFromWishlist(product_id));
    }

    fn mutate_wishlist(&self, action: Action) {
        let (changed, persist, item_count) = {
            let mut shared = self.lock();
            let before = shared.state.wishlist.len();
            shared.apply(action);
            let item_count = shared.state.wishlist.len();
            let persist = shared
                .user
                .as_ref()
                .filter(|_| shared.initialized)
                .map(|u| (u.uid.clone(), shared.state.wishlist.clone()));
            (before != item_count, persist, item_count)
        };

        if !changed {
            return;
        }
        if let Some((uid, wishlist)) = persist {
            self.save_wishlist(&uid, &wishlist);
        }
        self.inner
            .events
            .publish(ShopEvent::WishlistChanged { item_count });
    }

    fn save_wishlist(&self, uid: &Uid, wishlist: &[Product]) {
        let key = storage::wishlist_key(uid);
        if let Err(e) = storage::save_json(self.inner.store.as_ref(), &key, wishlist) {
            warn!(error = %e, %key, "Failed to save wishlist");
        }
    }

    // =========================================================================
    // Session transitions
    // =========================================================================

    /// Take the next sequence number without registering a mutation.
    fn reserve_seq(&self) -> u64 {
        let mut shared = self.lock();
        shared.next_seq += 1;
        shared.next_seq
    }

    /// Handle a user becoming available.
    ///
    /// Migrates the local cart snapshot (plus anything added anonymously in
    /// this session) into the backend, loads the backend cart, and loads the
    /// stored wishlist. Logging in as the already loaded user is a no-op.
    #[instrument(skip(self, user), fields(user_id = %user.uid))]
    pub async fn login(&self, user: User) -> LoginReport {
        let (epoch, anonymous) = {
            let mut shared = self.lock();
            if shared.initialized && shared.user.as_ref().is_some_and(|u| u.uid == user.uid) {
                return LoginReport::default();
            }
            shared.epoch += 1;
            shared.applied_seq = shared.next_seq;
            // The login load itself counts as in flight.
            shared.in_flight = 1;
            shared.initialized = false;
            shared.user = Some(user.clone());
            let anonymous = std::mem::take(&mut shared.state);
            shared.apply(Action::SetLoading(true));
            (shared.epoch, anonymous)
        };
        set_sentry_user(&user.uid, Some(user.email.as_str()));

        let uid = &user.uid;
        let store = self.inner.store.as_ref();
        let stored_cart = storage::load_cart(store, uid).unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring unreadable cart snapshot");
            Vec::new()
        });
        let pending = merge_lines(&stored_cart, &anonymous.cart);

        let mut report = LoginReport::default();
        let (cart, load_seq) = match &self.inner.backend {
            Some(backend) => {
                if !pending.is_empty() {
                    match backend.sync_local_cart_to_remote(uid, &pending).await {
                        Ok(()) => {
                            report.migrated_lines = pending.len();
                            if let Err(e) = store.remove(&storage::cart_key(uid)) {
                                warn!(error = %e, "Failed to delete migrated cart snapshot");
                            }
                            info!(lines = pending.len(), "Migrated local cart to backend");
                        }
                        Err(e) => {
                            warn!(error = %e, "Cart migration failed, keeping local snapshot");
                            report.migration_failed = true;
                            self.save_cart_snapshot(uid, &pending);
                        }
                    }
                }
                // Mutations issued from here on are newer than this load.
                let load_seq = self.reserve_seq();
                let cart = match backend.get_cart(uid).await {
                    Ok(remote) if report.migration_failed => merge_lines(&remote, &pending),
                    Ok(remote) => remote,
                    Err(e) => {
                        warn!(error = %e, "Failed to load remote cart, using local lines");
                        report.remote_cart_failed = true;
                        pending
                    }
                };
                (cart, load_seq)
            }
            None => {
                self.save_cart_snapshot(uid, &pending);
                (pending, self.reserve_seq())
            }
        };

        let stored_wishlist = storage::load_wishlist(store, uid).unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring unreadable wishlist");
            Vec::new()
        });
        let wishlist = union_by_id(stored_wishlist, anonymous.wishlist);

        let loaded = {
            let mut shared = self.lock();
            if shared.epoch == epoch {
                shared.in_flight = shared.in_flight.saturating_sub(1);
                // A mutation issued after the load began already committed a
                // newer cart.
                let cart = if shared.applied_seq > load_seq {
                    debug!(load_seq, "Keeping cart committed during login");
                    std::mem::take(&mut shared.state.cart)
                } else {
                    shared.applied_seq = load_seq;
                    cart
                };
                let added_meanwhile = std::mem::take(&mut shared.state.wishlist);
                shared.apply(Action::LoadUserData(ShopState {
                    cart,
                    wishlist: union_by_id(wishlist, added_meanwhile),
                    is_loading: false,
                }));
                shared.settle_loading();
                shared.initialized = true;
                Some((shared.state.wishlist.clone(), shared.state.wishlist.len()))
            } else {
                None
            }
        };

        let Some((wishlist, wishlist_count)) = loaded else {
            debug!("Session changed during login, discarding loaded data");
            return report;
        };

        self.save_wishlist(uid, &wishlist);
        self.inner.events.publish(ShopEvent::LoggedIn { uid: uid.clone() });
        self.publish_cart(CartOrigin::Remote);
        self.inner.events.publish(ShopEvent::WishlistChanged {
            item_count: wishlist_count,
        });
        report
    }

    /// Handle the user signing out.
    ///
    /// State is reset immediately. In-flight backend calls are not awaited;
    /// their completions are dropped.
    #[instrument(skip(self))]
    pub fn logout(&self) {
        {
            let mut shared = self.lock();
            let epoch = shared.epoch + 1;
            let next_seq = shared.next_seq;
            *shared = Shared {
                epoch,
                next_seq,
                applied_seq: next_seq,
                ..Shared::default()
            };
        }
        clear_sentry_user();
        self.inner.events.publish(ShopEvent::LoggedOut);
        info!("Logged out, shop state reset");
    }
}

/// `base` followed by the products of `extra` it does not already contain.
fn union_by_id(base: Vec<Product>, extra: Vec<Product>) -> Vec<Product> {
    extra.into_iter().fold(base, |mut acc, p| {
        if !acc.iter().any(|existing| existing.id == p.id) {
            acc.push(p);
        }
        acc
    })
}
