//! Integration tests for cart synchronization.
//!
//! Each test starts its own in-process mock backend and uses a fresh
//! temporary data directory.

use std::sync::Arc;

use rust_decimal::Decimal;

use shopsync::storage::cart_key;
use shopsync::{
    ApiClient, ApiConfig, ApiError, CartBackend, CartOrigin, FileStore, LocalStore,
    MutationOutcome, ShopEvent, ShopSync,
};
use shopsync_core::{Email, Product, ProductId, Uid, User};
use shopsync_integration_tests::{MAX_LINE_QUANTITY, MockBackend, catalog_product};

fn client(backend: &MockBackend) -> ApiClient {
    ApiClient::new(&ApiConfig {
        base_url: backend.base_url(),
        token: None,
    })
    .expect("Failed to build API client")
}

fn store(dir: &tempfile::TempDir) -> Arc<FileStore> {
    Arc::new(FileStore::open(dir.path()).expect("Failed to open data dir"))
}

fn remote_sync(backend: &MockBackend, dir: &tempfile::TempDir) -> ShopSync {
    let cart: Arc<dyn CartBackend> = Arc::new(client(backend));
    ShopSync::new(Some(cart), store(dir))
}

fn user(uid: &str) -> User {
    User::new(
        Uid::new(uid),
        Email::parse(&format!("{uid}@shop.test")).expect("valid email"),
    )
}

fn tea(id: i64) -> Product {
    Product::new(ProductId::new(id), format!("Tea {id}"), Decimal::new(999, 2))
}

// ============================================================================
// Remote persistence
// ============================================================================

#[tokio::test]
async fn test_add_to_cart_persists_remotely() {
    let backend = MockBackend::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let sync = remote_sync(&backend, &dir);
    sync.login(user("u1")).await;

    assert_eq!(sync.add_to_cart(tea(5)).await, MutationOutcome::Committed);
    assert_eq!(sync.add_to_cart(tea(5)).await, MutationOutcome::Committed);

    assert_eq!(backend.cart("u1"), vec![(5, 2)]);
    assert_eq!(sync.state().quantity_of(ProductId::new(5)), Some(2));
    assert_eq!(sync.cart_total(), Decimal::new(1998, 2));
    assert!(!sync.is_loading());
}

#[tokio::test]
async fn test_missing_remote_cart_is_empty() {
    let backend = MockBackend::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let sync = remote_sync(&backend, &dir);

    let report = sync.login(user("nobody")).await;

    assert!(!report.remote_cart_failed);
    assert!(sync.state().cart.is_empty());
    assert_eq!(backend.count("GET /api/cart"), 1);
}

#[tokio::test]
async fn test_server_snapshot_is_normalized() {
    let backend = MockBackend::start().await;
    backend.seed_cart("u1", catalog_product(3), 4);
    let dir = tempfile::tempdir().expect("tempdir");
    let sync = remote_sync(&backend, &dir);

    sync.login(user("u1")).await;

    let state = sync.state();
    let line = state.cart.first().expect("one cart line");
    assert_eq!(line.quantity, 4);
    assert_eq!(line.product.name, "Catalog product 3");
    assert_eq!(line.product.price, Decimal::new(1250, 2));
    assert_eq!(line.product.image.as_deref(), Some("https://cdn.shop.test/3.jpg"));
    assert_eq!(line.product.discount_percent(), Some(50));
}

#[tokio::test]
async fn test_update_to_zero_removes_line() {
    let backend = MockBackend::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let sync = remote_sync(&backend, &dir);
    sync.login(user("u1")).await;
    sync.add_to_cart(tea(5)).await;

    assert_eq!(
        sync.update_quantity(ProductId::new(5), 3).await,
        MutationOutcome::Committed
    );
    assert_eq!(backend.cart("u1"), vec![(5, 3)]);

    assert_eq!(
        sync.update_quantity(ProductId::new(5), 0).await,
        MutationOutcome::Committed
    );
    assert_eq!(backend.count("PUT /api/cart/items/5"), 1);
    assert_eq!(backend.count("DELETE /api/cart/items/5"), 1);
    assert!(backend.cart("u1").is_empty());
    assert!(sync.state().cart.is_empty());
}

#[tokio::test]
async fn test_clear_cart() {
    let backend = MockBackend::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let sync = remote_sync(&backend, &dir);
    sync.login(user("u1")).await;
    sync.add_to_cart(tea(1)).await;
    sync.add_to_cart(tea(2)).await;

    assert_eq!(sync.clear_cart().await, MutationOutcome::Committed);

    assert!(backend.cart("u1").is_empty());
    assert_eq!(sync.cart_count(), 0);
}

#[tokio::test]
async fn test_cart_events_report_origin() {
    let backend = MockBackend::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let sync = remote_sync(&backend, &dir);
    sync.login(user("u1")).await;
    let mut events = sync.events().subscribe();

    sync.add_to_cart(tea(1)).await;
    backend.set_failing(true);
    sync.add_to_cart(tea(2)).await;

    assert_eq!(
        events.recv().await.expect("event"),
        ShopEvent::CartChanged {
            origin: CartOrigin::Remote,
            item_count: 1
        }
    );
    assert_eq!(
        events.recv().await.expect("event"),
        ShopEvent::CartChanged {
            origin: CartOrigin::Fallback,
            item_count: 2
        }
    );
}

// ============================================================================
// Adapter validation
// ============================================================================

#[tokio::test]
async fn test_non_positive_quantities_rejected_before_request() {
    let backend = MockBackend::start().await;
    let api = client(&backend);
    let uid = Uid::new("u1");

    for quantity in [0, -3] {
        let result = api.update_quantity(&uid, ProductId::new(5), quantity).await;
        assert!(matches!(result, Err(ApiError::Validation(_))), "{result:?}");
    }
    let result = api.add_item(&uid, &tea(5), 0).await;
    assert!(matches!(result, Err(ApiError::Validation(_))), "{result:?}");

    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_backend_rejection_maps_to_validation() {
    let backend = MockBackend::start().await;
    let api = client(&backend);
    let uid = Uid::new("u1");
    api.add_item(&uid, &tea(5), 1).await.expect("add item");

    let result = api
        .update_quantity(&uid, ProductId::new(5), MAX_LINE_QUANTITY + 1)
        .await;

    assert!(matches!(result, Err(ApiError::Validation(_))), "{result:?}");
    assert_eq!(backend.count("PUT /api/cart/items/5"), 1);
    assert_eq!(backend.cart("u1"), vec![(5, 1)]);
}

// ============================================================================
// Fallback
// ============================================================================

#[tokio::test]
async fn test_backend_down_falls_back_locally() {
    let backend = MockBackend::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let sync = remote_sync(&backend, &dir);
    sync.login(user("u1")).await;
    backend.set_failing(true);

    assert_eq!(sync.add_to_cart(tea(9)).await, MutationOutcome::FallenBack);

    let state = sync.state();
    assert_eq!(state.quantity_of(ProductId::new(9)), Some(1));
    assert!(!state.is_loading);
    assert!(backend.cart("u1").is_empty());
}

#[tokio::test]
async fn test_refresh_after_fallback_adopts_server_cart() {
    let backend = MockBackend::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let sync = remote_sync(&backend, &dir);
    sync.login(user("u1")).await;
    sync.add_to_cart(tea(1)).await;

    backend.set_failing(true);
    sync.add_to_cart(tea(2)).await;
    assert_eq!(sync.refresh_cart().await, MutationOutcome::FallenBack);
    assert_eq!(sync.cart_count(), 2);

    backend.set_failing(false);
    assert_eq!(sync.refresh_cart().await, MutationOutcome::Committed);

    assert_eq!(sync.cart_count(), 1);
    assert_eq!(sync.state().quantity_of(ProductId::new(2)), None);
}

#[tokio::test]
async fn test_unreachable_backend_does_not_block_login() {
    let backend = MockBackend::start().await;
    backend.set_failing(true);
    let dir = tempfile::tempdir().expect("tempdir");
    let sync = remote_sync(&backend, &dir);
    sync.add_to_cart(tea(4)).await;

    let report = sync.login(user("u1")).await;

    assert!(report.migration_failed);
    assert!(report.remote_cart_failed);
    assert_eq!(sync.state().quantity_of(ProductId::new(4)), Some(1));
    assert!(!sync.is_loading());

    // The unsent lines stay on disk for the next login.
    let stored = store(&dir)
        .get(&cart_key(&Uid::new("u1")))
        .expect("readable store");
    assert!(stored.is_some());
}

// ============================================================================
// Login migration
// ============================================================================

#[tokio::test]
async fn test_local_only_cart_migrates_on_next_login() {
    let backend = MockBackend::start().await;
    let dir = tempfile::tempdir().expect("tempdir");

    let offline = ShopSync::new(None, store(&dir));
    offline.login(user("u1")).await;
    offline.add_to_cart(tea(1)).await;
    offline.add_to_cart(tea(1)).await;
    offline.add_to_cart(tea(2)).await;
    offline.logout();

    let online = remote_sync(&backend, &dir);
    let report = online.login(user("u1")).await;

    assert_eq!(report.migrated_lines, 2);
    assert_eq!(backend.count("POST /api/cart/items"), 2);
    assert_eq!(backend.cart("u1"), vec![(1, 2), (2, 1)]);
    assert_eq!(online.cart_count(), 3);

    let stored = store(&dir)
        .get(&cart_key(&Uid::new("u1")))
        .expect("readable store");
    assert_eq!(stored, None);
}

#[tokio::test]
async fn test_anonymous_cart_joins_remote_cart_on_login() {
    let backend = MockBackend::start().await;
    backend.seed_cart("u1", catalog_product(3), 1);
    let dir = tempfile::tempdir().expect("tempdir");
    let sync = remote_sync(&backend, &dir);

    assert_eq!(sync.add_to_cart(tea(5)).await, MutationOutcome::Local);
    assert!(backend.requests().is_empty());

    sync.login(user("u1")).await;

    assert_eq!(backend.cart("u1"), vec![(3, 1), (5, 1)]);
    assert_eq!(sync.cart_count(), 2);
}

#[tokio::test]
async fn test_logout_resets_and_next_user_starts_clean() {
    let backend = MockBackend::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let sync = remote_sync(&backend, &dir);
    sync.login(user("u1")).await;
    sync.add_to_cart(tea(1)).await;
    sync.add_to_wishlist(tea(7));

    sync.logout();
    assert_eq!(sync.cart_count(), 0);
    assert!(sync.state().wishlist.is_empty());

    sync.login(user("u2")).await;
    assert_eq!(sync.cart_count(), 0);
    assert!(sync.state().wishlist.is_empty());

    sync.logout();
    sync.login(user("u1")).await;
    assert_eq!(sync.cart_count(), 1);
    assert!(sync.state().is_in_wishlist(ProductId::new(7)));
}
