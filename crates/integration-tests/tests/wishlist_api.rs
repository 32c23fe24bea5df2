//! Integration tests for named wishlists.

use std::sync::Arc;

use shopsync::{
    ApiClient, ApiConfig, ApiError, MemoryStore, ShopEvent, ShopSync, SyncError, WishlistBackend,
    WishlistService,
};
use shopsync_core::{Email, ProductId, ShareStatus, Uid, User, WishlistId};
use shopsync_integration_tests::MockBackend;

async fn signed_in_service(backend: &MockBackend, uid: &str) -> WishlistService {
    let client = ApiClient::new(&ApiConfig {
        base_url: backend.base_url(),
        token: None,
    })
    .expect("Failed to build API client");

    let sync = ShopSync::new(None, Arc::new(MemoryStore::new()));
    sync.login(User::new(
        Uid::new(uid),
        Email::parse(&format!("{uid}@shop.test")).expect("valid email"),
    ))
    .await;

    let lists: Arc<dyn WishlistBackend> = Arc::new(client);
    WishlistService::new(lists, sync)
}

// ============================================================================
// CRUD
// ============================================================================

#[tokio::test]
async fn test_wishlist_lifecycle() {
    let backend = MockBackend::start().await;
    let service = signed_in_service(&backend, "u1").await;

    assert!(service.list().await.expect("list").is_empty());

    let created = service.create("Birthday").await.expect("create");
    assert_eq!(created.name.as_str(), "Birthday");
    assert_eq!(created.share_status, ShareStatus::Private);

    let updated = service
        .add_product(&created.id, ProductId::new(3))
        .await
        .expect("add product");
    assert!(updated.contains(ProductId::new(3)));
    let entry = updated.entries.first().expect("one entry");
    assert_eq!(entry.product.name, "Catalog product 3");

    let updated = service
        .add_product(&created.id, ProductId::new(3))
        .await
        .expect("add product again");
    assert_eq!(updated.item_count(), 1);

    let updated = service
        .remove_product(&created.id, ProductId::new(3))
        .await
        .expect("remove product");
    assert_eq!(updated.item_count(), 0);

    service.delete(&created.id).await.expect("delete");
    assert!(service.list().await.expect("list").is_empty());
}

#[tokio::test]
async fn test_wishlists_are_per_user() {
    let backend = MockBackend::start().await;
    let alice = signed_in_service(&backend, "alice").await;
    let bob = signed_in_service(&backend, "bob").await;

    let list = alice.create("Alice's list").await.expect("create");

    assert_eq!(alice.list().await.expect("list").len(), 1);
    assert!(bob.list().await.expect("list").is_empty());

    let err = bob.delete(&list.id).await.expect_err("not bob's list");
    assert!(matches!(err, SyncError::Api(ApiError::NotFound(_))));
}

#[tokio::test]
async fn test_invalid_name_never_reaches_backend() {
    let backend = MockBackend::start().await;
    let service = signed_in_service(&backend, "u1").await;

    let err = service.create("").await.expect_err("empty name");
    assert!(matches!(err, SyncError::Validation(_)));
    assert_eq!(backend.count("POST /api/wishlist"), 0);
}

// ============================================================================
// Errors and events
// ============================================================================

#[tokio::test]
async fn test_backend_failure_is_surfaced() {
    let backend = MockBackend::start().await;
    let service = signed_in_service(&backend, "u1").await;
    backend.set_failing(true);

    let err = service.create("Gifts").await.expect_err("backend down");
    assert!(matches!(
        err,
        SyncError::Api(ApiError::HttpStatus { status: 503, .. })
    ));
}

#[tokio::test]
async fn test_unknown_wishlist_is_not_found() {
    let backend = MockBackend::start().await;
    let service = signed_in_service(&backend, "u1").await;

    let err = service
        .add_product(&WishlistId::new("missing"), ProductId::new(1))
        .await
        .expect_err("no such wishlist");
    assert!(matches!(err, SyncError::Api(ApiError::NotFound(_))));
}

#[tokio::test]
async fn test_changes_are_published() {
    let backend = MockBackend::start().await;
    let client = ApiClient::new(&ApiConfig {
        base_url: backend.base_url(),
        token: None,
    })
    .expect("Failed to build API client");
    let sync = ShopSync::new(None, Arc::new(MemoryStore::new()));
    sync.login(User::new(
        Uid::new("u1"),
        Email::parse("u1@shop.test").expect("valid email"),
    ))
    .await;
    let mut events = sync.events().subscribe();
    let service = WishlistService::new(Arc::new(client), sync);

    let created = service.create("Gifts").await.expect("create");

    assert_eq!(
        events.recv().await.expect("event"),
        ShopEvent::WishlistsChanged {
            wishlist_id: created.id
        }
    );
}
