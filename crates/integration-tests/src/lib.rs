//! Integration tests for shopsync.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopsync-integration-tests
//! ```
//!
//! The tests need no external services: [`MockBackend::start`] serves the
//! cart and wishlist REST endpoints from an in-process `axum` server bound to
//! an ephemeral port, and keeps everything in memory.
//!
//! # Test Categories
//!
//! - `cart_sync` - `ShopSync` with the real `ApiClient` and a `FileStore`
//! - `wishlist_api` - Named wishlists through `WishlistService`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::Router;
use axum::extract::{Json, Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use url::Url;

/// A cart line as stored by the mock: the product JSON the client sent and a
/// quantity.
#[derive(Debug, Clone)]
struct StoredLine {
    product: Value,
    quantity: i64,
}

#[derive(Debug, Clone)]
struct StoredWishlist {
    id: String,
    user_id: String,
    name: String,
    items: Vec<Value>,
}

impl StoredWishlist {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "user_id": self.user_id,
            "name": self.name,
            "items": self.items,
            "share_status": "private",
        })
    }
}

#[derive(Default)]
struct Data {
    carts: HashMap<String, Vec<StoredLine>>,
    wishlists: Vec<StoredWishlist>,
    requests: Vec<String>,
}

#[derive(Clone, Default)]
struct MockState {
    data: Arc<Mutex<Data>>,
    failing: Arc<AtomicBool>,
}

impl MockState {
    fn data(&self) -> MutexGuard<'_, Data> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-process cart/wishlist backend.
///
/// Carts are created on first write; reading a cart that was never written
/// answers 404 like the real backend.
#[derive(Clone)]
pub struct MockBackend {
    base_url: Url,
    state: MockState,
}

impl MockBackend {
    /// Bind to `127.0.0.1:0` and start serving in the background.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = router(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().expect("Mock backend has no address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let base_url =
            Url::parse(&format!("http://{addr}/api")).expect("Mock backend URL is valid");
        Self { base_url, state }
    }

    /// Base URL to configure the client with.
    #[must_use]
    pub fn base_url(&self) -> Url {
        self.base_url.clone()
    }

    /// Answer every request with 503 while `failing` is set.
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    /// `(product_id, quantity)` pairs of a user's cart in line order.
    #[must_use]
    pub fn cart(&self, user_id: &str) -> Vec<(i64, i64)> {
        self.state
            .data()
            .carts
            .get(user_id)
            .map(|lines| {
                lines
                    .iter()
                    .map(|l| (product_id(&l.product), l.quantity))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Put a line in a user's cart directly.
    pub fn seed_cart(&self, user_id: &str, product: Value, quantity: i64) {
        self.state
            .data()
            .carts
            .entry(user_id.to_string())
            .or_default()
            .push(StoredLine { product, quantity });
    }

    /// `"METHOD /path"` of every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.state.data().requests.clone()
    }

    /// Number of received requests matching `"METHOD /path"` exactly.
    #[must_use]
    pub fn count(&self, request: &str) -> usize {
        self.state
            .data()
            .requests
            .iter()
            .filter(|r| *r == request)
            .count()
    }
}

/// Product JSON in the backend's own shape (`title`, `imageUrl`, string price).
#[must_use]
pub fn catalog_product(id: i64) -> Value {
    json!({
        "id": id,
        "title": format!("Catalog product {id}"),
        "price": "12.50",
        "originalPrice": "25.00",
        "imageUrl": format!("https://cdn.shop.test/{id}.jpg"),
        "category": "tea",
    })
}

fn product_id(product: &Value) -> i64 {
    product.get("id").and_then(Value::as_i64).unwrap_or_default()
}

fn entry_product_id(entry: &Value) -> i64 {
    entry.get("product").map_or(0, product_id)
}

fn router(state: MockState) -> Router {
    let api = Router::new()
        .route("/cart", get(get_cart).delete(clear_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/{product_id}", put(update_item).delete(remove_item))
        .route("/wishlist", get(list_wishlists).post(create_wishlist))
        .route("/wishlist/{id}", delete(delete_wishlist))
        .route("/wishlist/{id}/products", post(add_wishlist_product))
        .route(
            "/wishlist/{id}/products/{product_id}",
            delete(remove_wishlist_product),
        );

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(state.clone(), record_and_fail))
        .with_state(state)
}

async fn record_and_fail(State(state): State<MockState>, request: Request, next: Next) -> Response {
    let line = format!("{} {}", request.method(), request.uri().path());
    state.data().requests.push(line);

    if state.failing.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, "backend unavailable").into_response();
    }
    next.run(request).await
}

// =============================================================================
// Cart
// =============================================================================

/// Largest quantity a single line may hold; more is rejected with 422.
pub const MAX_LINE_QUANTITY: i64 = 99;

#[derive(Deserialize)]
struct UserQuery {
    user_id: String,
}

#[derive(Deserialize)]
struct AddItemBody {
    user_id: String,
    product_id: i64,
    quantity: i64,
    product: Value,
}

#[derive(Deserialize)]
struct UpdateItemBody {
    user_id: String,
    quantity: i64,
}

fn cart_json(lines: &[StoredLine]) -> Json<Value> {
    let items: Vec<Value> = lines
        .iter()
        .map(|l| json!({ "product_details": l.product, "quantity": l.quantity }))
        .collect();
    Json(json!({ "items": items }))
}

async fn get_cart(
    State(state): State<MockState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, StatusCode> {
    let data = state.data();
    let lines = data.carts.get(&query.user_id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(cart_json(lines))
}

async fn add_item(
    State(state): State<MockState>,
    Json(body): Json<AddItemBody>,
) -> Result<Json<Value>, StatusCode> {
    if !(1..=MAX_LINE_QUANTITY).contains(&body.quantity)
        || product_id(&body.product) != body.product_id
    {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }
    let mut data = state.data();
    let lines = data.carts.entry(body.user_id).or_default();
    match lines.iter_mut().find(|l| product_id(&l.product) == body.product_id) {
        Some(line) => line.quantity += body.quantity,
        None => lines.push(StoredLine {
            product: body.product,
            quantity: body.quantity,
        }),
    }
    Ok(cart_json(lines))
}

async fn update_item(
    State(state): State<MockState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateItemBody>,
) -> Result<Json<Value>, StatusCode> {
    if !(1..=MAX_LINE_QUANTITY).contains(&body.quantity) {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }
    let mut data = state.data();
    let lines = data.carts.get_mut(&body.user_id).ok_or(StatusCode::NOT_FOUND)?;
    let line = lines
        .iter_mut()
        .find(|l| product_id(&l.product) == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    line.quantity = body.quantity;
    Ok(cart_json(lines))
}

async fn remove_item(
    State(state): State<MockState>,
    Path(id): Path<i64>,
    Query(query): Query<UserQuery>,
) -> Json<Value> {
    let mut data = state.data();
    let lines = data.carts.entry(query.user_id).or_default();
    lines.retain(|l| product_id(&l.product) != id);
    cart_json(lines)
}

async fn clear_cart(State(state): State<MockState>, Query(query): Query<UserQuery>) -> StatusCode {
    state.data().carts.insert(query.user_id, Vec::new());
    StatusCode::NO_CONTENT
}

// =============================================================================
// Wishlists
// =============================================================================

#[derive(Deserialize)]
struct CreateWishlistBody {
    name: String,
    user_id: String,
}

#[derive(Deserialize)]
struct AddProductBody {
    product_id: i64,
}

async fn list_wishlists(
    State(state): State<MockState>,
    Query(query): Query<UserQuery>,
) -> Json<Value> {
    let lists: Vec<Value> = state
        .data()
        .wishlists
        .iter()
        .filter(|w| w.user_id == query.user_id)
        .map(StoredWishlist::to_json)
        .collect();
    Json(Value::Array(lists))
}

async fn create_wishlist(
    State(state): State<MockState>,
    Json(body): Json<CreateWishlistBody>,
) -> Result<Json<Value>, StatusCode> {
    if body.name.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let wishlist = StoredWishlist {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: body.user_id,
        name: body.name,
        items: Vec::new(),
    };
    let response = wishlist.to_json();
    state.data().wishlists.push(wishlist);
    Ok(Json(response))
}

fn with_wishlist<F>(state: &MockState, id: &str, user_id: &str, f: F) -> Result<Json<Value>, StatusCode>
where
    F: FnOnce(&mut StoredWishlist),
{
    let mut data = state.data();
    let wishlist = data
        .wishlists
        .iter_mut()
        .find(|w| w.id == id && w.user_id == user_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    f(wishlist);
    Ok(Json(wishlist.to_json()))
}

async fn add_wishlist_product(
    State(state): State<MockState>,
    Path(id): Path<String>,
    Query(query): Query<UserQuery>,
    Json(body): Json<AddProductBody>,
) -> Result<Json<Value>, StatusCode> {
    with_wishlist(&state, &id, &query.user_id, |wishlist| {
        if !wishlist.items.iter().any(|i| entry_product_id(i) == body.product_id) {
            wishlist.items.push(json!({
                "product": catalog_product(body.product_id),
                "added_at": chrono::Utc::now(),
            }));
        }
    })
}

async fn remove_wishlist_product(
    State(state): State<MockState>,
    Path((id, pid)): Path<(String, i64)>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, StatusCode> {
    with_wishlist(&state, &id, &query.user_id, |wishlist| {
        wishlist.items.retain(|i| entry_product_id(i) != pid);
    })
}

async fn delete_wishlist(
    State(state): State<MockState>,
    Path(id): Path<String>,
    Query(query): Query<UserQuery>,
) -> StatusCode {
    let mut data = state.data();
    let before = data.wishlists.len();
    data.wishlists
        .retain(|w| !(w.id == id && w.user_id == query.user_id));
    if data.wishlists.len() == before {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    }
}
