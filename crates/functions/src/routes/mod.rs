//! HTTP route handlers for the functions.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health            - Liveness (open)
//! GET  /health/ready      - Store reachability (open)
//!
//! # Users
//! POST /register          - Register a user
//! GET  /users             - List users (no password hashes)
//!
//! # Products
//! POST /registerProduct   - Register a product
//! GET  /products          - List products
//!
//! # Orders
//! POST /placeOrder        - Record an order and publish its notification
//! GET  /orders            - List orders
//! GET  /orders/table      - List orders (alias)
//! GET  /orders/queue      - Read pending notifications without deleting them
//! ```
//!
//! Listings return the whole partition unless `limit` or `continuationToken`
//! is given, in which case one segment is returned and the next cursor, if
//! any, is sent in the `x-continuation-token` header.

pub mod orders;
pub mod products;
pub mod users;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{FromRequest, Request},
    http::HeaderValue,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use order_desk_core::ContinuationToken;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::store::{Stored, Table, TableEntity};

/// Response header carrying the cursor for the next segment.
pub const CONTINUATION_HEADER: &str = "x-continuation-token";

/// Create the function routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(users::register))
        .route("/users", get(users::list_users))
        .route("/registerProduct", post(products::register_product))
        .route("/products", get(products::list_products))
        .route("/placeOrder", post(orders::place_order))
        .route("/orders", get(orders::list_orders))
        .route("/orders/table", get(orders::list_orders))
        .route("/orders/queue", get(orders::drain_queue))
}

/// JSON body extractor whose rejections are `AppError::BadRequest`.
///
/// The body is parsed as JSON whatever `Content-Type` the client sent.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

        serde_json::from_slice(&bytes).map(Self).map_err(|e| {
            AppError::BadRequest(format!("Failed to parse the request body as JSON: {e}"))
        })
    }
}

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub continuation_token: Option<String>,
}

impl ListQuery {
    fn token(&self) -> Result<Option<ContinuationToken>> {
        match self.continuation_token.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Ok(Some(ContinuationToken::parse(raw)?)),
            _ => Ok(None),
        }
    }
}

/// List the partition of `T`, shaping each row with `view`.
async fn list<T, V>(
    state: &AppState,
    query: &ListQuery,
    view: impl FnMut(Stored<T>) -> Stored<V>,
) -> Result<Response>
where
    T: TableEntity,
    V: Serialize,
{
    let table = Table::<T>::new(state.store(), state.config().scan_page_size);
    let token = query.token()?;

    if query.limit.is_none() && token.is_none() {
        let rows: Vec<Stored<V>> = table.scan_all().await?.into_iter().map(view).collect();
        return Ok(Json(rows).into_response());
    }

    let page = table.page(token.as_ref(), query.limit).await?.map(view);
    let mut response = Json(page.items).into_response();
    if let Some(next) = page.continuation
        && let Ok(value) = HeaderValue::from_str(&next.encode())
    {
        response.headers_mut().insert(CONTINUATION_HEADER, value);
    }
    Ok(response)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{self, Response},
    };
    use tower::ServiceExt;

    use crate::config::FunctionsConfig;
    use crate::queue::{MemoryMessageQueue, MessageQueue, QueueError, QueueMessage};
    use crate::state::AppState;
    use crate::store::{EntityStore, MemoryEntityStore};

    pub const KEY: &str = "k7Qz2mVx9LpA4rTb8NcW1yHd";

    pub struct Harness {
        pub store: Arc<MemoryEntityStore>,
        pub queue: Arc<MemoryMessageQueue>,
        pub router: Router,
    }

    pub fn harness() -> Harness {
        harness_with(FunctionsConfig::in_memory(KEY))
    }

    pub fn harness_with(config: FunctionsConfig) -> Harness {
        let store = Arc::new(MemoryEntityStore::new());
        let queue = Arc::new(MemoryMessageQueue::new(config.queue_name.clone()));
        let state = AppState::new(config, store.clone(), queue.clone());
        Harness {
            store,
            queue,
            router: crate::app(state),
        }
    }

    pub fn harness_with_queue(queue: Arc<dyn MessageQueue>) -> (Arc<MemoryEntityStore>, Router) {
        let store = Arc::new(MemoryEntityStore::new());
        let router = router_with(FunctionsConfig::in_memory(KEY), store.clone(), queue);
        (store, router)
    }

    pub fn router_with(
        config: FunctionsConfig,
        store: Arc<dyn EntityStore>,
        queue: Arc<dyn MessageQueue>,
    ) -> Router {
        crate::app(AppState::new(config, store, queue))
    }

    /// Queue that exists but rejects every send.
    pub struct FailingQueue;

    #[async_trait]
    impl MessageQueue for FailingQueue {
        fn name(&self) -> &str {
            "ordersqueue"
        }

        async fn exists(&self) -> Result<bool, QueueError> {
            Ok(true)
        }

        async fn create_if_not_exists(&self) -> Result<(), QueueError> {
            Ok(())
        }

        async fn send(&self, _message_text: &str) -> Result<QueueMessage, QueueError> {
            Err(QueueError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn receive(
            &self,
            _max_messages: u32,
            _visibility_timeout: Duration,
        ) -> Result<Vec<QueueMessage>, QueueError> {
            Ok(Vec::new())
        }
    }

    pub async fn get(router: &Router, uri: &str) -> Response<Body> {
        router
            .clone()
            .oneshot(
                http::Request::builder()
                    .uri(uri)
                    .header("x-functions-key", KEY)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    pub async fn post_json(router: &Router, uri: &str, body: &serde_json::Value) -> Response<Body> {
        post_raw(router, uri, body.to_string()).await
    }

    pub async fn post_raw(router: &Router, uri: &str, body: impl Into<Body>) -> Response<Body> {
        post_with(router, uri, Some("application/json"), body.into()).await
    }

    pub async fn post_with(
        router: &Router,
        uri: &str,
        content_type: Option<&str>,
        body: Body,
    ) -> Response<Body> {
        let mut request = http::Request::builder()
            .method("POST")
            .uri(uri)
            .header("x-functions-key", KEY);
        if let Some(content_type) = content_type {
            request = request.header("content-type", content_type);
        }
        router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap()
    }

    pub async fn text(response: Response<Body>) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    pub async fn json(response: Response<Body>) -> serde_json::Value {
        serde_json::from_str(&text(response).await).unwrap()
    }
}
