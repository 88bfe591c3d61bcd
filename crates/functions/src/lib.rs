//! order-desk functions library.
//!
//! HTTP functions that register users and products, place orders, persist
//! them to the entity store, and publish order notifications to a queue.
//! The binary in `main.rs` wires configuration, tracing and Sentry around
//! [`app`]; tests drive the same router in-process.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod queue;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod validation;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

pub use config::FunctionsConfig;
pub use state::AppState;

/// Build the full application router.
///
/// Health checks are open; every function route requires the function key.
pub fn app(state: AppState) -> Router {
    let request_timeout = state.config().request_timeout;

    let functions = routes::routes().route_layer(from_fn_with_state(
        state.clone(),
        middleware::require_function_key,
    ));

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(functions)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri().path(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the entity store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "entity store not ready");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{body::Body, http};
    use serde_json::{Map, Value};
    use tower::ServiceExt;

    use order_desk_core::{ContinuationToken, Partition};

    use crate::config::FunctionsConfig;
    use crate::queue::MemoryMessageQueue;
    use crate::routes::test_support::{KEY, harness, router_with, text};
    use crate::store::{EntityRow, EntityStore, MemoryEntityStore, Page, StoreError};

    /// Store whose partition reads never finish in time.
    struct StalledStore(MemoryEntityStore);

    #[async_trait]
    impl EntityStore for StalledStore {
        async fn ping(&self) -> Result<(), StoreError> {
            self.0.ping().await
        }

        async fn ensure_table(&self) -> Result<(), StoreError> {
            self.0.ensure_table().await
        }

        async fn insert(
            &self,
            partition: Partition,
            row_key: &str,
            properties: Map<String, Value>,
        ) -> Result<EntityRow, StoreError> {
            self.0.insert(partition, row_key, properties).await
        }

        async fn query_partition(
            &self,
            partition: Partition,
            continuation: Option<&ContinuationToken>,
            page_size: u32,
        ) -> Result<Page<EntityRow>, StoreError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            self.0.query_partition(partition, continuation, page_size).await
        }
    }

    #[tokio::test]
    async fn test_health_needs_no_key() {
        let h = harness();
        for uri in ["/health", "/health/ready"] {
            let response = h
                .router
                .clone()
                .oneshot(http::Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), http::StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_function_routes_need_key() {
        let h = harness();
        let response = h
            .router
            .clone()
            .oneshot(http::Request::builder().uri("/users").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
        assert_eq!(text(response).await, "Unauthorized");
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let h = harness();
        let response = crate::routes::test_support::get(&h.router, "/nope").await;
        assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_slow_request_times_out_with_408() {
        let mut config = FunctionsConfig::in_memory(KEY);
        config.request_timeout = Duration::from_millis(200);
        let queue = Arc::new(MemoryMessageQueue::new(config.queue_name.clone()));
        let router = router_with(
            config,
            Arc::new(StalledStore(MemoryEntityStore::new())),
            queue,
        );

        let response = crate::routes::test_support::get(&router, "/orders").await;
        assert_eq!(response.status(), http::StatusCode::REQUEST_TIMEOUT);
    }
}
