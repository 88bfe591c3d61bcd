//! Order route handlers.

use axum::{
    Json,
    extract::{Query, State},
    response::Response,
};
use tracing::instrument;

use super::{JsonBody, ListQuery, list};
use crate::error::{AppError, Result};
use crate::models::{OrderEntity, PlaceOrderRequest};
use crate::queue::{QueueError, decode_message};
use crate::state::AppState;

/// Record an order and publish its notification.
#[instrument(skip_all)]
pub async fn place_order(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<PlaceOrderRequest>,
) -> Result<String> {
    let order = body.validate()?;
    let order_id = state.orders().place_order(order).await?;

    Ok(format!(
        "Order placed successfully with Order ID {order_id}."
    ))
}

/// List orders. Served at both `/orders` and `/orders/table`.
#[instrument(skip(state))]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Response> {
    list::<OrderEntity, OrderEntity>(&state, &query, std::convert::identity).await
}

/// Read up to one batch of pending notifications as decoded JSON text.
///
/// Messages are not deleted; they reappear after the visibility timeout.
#[instrument(skip(state))]
pub async fn drain_queue(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    let queue = state.queue();
    let not_found = || AppError::NotFound(format!("Queue '{}' not found.", queue.name()));

    if !queue.exists().await? {
        return Err(not_found());
    }

    let config = state.config();
    let messages = queue
        .receive(config.queue_batch_size, config.queue_visibility_timeout)
        .await
        .map_err(|e| match e {
            QueueError::NotFound(_) => not_found(),
            other => other.into(),
        })?;
    tracing::debug!(count = messages.len(), "received order notifications");

    let bodies = messages
        .iter()
        .map(|message| decode_message(&message.message_text))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Json(bodies))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use order_desk_core::Partition;

    use super::super::test_support::{
        FailingQueue, KEY, get, harness, harness_with, harness_with_queue, json, post_json,
        post_with, text,
    };
    use crate::config::FunctionsConfig;

    fn widget_order() -> Value {
        json!({
            "customerName": "Ada Lovelace",
            "customerEmail": "ada@example.com",
            "customerPhone": "555-0100",
            "totalAmount": 10.0,
            "products": [{"name": "Widget", "qty": 2, "price": 5.0}],
        })
    }

    fn order_id_from(message: &str) -> String {
        message
            .strip_prefix("Order placed successfully with Order ID ")
            .and_then(|rest| rest.strip_suffix('.'))
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_place_order_then_list() {
        let h = harness();
        let response = post_json(&h.router, "/placeOrder", &widget_order()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let order_id = order_id_from(&text(response).await);
        assert!(uuid::Uuid::parse_str(&order_id).is_ok());

        for path in ["/orders", "/orders/table"] {
            let orders = json(get(&h.router, path).await).await;
            let orders = orders.as_array().unwrap();
            assert_eq!(orders.len(), 1);
            assert_eq!(orders[0]["rowKey"], order_id.as_str());
            assert_eq!(orders[0]["orderStatus"], "Processing");

            let blob: Value = serde_json::from_str(orders[0]["products"].as_str().unwrap()).unwrap();
            assert_eq!(blob, json!([{"name": "Widget", "quantity": 2, "price": 5.0}]));
        }
    }

    #[tokio::test]
    async fn test_empty_products_writes_nothing() {
        let h = harness();
        let mut body = widget_order();
        body["products"] = json!([]);

        let response = post_json(&h.router, "/placeOrder", &body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json(response).await["error"],
            "Please provide customer details and at least one product."
        );
        assert_eq!(h.store.count(Partition::Orders).await, 0);
        assert_eq!(h.queue.len().await, None);
    }

    #[tokio::test]
    async fn test_queue_absent_is_not_found() {
        let h = harness();
        let response = get(&h.router, "/orders/queue").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(text(response).await, "Queue 'ordersqueue' not found.");
    }

    #[tokio::test]
    async fn test_drain_returns_decoded_notification() {
        let h = harness();
        let response = post_json(&h.router, "/placeOrder", &widget_order()).await;
        let order_id = order_id_from(&text(response).await);

        let messages = json(get(&h.router, "/orders/queue").await).await;
        let messages = messages.as_array().unwrap();
        assert_eq!(messages.len(), 1);

        let note: Value = serde_json::from_str(messages[0].as_str().unwrap()).unwrap();
        assert_eq!(note["OrderId"], order_id.as_str());
        assert_eq!(note["OrderStatus"], "Processing");
        assert_eq!(note["Products"][0]["quantity"], 2);
    }

    #[tokio::test]
    async fn test_drain_does_not_delete() {
        let mut config = FunctionsConfig::in_memory(KEY);
        config.queue_visibility_timeout = Duration::ZERO;
        let h = harness_with(config);
        post_json(&h.router, "/placeOrder", &widget_order()).await;

        let first = json(get(&h.router, "/orders/queue").await).await;
        let second = json(get(&h.router, "/orders/queue").await).await;
        assert_eq!(first.as_array().unwrap().len(), 1);
        assert_eq!(first, second);
        assert_eq!(h.queue.len().await, Some(1));
    }

    #[tokio::test]
    async fn test_drain_hides_within_visibility_timeout() {
        let h = harness();
        post_json(&h.router, "/placeOrder", &widget_order()).await;

        let first = json(get(&h.router, "/orders/queue").await).await;
        let second = json(get(&h.router, "/orders/queue").await).await;
        assert_eq!(first.as_array().unwrap().len(), 1);
        assert!(second.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_is_500_but_order_is_recorded() {
        let (store, router) = harness_with_queue(Arc::new(FailingQueue));
        let response = post_json(&router, "/placeOrder", &widget_order()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(text(response).await, "Internal server error");
        assert_eq!(store.count(Partition::Orders).await, 1);
    }

    #[tokio::test]
    async fn test_place_order_without_content_type() {
        let h = harness();
        let body = axum::body::Body::from(widget_order().to_string());

        let response = post_with(&h.router, "/placeOrder", None, body).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(h.store.count(Partition::Orders).await, 1);
    }

    #[tokio::test]
    async fn test_oversized_visibility_timeout_fails_drain_cleanly() {
        let mut config = FunctionsConfig::in_memory(KEY);
        config.queue_visibility_timeout = Duration::MAX;
        let h = harness_with(config);
        post_json(&h.router, "/placeOrder", &widget_order()).await;

        let response = get(&h.router, "/orders/queue").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(text(response).await, "Internal server error");
        assert_eq!(h.queue.len().await, Some(1));
    }
}
