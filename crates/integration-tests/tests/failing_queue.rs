//! Order placement when the notification queue is unavailable.

use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Value, json};

use order_desk_functions::config::FunctionsConfig;
use order_desk_functions::store::MemoryEntityStore;
use order_desk_integration_tests::{FailingQueue, TEST_KEY, TestServer};

#[tokio::test]
async fn test_order_is_recorded_when_publish_fails() {
    let server = TestServer::start(
        FunctionsConfig::in_memory(TEST_KEY),
        Arc::new(MemoryEntityStore::new()),
        Arc::new(FailingQueue),
    )
    .await;

    let resp = server
        .post_json(
            "/placeOrder",
            &json!({
                "customerName": "Ada",
                "customerEmail": "ada@example.com",
                "customerPhone": "555-0100",
                "totalAmount": 5.0,
                "products": [{"name": "Widget", "quantity": 1, "price": 5.0}]
            }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.text().await.unwrap(), "Internal server error");

    let orders: Vec<Value> = server.get("/orders").send().await.unwrap().json().await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["customerName"], "Ada");
}
