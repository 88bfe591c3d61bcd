//! Product route handlers.

use axum::{
    extract::{Query, State},
    response::Response,
};
use tracing::instrument;

use super::{JsonBody, ListQuery, list};
use crate::error::Result;
use crate::models::{ProductEntity, RegisterProductRequest};
use crate::state::AppState;
use crate::store::Table;

/// Register a product under a freshly generated id.
#[instrument(skip_all)]
pub async fn register_product(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterProductRequest>,
) -> Result<String> {
    let product = ProductEntity::new(body.validate()?);
    tracing::info!(product_id = %product.product_id, "registering product");

    Table::<ProductEntity>::new(state.store(), state.config().scan_page_size)
        .insert(&product)
        .await?;

    Ok(format!(
        "Product {} registered successfully.",
        product.product_name
    ))
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Response> {
    list::<ProductEntity, ProductEntity>(&state, &query, std::convert::identity).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use order_desk_core::Partition;

    use super::super::CONTINUATION_HEADER;
    use super::super::test_support::{get, harness, json, post_json, text};

    #[tokio::test]
    async fn test_register_product_with_string_numbers() {
        let h = harness();
        let response = post_json(
            &h.router,
            "/registerProduct",
            &json!({"productName": "Widget", "price": "19.99", "quantity": "3"}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(text(response).await, "Product Widget registered successfully.");

        let products = json(get(&h.router, "/products").await).await;
        assert_eq!(products[0]["price"], 19.99);
        assert_eq!(products[0]["quantity"], 3);
        assert_eq!(products[0]["rowKey"], products[0]["productId"]);
    }

    #[tokio::test]
    async fn test_invalid_numbers_rejected() {
        let h = harness();
        for (price, quantity) in [("abc", "3"), ("19.99", "3.5")] {
            let response = post_json(
                &h.router,
                "/registerProduct",
                &json!({"productName": "Widget", "price": price, "quantity": quantity}),
            )
            .await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                json(response).await["error"],
                "Price must be a number, and quantity must be an integer."
            );
        }
        assert_eq!(h.store.count(Partition::Products).await, 0);
    }

    #[tokio::test]
    async fn test_missing_fields_rejected() {
        let h = harness();
        let response = post_json(&h.router, "/registerProduct", &json!({"productName": "Widget"})).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json(response).await["error"],
            "Please provide productName, price, and quantity."
        );
    }

    #[tokio::test]
    async fn test_paged_listing_follows_header_cursor() {
        let h = harness();
        for i in 0..5 {
            post_json(
                &h.router,
                "/registerProduct",
                &json!({"productName": format!("P{i}"), "price": 1.0, "quantity": 1}),
            )
            .await;
        }

        let mut seen = 0;
        let mut uri = "/products?limit=2".to_string();
        loop {
            let response = get(&h.router, &uri).await;
            assert_eq!(response.status(), StatusCode::OK);
            let next = response
                .headers()
                .get(CONTINUATION_HEADER)
                .map(|v| v.to_str().unwrap().to_string());
            let page = json(response).await;
            let len = page.as_array().unwrap().len();
            assert!(len <= 2);
            seen += len;
            match next {
                Some(token) => uri = format!("/products?limit=2&continuationToken={token}"),
                None => break,
            }
        }
        assert_eq!(seen, 5);

        // Unpaged listing drains everything and sends no cursor
        let response = get(&h.router, "/products").await;
        assert!(response.headers().get(CONTINUATION_HEADER).is_none());
        assert_eq!(json(response).await.as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_bad_continuation_token_is_bad_request() {
        let h = harness();
        let response = get(&h.router, "/products?continuationToken=***").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
