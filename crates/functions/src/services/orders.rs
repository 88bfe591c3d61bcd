//! Order placement: record the order, then notify the queue.
//!
//! The two writes are not atomic. The table row is written first; if the
//! queue publish then fails, the order stays recorded, the failure is logged
//! with the order id at error level, and the caller gets an error. There is no
//! retry.

use thiserror::Error;

use order_desk_core::OrderId;

use crate::models::{NewOrder, OrderEntity, OrderNotification};
use crate::queue::{MessageQueue, QueueError, encode_message};
use crate::store::{EntityStore, StoreError, Table};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("failed to serialize order: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to record order: {0}")]
    Store(#[from] StoreError),

    /// The order row exists but no notification was published.
    #[error("order {order_id} recorded but notification failed: {source}")]
    Notify {
        order_id: OrderId,
        #[source]
        source: QueueError,
    },
}

/// Places orders against a store and a notification queue.
pub struct OrderService<'a> {
    store: &'a dyn EntityStore,
    queue: &'a dyn MessageQueue,
    page_size: u32,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub fn new(store: &'a dyn EntityStore, queue: &'a dyn MessageQueue, page_size: u32) -> Self {
        Self {
            store,
            queue,
            page_size,
        }
    }

    /// Record `order` with a fresh id and publish its notification.
    ///
    /// # Errors
    ///
    /// `OrderError::Store` if nothing was written. `OrderError::Notify` if the
    /// order was written but the notification was not.
    #[tracing::instrument(skip(self, order), fields(items = order.products.len()))]
    pub async fn place_order(&self, order: NewOrder) -> Result<OrderId, OrderError> {
        let order_id = OrderId::generate();
        let entity = OrderEntity::new(order_id, &order)?;

        Table::<OrderEntity>::new(self.store, self.page_size)
            .insert(&entity)
            .await?;
        tracing::info!(%order_id, "order recorded");

        let notification = OrderNotification::new(&entity, order.products);
        if let Err(source) = self.notify(&notification).await {
            tracing::error!(
                %order_id,
                queue = self.queue.name(),
                error = %source,
                "order recorded but notification was not published"
            );
            return Err(OrderError::Notify { order_id, source });
        }

        Ok(order_id)
    }

    async fn notify(&self, notification: &OrderNotification) -> Result<(), QueueError> {
        let message = encode_message(notification)?;
        self.queue.create_if_not_exists().await?;
        let sent = self.queue.send(&message).await?;
        tracing::debug!(message_id = %sent.id, "order notification published");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use order_desk_core::Partition;

    use super::*;
    use crate::models::PlaceOrderRequest;
    use crate::queue::{MemoryMessageQueue, decode_message};
    use crate::routes::test_support::FailingQueue;
    use crate::store::MemoryEntityStore;

    fn widget_order() -> NewOrder {
        serde_json::from_value::<PlaceOrderRequest>(json!({
            "customerName": "Ada Lovelace",
            "customerEmail": "ada@example.com",
            "customerPhone": "555-0100",
            "totalAmount": 10.0,
            "products": [{"name": "Widget", "qty": 2, "price": 5.0}],
        }))
        .unwrap()
        .validate()
        .unwrap()
    }

    #[tokio::test]
    async fn test_place_order_records_and_notifies() {
        let store = MemoryEntityStore::new();
        let queue = MemoryMessageQueue::new("ordersqueue");
        let service = OrderService::new(&store, &queue, 1000);

        let order_id = service.place_order(widget_order()).await.unwrap();

        let orders = Table::<OrderEntity>::new(&store, 1000).scan_all().await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].row_key, order_id.to_string());

        let messages = queue.receive(32, Duration::ZERO).await.unwrap();
        assert_eq!(messages.len(), 1);
        let body: OrderNotification =
            serde_json::from_str(&decode_message(&messages[0].message_text).unwrap()).unwrap();
        assert_eq!(body.order_id, order_id);
        assert_eq!(body.products[0].name, "Widget");
        assert_eq!(body.products[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_queue_is_created_on_first_order() {
        let store = MemoryEntityStore::new();
        let queue = MemoryMessageQueue::new("ordersqueue");
        assert!(!queue.exists().await.unwrap());

        OrderService::new(&store, &queue, 1000)
            .place_order(widget_order())
            .await
            .unwrap();
        assert!(queue.exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_notification_leaves_order_recorded() {
        let store = MemoryEntityStore::new();
        let service = OrderService::new(&store, &FailingQueue, 1000);

        let order_id = match service.place_order(widget_order()).await {
            Err(OrderError::Notify { order_id, .. }) => order_id,
            other => panic!("expected notify error, got {other:?}"),
        };

        assert_eq!(store.count(Partition::Orders).await, 1);
        let orders = Table::<OrderEntity>::new(&store, 1000).scan_all().await.unwrap();
        assert_eq!(orders[0].entity.order_id, order_id);
    }
}
