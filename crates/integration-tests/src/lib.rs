//! Integration tests for order-desk.
//!
//! Each test binds the full functions router to an ephemeral port and talks
//! to it over HTTP with `reqwest`.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory backends only
//! cargo test -p order-desk-integration-tests
//!
//! # Also exercise the PostgreSQL store and queue
//! ORDER_DESK_TEST_DATABASE_URL=postgres://localhost/order_desk_test \
//!     cargo test -p order-desk-integration-tests
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use order_desk_functions::config::FunctionsConfig;
use order_desk_functions::queue::{MemoryMessageQueue, MessageQueue, QueueError, QueueMessage};
use order_desk_functions::state::AppState;
use order_desk_functions::store::{EntityStore, MemoryEntityStore};

/// Function key used by every test server.
pub const TEST_KEY: &str = "integration-test-function-key-0123456789";

/// A running functions server on a loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Serve with fresh in-memory store and queue.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn in_memory() -> Self {
        let config = FunctionsConfig::in_memory(TEST_KEY);
        let queue = Arc::new(MemoryMessageQueue::new(config.queue_name.clone()));
        Self::start(config, Arc::new(MemoryEntityStore::new()), queue).await
    }

    /// Serve with the given backends.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start(
        config: FunctionsConfig,
        store: Arc<dyn EntityStore>,
        queue: Arc<dyn MessageQueue>,
    ) -> Self {
        let app = order_desk_functions::app(AppState::new(config, store, queue));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            addr,
            client: Client::new(),
            handle,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// GET with the function key header.
    #[must_use]
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(self.url(path))
            .header("x-functions-key", TEST_KEY)
    }

    /// POST a JSON body with the function key header.
    #[must_use]
    pub fn post_json(&self, path: &str, body: &serde_json::Value) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .header("x-functions-key", TEST_KEY)
            .json(body)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
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

/// `PostgreSQL` URL for backend tests, if configured.
#[must_use]
pub fn test_database_url() -> Option<String> {
    std::env::var("ORDER_DESK_TEST_DATABASE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
}
