//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::FunctionsConfig;
use crate::queue::MessageQueue;
use crate::services::OrderService;
use crate::store::EntityStore;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Handlers hold no other state between
/// invocations.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: FunctionsConfig,
    store: Arc<dyn EntityStore>,
    queue: Arc<dyn MessageQueue>,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: FunctionsConfig,
        store: Arc<dyn EntityStore>,
        queue: Arc<dyn MessageQueue>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                queue,
            }),
        }
    }

    /// Get a reference to the functions configuration.
    #[must_use]
    pub fn config(&self) -> &FunctionsConfig {
        &self.inner.config
    }

    /// Get a reference to the entity store.
    #[must_use]
    pub fn store(&self) -> &dyn EntityStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the order notification queue.
    #[must_use]
    pub fn queue(&self) -> &dyn MessageQueue {
        self.inner.queue.as_ref()
    }

    /// Order placement bound to this state's store and queue.
    #[must_use]
    pub fn orders(&self) -> OrderService<'_> {
        OrderService::new(self.store(), self.queue(), self.config().scan_page_size)
    }
}
