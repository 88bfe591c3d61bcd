//! In-process message queue.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use super::{MessageQueue, QueueError, QueueMessage, check_visibility_timeout};

#[derive(Debug)]
struct Held {
    message: QueueMessage,
    visible_at: Instant,
}

/// A single named queue held in memory.
///
/// The queue starts out absent, the same as a fresh storage account; call
/// [`MessageQueue::create_if_not_exists`] before sending.
#[derive(Debug)]
pub struct MemoryMessageQueue {
    name: String,
    messages: Mutex<Option<VecDeque<Held>>>,
}

impl MemoryMessageQueue {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            messages: Mutex::new(None),
        }
    }

    /// Number of messages held, visible or not. `None` if the queue is absent.
    pub async fn len(&self) -> Option<usize> {
        self.messages.lock().await.as_ref().map(VecDeque::len)
    }
}

#[async_trait]
impl MessageQueue for MemoryMessageQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self) -> Result<bool, QueueError> {
        Ok(self.messages.lock().await.is_some())
    }

    async fn create_if_not_exists(&self) -> Result<(), QueueError> {
        self.messages.lock().await.get_or_insert_with(VecDeque::new);
        Ok(())
    }

    async fn send(&self, message_text: &str) -> Result<QueueMessage, QueueError> {
        let mut guard = self.messages.lock().await;
        let messages = guard
            .as_mut()
            .ok_or_else(|| QueueError::NotFound(self.name.clone()))?;

        let message = QueueMessage {
            id: Uuid::new_v4(),
            message_text: message_text.to_owned(),
            inserted_at: Utc::now(),
            dequeue_count: 0,
        };
        messages.push_back(Held {
            message: message.clone(),
            visible_at: Instant::now(),
        });
        Ok(message)
    }

    async fn receive(
        &self,
        max_messages: u32,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        check_visibility_timeout(visibility_timeout)?;
        let mut guard = self.messages.lock().await;
        let messages = guard
            .as_mut()
            .ok_or_else(|| QueueError::NotFound(self.name.clone()))?;

        let max = usize::try_from(max_messages).unwrap_or(usize::MAX);
        let now = Instant::now();
        let hidden_until = now
            .checked_add(visibility_timeout)
            .ok_or(QueueError::VisibilityTimeout(visibility_timeout))?;

        Ok(messages
            .iter_mut()
            .filter(|held| held.visible_at <= now)
            .take(max)
            .map(|held| {
                held.visible_at = hidden_until;
                held.message.dequeue_count += 1;
                held.message.clone()
            })
            .collect())
    }
}
