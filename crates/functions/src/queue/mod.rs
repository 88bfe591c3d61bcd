//! Queue Publisher: a durable at-least-once message queue.
//!
//! Order notifications are published here after the order row is written.
//! Messages are JSON, then base64 encoded for transport ([`encode_message`]);
//! readers reverse it with [`decode_message`].
//!
//! Receiving a message never deletes it. A received message is hidden for a
//! visibility timeout and then becomes receivable again with a higher
//! dequeue count.
//!
//! # Backends
//!
//! - [`memory::MemoryMessageQueue`] - in-process, for local development and tests
//! - [`postgres::PgMessageQueue`] - `PostgreSQL` `queues` / `queue_messages` tables

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryMessageQueue;
pub use postgres::PgMessageQueue;

/// Errors that can occur during queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The named queue has not been created.
    #[error("queue '{0}' not found")]
    NotFound(String),

    /// A payload could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A message body is not valid base64.
    #[error("message is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// A decoded message body is not UTF-8.
    #[error("message is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::string::FromUtf8Error),

    /// Requested visibility timeout is longer than the queue allows.
    #[error("visibility timeout of {0:?} exceeds the maximum of {MAX_VISIBILITY_TIMEOUT:?}")]
    VisibilityTimeout(Duration),

    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Longest time a received message may stay hidden.
pub const MAX_VISIBILITY_TIMEOUT: Duration =
    Duration::from_secs(crate::config::MAX_VISIBILITY_TIMEOUT_SECS);

fn check_visibility_timeout(visibility_timeout: Duration) -> Result<(), QueueError> {
    if visibility_timeout > MAX_VISIBILITY_TIMEOUT {
        return Err(QueueError::VisibilityTimeout(visibility_timeout));
    }
    Ok(())
}

/// A message as held by the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub id: Uuid,
    /// Transport-encoded body.
    pub message_text: String,
    pub inserted_at: DateTime<Utc>,
    /// How many times the message has been received.
    pub dequeue_count: u32,
}

/// A named message queue.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// The queue's name.
    fn name(&self) -> &str;

    /// Whether the queue has been created.
    async fn exists(&self) -> Result<bool, QueueError>;

    /// Create the queue if it does not exist yet.
    async fn create_if_not_exists(&self) -> Result<(), QueueError>;

    /// Append a message. Fails with `NotFound` if the queue does not exist.
    async fn send(&self, message_text: &str) -> Result<QueueMessage, QueueError>;

    /// Receive up to `max_messages` visible messages, oldest first, hiding
    /// each for `visibility_timeout`. Nothing is deleted.
    async fn receive(
        &self,
        max_messages: u32,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError>;
}

/// Serialize `payload` as JSON and base64 encode it for transport.
///
/// # Errors
///
/// Returns `QueueError::Serialization` if the payload cannot be serialized.
pub fn encode_message<T: Serialize>(payload: &T) -> Result<String, QueueError> {
    let json = serde_json::to_vec(payload)?;
    Ok(STANDARD.encode(json))
}

/// Decode a transport-encoded message back to its JSON text.
///
/// # Errors
///
/// Returns `QueueError::Encoding` or `QueueError::NotUtf8` for malformed bodies.
pub fn decode_message(message_text: &str) -> Result<String, QueueError> {
    let bytes = STANDARD.decode(message_text.trim())?;
    Ok(String::from_utf8(bytes)?)
}
