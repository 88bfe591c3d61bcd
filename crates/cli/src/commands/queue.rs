//! Queue inspection command.

use std::time::Duration;

use secrecy::ExposeSecret;

use order_desk_functions::backend::{BackendKind, create_pool};
use order_desk_functions::queue::{MessageQueue, PgMessageQueue, decode_message};

use super::{CommandError, Connections};

/// Print up to `max` pending messages, decoded, one JSON document per line.
///
/// Uses the same non-deleting receive as `GET /orders/queue`.
pub async fn peek(max: u32, visibility_timeout: Duration) -> Result<(), CommandError> {
    let connections = Connections::from_env()?;

    let kind = BackendKind::detect(connections.queue.expose_secret())
        .map_err(|e| CommandError::InvalidConnection("QUEUE_CONNECTION_STRING", e.to_string()))?;
    if kind == BackendKind::Memory {
        tracing::warn!("in-memory queue lives inside the functions process; nothing to peek");
        return Ok(());
    }

    let pool = create_pool(&connections.queue, Duration::from_secs(10)).await?;
    let queue = PgMessageQueue::new(pool, connections.queue_name);

    if !queue.exists().await? {
        tracing::warn!("Queue '{}' not found.", queue.name());
        return Ok(());
    }

    let messages = queue.receive(max, visibility_timeout).await?;
    tracing::info!(count = messages.len(), queue = queue.name(), "received messages");

    for message in messages {
        let body = decode_message(&message.message_text)?;
        let body = serde_json::from_str::<serde_json::Value>(&body)
            .map_or(body, |json| json.to_string());

        #[allow(clippy::print_stdout)]
        {
            println!(
                "{}\t{}\t{}\t{body}",
                message.id,
                message.inserted_at.to_rfc3339(),
                message.dequeue_count
            );
        }
    }

    Ok(())
}
