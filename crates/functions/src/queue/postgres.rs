//! `PostgreSQL` message queue.
//!
//! Queues are rows in `queues`; messages live in `queue_messages` with a
//! `visible_at` column that receiving pushes into the future. Concurrent
//! receivers use `FOR UPDATE SKIP LOCKED` so a message is handed to one
//! receiver per visibility window.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::sync::OnceCell;
use uuid::Uuid;

use super::{MessageQueue, QueueError, QueueMessage, check_visibility_timeout};

const CREATE_QUEUES_SQL: &str = include_str!("../../migrations/20261016000002_create_queues.sql");

/// A named queue stored in `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgMessageQueue {
    pool: PgPool,
    name: String,
    schema_ready: Arc<OnceCell<()>>,
}

#[derive(sqlx::FromRow)]
struct PgQueueMessage {
    id: Uuid,
    message_text: String,
    inserted_at: DateTime<Utc>,
    dequeue_count: i32,
}

impl From<PgQueueMessage> for QueueMessage {
    fn from(row: PgQueueMessage) -> Self {
        Self {
            id: row.id,
            message_text: row.message_text,
            inserted_at: row.inserted_at,
            dequeue_count: u32::try_from(row.dequeue_count).unwrap_or(0),
        }
    }
}

impl PgMessageQueue {
    #[must_use]
    pub fn new(pool: PgPool, name: impl Into<String>) -> Self {
        Self {
            pool,
            name: name.into(),
            schema_ready: Arc::new(OnceCell::new()),
        }
    }

    async fn ensure_schema(&self) -> Result<(), QueueError> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::raw_sql(CREATE_QUEUES_SQL)
                    .execute(&self.pool)
                    .await
                    .map(|_| ())
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MessageQueue for PgMessageQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self) -> Result<bool, QueueError> {
        self.ensure_schema().await?;
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM queues WHERE name = $1)")
                .bind(&self.name)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create_if_not_exists(&self) -> Result<(), QueueError> {
        self.ensure_schema().await?;
        sqlx::query("INSERT INTO queues (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(&self.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn send(&self, message_text: &str) -> Result<QueueMessage, QueueError> {
        self.ensure_schema().await?;
        let row = sqlx::query_as::<_, PgQueueMessage>(
            r"
            INSERT INTO queue_messages (id, queue_name, message_text)
            VALUES ($1, $2, $3)
            RETURNING id, message_text, inserted_at, dequeue_count
            ",
        )
        .bind(Uuid::new_v4())
        .bind(&self.name)
        .bind(message_text)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return QueueError::NotFound(self.name.clone());
            }
            QueueError::Database(e)
        })?;

        Ok(row.into())
    }

    async fn receive(
        &self,
        max_messages: u32,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        check_visibility_timeout(visibility_timeout)?;
        if !self.exists().await? {
            return Err(QueueError::NotFound(self.name.clone()));
        }

        let mut rows = sqlx::query_as::<_, PgQueueMessage>(
            r"
            UPDATE queue_messages AS m
            SET visible_at = now() + make_interval(secs => $3),
                dequeue_count = m.dequeue_count + 1
            FROM (
                SELECT id
                FROM queue_messages
                WHERE queue_name = $1 AND visible_at <= now()
                ORDER BY inserted_at, id
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            ) AS picked
            WHERE m.id = picked.id
            RETURNING m.id, m.message_text, m.inserted_at, m.dequeue_count
            ",
        )
        .bind(&self.name)
        .bind(i64::from(max_messages))
        .bind(visibility_timeout.as_secs_f64())
        .fetch_all(&self.pool)
        .await?;

        // RETURNING order is unspecified
        rows.sort_by(|a, b| a.inserted_at.cmp(&b.inserted_at).then(a.id.cmp(&b.id)));
        Ok(rows.into_iter().map(QueueMessage::from).collect())
    }
}
