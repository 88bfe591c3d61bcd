//! `PostgreSQL` entity store.
//!
//! All partitions share the `entities` table created by
//! `migrations/20261016000001_create_entities.sql`. Row keys are compared
//! with the `"C"` collation so segment order matches byte order regardless of
//! the database locale.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::PgPool;
use sqlx::types::Json;
use tokio::sync::OnceCell;

use order_desk_core::{ContinuationToken, Partition};

use super::{EntityRow, EntityStore, Page, StoreError};

const CREATE_ENTITIES_SQL: &str = include_str!("../../migrations/20261016000001_create_entities.sql");

/// Entity store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgEntityStore {
    pool: PgPool,
    table_ready: std::sync::Arc<OnceCell<()>>,
}

#[derive(sqlx::FromRow)]
struct PgEntityRow {
    partition_key: String,
    row_key: String,
    timestamp: DateTime<Utc>,
    properties: Json<Map<String, Value>>,
}

impl From<PgEntityRow> for EntityRow {
    fn from(row: PgEntityRow) -> Self {
        Self {
            partition_key: row.partition_key,
            row_key: row.row_key,
            timestamp: row.timestamp,
            properties: row.properties.0,
        }
    }
}

impl PgEntityStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            table_ready: std::sync::Arc::new(OnceCell::new()),
        }
    }
}

#[async_trait]
impl EntityStore for PgEntityStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn ensure_table(&self) -> Result<(), StoreError> {
        self.table_ready
            .get_or_try_init(|| async {
                sqlx::raw_sql(CREATE_ENTITIES_SQL)
                    .execute(&self.pool)
                    .await
                    .map(|_| ())
            })
            .await?;
        Ok(())
    }

    async fn insert(
        &self,
        partition: Partition,
        row_key: &str,
        properties: Map<String, Value>,
    ) -> Result<EntityRow, StoreError> {
        let row = sqlx::query_as::<_, PgEntityRow>(
            r#"
            INSERT INTO entities (partition_key, row_key, properties)
            VALUES ($1, $2, $3)
            RETURNING partition_key, row_key, "timestamp", properties
            "#,
        )
        .bind(partition.as_str())
        .bind(row_key)
        .bind(Value::Object(properties))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::Conflict {
                    partition: partition.to_string(),
                    row_key: row_key.to_owned(),
                };
            }
            StoreError::Database(e)
        })?;

        Ok(row.into())
    }

    async fn query_partition(
        &self,
        partition: Partition,
        continuation: Option<&ContinuationToken>,
        page_size: u32,
    ) -> Result<Page<EntityRow>, StoreError> {
        let page_size = page_size.max(1);

        // Fetch one extra row to learn whether another segment follows
        let mut rows = sqlx::query_as::<_, PgEntityRow>(
            r#"
            SELECT partition_key, row_key, "timestamp", properties
            FROM entities
            WHERE partition_key = $1
              AND ($2::TEXT IS NULL OR row_key COLLATE "C" > $2::TEXT COLLATE "C")
            ORDER BY row_key COLLATE "C"
            LIMIT $3
            "#,
        )
        .bind(partition.as_str())
        .bind(continuation.map(ContinuationToken::resume_after))
        .bind(i64::from(page_size) + 1)
        .fetch_all(&self.pool)
        .await?;

        let page_len = usize::try_from(page_size).unwrap_or(usize::MAX);
        let more = rows.len() > page_len;
        rows.truncate(page_len);

        let items: Vec<EntityRow> = rows.into_iter().map(EntityRow::from).collect();
        let continuation = if more {
            items.last().map(|row| ContinuationToken::after(&row.row_key))
        } else {
            None
        };

        Ok(Page {
            items,
            continuation,
        })
    }
}
