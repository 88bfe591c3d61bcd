//! Entity Store: a key-value table addressed by `(partition, row)`.
//!
//! # Layout
//!
//! One partition per entity kind (see [`Partition`]). Rows are create-once:
//! inserting an existing `(partition, row)` pair fails with
//! [`StoreError::Conflict`], and nothing updates or deletes rows.
//!
//! # Reads
//!
//! Reads are partition scans in row-key order, returned in bounded segments
//! chained by a [`ContinuationToken`]. [`Table::scan_all`] follows the chain to
//! the end; [`Table::page`] returns a single segment for callers that page
//! themselves.
//!
//! # Backends
//!
//! - [`memory::MemoryEntityStore`] - ordered map, for local development and tests
//! - [`postgres::PgEntityStore`] - `PostgreSQL` `entities` table

pub mod memory;
pub mod postgres;

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use thiserror::Error;

use order_desk_core::{ContinuationToken, Partition};

pub use memory::MemoryEntityStore;
pub use postgres::PgEntityStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A row with the same partition and row key already exists.
    #[error("row {partition}/{row_key} already exists")]
    Conflict { partition: String, row_key: String },

    /// An entity could not be converted to or from its stored properties.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is not shaped like the entity it should hold.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// One stored row.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRow {
    pub partition_key: String,
    pub row_key: String,
    /// Server-assigned write time.
    pub timestamp: DateTime<Utc>,
    pub properties: Map<String, Value>,
}

/// A bounded slice of a partition scan.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Present when more rows follow.
    pub continuation: Option<ContinuationToken>,
}

impl<T> Page<T> {
    /// Apply `f` to every item, keeping the cursor.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            continuation: self.continuation,
        }
    }
}

/// Storage backend for entity rows.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Create the backing table if it does not exist yet.
    async fn ensure_table(&self) -> Result<(), StoreError>;

    /// Insert a new row. The row's timestamp is assigned by the store.
    ///
    /// Returns the stored row.
    async fn insert(
        &self,
        partition: Partition,
        row_key: &str,
        properties: Map<String, Value>,
    ) -> Result<EntityRow, StoreError>;

    /// Read at most `page_size` rows of `partition`, in row-key order,
    /// starting after `continuation` when given.
    async fn query_partition(
        &self,
        partition: Partition,
        continuation: Option<&ContinuationToken>,
        page_size: u32,
    ) -> Result<Page<EntityRow>, StoreError>;
}

/// A typed record that lives in one partition.
pub trait TableEntity: Serialize + DeserializeOwned + Send + Sync {
    const PARTITION: Partition;

    /// The row key this record is stored under.
    fn row_key(&self) -> String;
}

/// A typed record together with its row metadata, as returned by listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stored<T> {
    pub partition_key: String,
    pub row_key: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub entity: T,
}

impl<T> Stored<T> {
    /// Replace the entity, keeping the row metadata.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Stored<U> {
        Stored {
            partition_key: self.partition_key,
            row_key: self.row_key,
            timestamp: self.timestamp,
            entity: f(self.entity),
        }
    }
}

/// Typed access to the partition of `T`.
pub struct Table<'a, T> {
    store: &'a dyn EntityStore,
    page_size: u32,
    _entity: PhantomData<fn() -> T>,
}

impl<'a, T: TableEntity> Table<'a, T> {
    #[must_use]
    pub fn new(store: &'a dyn EntityStore, page_size: u32) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
            _entity: PhantomData,
        }
    }

    /// Insert a new record, creating the table first if needed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the row key is taken, or a backend error.
    pub async fn insert(&self, entity: &T) -> Result<Stored<T>, StoreError>
    where
        T: Clone,
    {
        let properties = match serde_json::to_value(entity)? {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::DataCorruption(format!(
                    "{} entity serialized to non-object {other}",
                    T::PARTITION
                )));
            }
        };

        self.store.ensure_table().await?;
        let row = self
            .store
            .insert(T::PARTITION, &entity.row_key(), properties)
            .await?;

        Ok(Stored {
            partition_key: row.partition_key,
            row_key: row.row_key,
            timestamp: row.timestamp,
            entity: entity.clone(),
        })
    }

    /// Read one segment of at most `limit` rows (capped at the table page size).
    ///
    /// # Errors
    ///
    /// Returns a backend error, or `DataCorruption` if a row does not decode as `T`.
    pub async fn page(
        &self,
        continuation: Option<&ContinuationToken>,
        limit: Option<u32>,
    ) -> Result<Page<Stored<T>>, StoreError> {
        let page_size = limit.map_or(self.page_size, |l| l.clamp(1, self.page_size));
        let segment = self
            .store
            .query_partition(T::PARTITION, continuation, page_size)
            .await?;

        let items = segment
            .items
            .into_iter()
            .map(decode_row::<T>)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            continuation: segment.continuation,
        })
    }

    /// Read the whole partition, following continuation tokens until exhausted.
    ///
    /// # Errors
    ///
    /// See [`Table::page`].
    pub async fn scan_all(&self) -> Result<Vec<Stored<T>>, StoreError> {
        let mut rows = Vec::new();
        let mut token = None;

        loop {
            let page = self.page(token.as_ref(), None).await?;
            rows.extend(page.items);
            match page.continuation {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        tracing::debug!(partition = %T::PARTITION, count = rows.len(), "partition scan complete");
        Ok(rows)
    }
}

fn decode_row<T: TableEntity>(row: EntityRow) -> Result<Stored<T>, StoreError> {
    let entity = serde_json::from_value(Value::Object(row.properties)).map_err(|e| {
        StoreError::DataCorruption(format!(
            "row {}/{} does not decode: {e}",
            row.partition_key, row.row_key
        ))
    })?;

    Ok(Stored {
        partition_key: row.partition_key,
        row_key: row.row_key,
        timestamp: row.timestamp,
        entity,
    })
}
