//! In-process entity store.

use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use order_desk_core::{ContinuationToken, Partition};

use super::{EntityRow, EntityStore, Page, StoreError};

type RowId = (Partition, String);

/// Entity store held in memory, ordered by `(partition, row key)`.
///
/// Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    rows: RwLock<BTreeMap<RowId, EntityRow>>,
}

impl MemoryEntityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows in `partition`.
    pub async fn count(&self, partition: Partition) -> usize {
        self.rows
            .read()
            .await
            .keys()
            .filter(|(p, _)| *p == partition)
            .count()
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn ensure_table(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert(
        &self,
        partition: Partition,
        row_key: &str,
        properties: Map<String, Value>,
    ) -> Result<EntityRow, StoreError> {
        let mut rows = self.rows.write().await;
        let id = (partition, row_key.to_owned());
        if rows.contains_key(&id) {
            return Err(StoreError::Conflict {
                partition: partition.to_string(),
                row_key: row_key.to_owned(),
            });
        }

        let row = EntityRow {
            partition_key: partition.as_str().to_owned(),
            row_key: row_key.to_owned(),
            timestamp: Utc::now(),
            properties,
        };
        rows.insert(id, row.clone());
        Ok(row)
    }

    async fn query_partition(
        &self,
        partition: Partition,
        continuation: Option<&ContinuationToken>,
        page_size: u32,
    ) -> Result<Page<EntityRow>, StoreError> {
        let page_size = usize::try_from(page_size.max(1)).unwrap_or(usize::MAX);
        let lower = continuation.map_or_else(
            || Bound::Included((partition, String::new())),
            |token| Bound::Excluded((partition, token.resume_after().to_owned())),
        );

        let rows = self.rows.read().await;
        let mut matching = rows
            .range((lower, Bound::Unbounded))
            .take_while(|((p, _), _)| *p == partition)
            .map(|(_, row)| row.clone());

        let items: Vec<EntityRow> = matching.by_ref().take(page_size).collect();
        let more = matching.next().is_some();
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
