//! Backend selection from connection strings.
//!
//! The scheme of a connection string picks the implementation:
//!
//! | Scheme | Entity store | Message queue |
//! |--------|--------------|---------------|
//! | `postgres://`, `postgresql://` | [`PgEntityStore`] | [`PgMessageQueue`] |
//! | `memory:` | [`MemoryEntityStore`] | [`MemoryMessageQueue`] |
//!
//! When the store and queue strings are the same `PostgreSQL` URL, both share
//! one connection pool.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use crate::config::FunctionsConfig;
use crate::queue::{MemoryMessageQueue, MessageQueue, PgMessageQueue};
use crate::store::{EntityStore, MemoryEntityStore, PgEntityStore};

/// Errors selecting or connecting a backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("unsupported connection string scheme (expected postgres:// or memory:)")]
    UnsupportedScheme,
    #[error("failed to connect: {0}")]
    Connect(#[from] sqlx::Error),
}

/// Which implementation a connection string selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Postgres,
    Memory,
}

impl BackendKind {
    /// Detect the backend from a connection string's scheme.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::UnsupportedScheme` for anything else.
    pub fn detect(connection: &str) -> Result<Self, BackendError> {
        let connection = connection.trim();
        if connection.starts_with("postgres://") || connection.starts_with("postgresql://") {
            Ok(Self::Postgres)
        } else if connection.starts_with("memory:") {
            Ok(Self::Memory)
        } else {
            Err(BackendError::UnsupportedScheme)
        }
    }
}

/// Create a `PostgreSQL` connection pool.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &SecretString,
    acquire_timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(acquire_timeout)
        .connect(database_url.expose_secret())
        .await
}

/// Store and queue handles built from configuration.
pub struct Backends {
    pub store: Arc<dyn EntityStore>,
    pub queue: Arc<dyn MessageQueue>,
}

/// Connect the store and queue named by `config`.
///
/// # Errors
///
/// Returns `BackendError` if a connection string is unsupported or the
/// database is unreachable.
pub async fn connect(config: &FunctionsConfig) -> Result<Backends, BackendError> {
    let storage = config.storage_connection.expose_secret();
    let queue_url = config.queue_connection.expose_secret();

    let mut storage_pool = None;
    let store: Arc<dyn EntityStore> = match BackendKind::detect(storage)? {
        BackendKind::Memory => Arc::new(MemoryEntityStore::new()),
        BackendKind::Postgres => {
            let pool = create_pool(&config.storage_connection, Duration::from_secs(10)).await?;
            tracing::info!("entity store pool created");
            storage_pool = Some(pool.clone());
            Arc::new(PgEntityStore::new(pool))
        }
    };

    let queue: Arc<dyn MessageQueue> = match BackendKind::detect(queue_url)? {
        BackendKind::Memory => Arc::new(MemoryMessageQueue::new(config.queue_name.clone())),
        BackendKind::Postgres => {
            let pool = match storage_pool {
                Some(pool) if queue_url.trim() == storage.trim() => pool,
                _ => {
                    let pool =
                        create_pool(&config.queue_connection, Duration::from_secs(10)).await?;
                    tracing::info!("queue pool created");
                    pool
                }
            };
            Arc::new(PgMessageQueue::new(pool, config.queue_name.clone()))
        }
    };

    Ok(Backends { store, queue })
}
