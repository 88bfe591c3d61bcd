//! Database migration command.
//!
//! Runs `crates/functions/migrations/` against every distinct `PostgreSQL`
//! database named by `STORAGE_CONNECTION_STRING` and `QUEUE_CONNECTION_STRING`.
//! In-memory backends need no migrations.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use order_desk_functions::backend::{BackendKind, create_pool};

use super::{CommandError, Connections};

/// Run the functions migrations.
pub async fn run() -> Result<(), CommandError> {
    let connections = Connections::from_env()?;

    migrate("STORAGE_CONNECTION_STRING", &connections.storage).await?;
    if connections.queue.expose_secret() != connections.storage.expose_secret() {
        migrate("QUEUE_CONNECTION_STRING", &connections.queue).await?;
    }

    Ok(())
}

async fn migrate(var: &'static str, url: &SecretString) -> Result<(), CommandError> {
    let kind = BackendKind::detect(url.expose_secret())
        .map_err(|e| CommandError::InvalidConnection(var, e.to_string()))?;

    if kind == BackendKind::Memory {
        tracing::info!("{var} is in-memory, nothing to migrate");
        return Ok(());
    }

    tracing::info!("Connecting to database from {var}...");
    let pool = create_pool(url, Duration::from_secs(10)).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../functions/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
