//! CLI subcommands.

pub mod migrate;
pub mod queue;

use order_desk_functions::config::DEFAULT_QUEUE_NAME;
use secrecy::SecretString;

/// Connection settings shared by the subcommands.
///
/// Read from the same variables as the functions host, without requiring the
/// function key.
pub struct Connections {
    pub storage: SecretString,
    pub queue: SecretString,
    pub queue_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid connection string in {0}: {1}")]
    InvalidConnection(&'static str, String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Queue error: {0}")]
    Queue(#[from] order_desk_functions::queue::QueueError),
}

impl Connections {
    pub fn from_env() -> Result<Self, CommandError> {
        dotenvy::dotenv().ok();

        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        let storage = var("STORAGE_CONNECTION_STRING")
            .or_else(|| var("AzureWebJobsStorage"))
            .ok_or(CommandError::MissingEnvVar("STORAGE_CONNECTION_STRING"))?;
        let queue = var("QUEUE_CONNECTION_STRING").unwrap_or_else(|| storage.clone());

        Ok(Self {
            storage: SecretString::from(storage),
            queue: SecretString::from(queue),
            queue_name: var("ORDERS_QUEUE_NAME").unwrap_or_else(|| DEFAULT_QUEUE_NAME.to_string()),
        })
    }
}
