//! order-desk CLI - Database migrations and queue inspection.
//!
//! # Usage
//!
//! ```bash
//! # Create the entity and queue tables
//! order-desk migrate
//!
//! # Show up to 10 pending order notifications without removing them
//! order-desk queue peek --max 10
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `queue peek` - Print decoded order notifications

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use order_desk_functions::config::MAX_VISIBILITY_TIMEOUT_SECS;

mod commands;

#[derive(Parser)]
#[command(name = "order-desk")]
#[command(author, version, about = "order-desk operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations against the storage (and queue) database
    Migrate,
    /// Inspect the order notification queue
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },
}

#[derive(Subcommand)]
enum QueueAction {
    /// Print pending messages without deleting them
    Peek {
        /// Maximum number of messages to read (1-32)
        #[arg(short, long, default_value_t = 32, value_parser = clap::value_parser!(u32).range(1..=32))]
        max: u32,

        /// Seconds to hide the messages from other readers afterwards (0-604800)
        #[arg(
            long,
            default_value_t = 0,
            value_parser = clap::value_parser!(u64).range(0..=MAX_VISIBILITY_TIMEOUT_SECS)
        )]
        visibility_timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Queue { action } => match action {
            QueueAction::Peek {
                max,
                visibility_timeout_secs,
            } => {
                commands::queue::peek(max, std::time::Duration::from_secs(visibility_timeout_secs))
                    .await?;
            }
        },
    }
    Ok(())
}
