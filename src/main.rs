//! Book exchange daemon.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use book_exchange::{
    api::{self, ApiState},
    config::ServiceConfig,
};

/// Exchange request service for the book marketplace.
#[derive(Parser)]
#[command(name = "book-exchange", about = "Book exchange request service")]
struct Cli {
    /// Address to bind the API server.
    #[arg(long, default_value = "127.0.0.1:8081", env = "BOOK_EXCHANGE_BIND")]
    bind: String,

    /// Data directory for the sled database.
    #[arg(long, env = "BOOK_EXCHANGE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Refuse duplicate pending requests for the same book.
    #[arg(long, env = "BOOK_EXCHANGE_REJECT_DUPLICATES")]
    reject_duplicates: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "book_exchange=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match cli.data_dir {
        Some(dir) => ServiceConfig::new(dir),
        None => ServiceConfig::default(),
    }
    .with_reject_duplicate_pending(cli.reject_duplicates);

    tracing::info!(
        data_dir = %config.data_dir.display(),
        reject_duplicates = config.reject_duplicate_pending,
        "Starting book exchange service"
    );

    let state = ApiState::open(config).context("Failed to open exchange database")?;
    api::serve(Arc::new(state), &cli.bind).await?;

    Ok(())
}
