//! encounterd_init - One-time database initialization tool
//!
//! Creates a fresh session database, optionally seeded with empty sessions.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Encounter tracker database initialization tool
#[derive(Parser, Debug)]
#[command(
    name = "encounterd_init",
    version,
    about = "Initialize a new encounterd database"
)]
struct Args {
    /// Path to SQLite database file to create (must not exist)
    #[arg(short, long)]
    database: PathBuf,

    /// Empty session to create (can be specified multiple times)
    #[arg(long = "session")]
    sessions: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "encounterd=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse CLI arguments
    let args = Args::parse();

    encounterd::init::init_database(&args.database, &args.sessions).await?;

    Ok(())
}
