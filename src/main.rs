//! encounterd - encounter tracker daemon

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use encounterd::{Config, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Encounter tracker daemon
#[derive(Parser, Debug)]
#[command(name = "encounterd", version, about = "Run the encounter tracker server")]
struct Args {
    /// TOML config file (defaults to ./encounterd.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "encounterd=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;

    let server = std::sync::Arc::new(Server::new(config).await?);

    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received interrupt, shutting down");
            signal_server.shutdown();
        }
    });

    server.run().await?;

    Ok(())
}
