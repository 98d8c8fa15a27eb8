//! encounterd - encounter tracker daemon
//!
//! Keeps tabletop combat sessions (rosters, grouping, initiative order and
//! the round/turn state machine) in memory and writes every change through
//! to SQLite in the background.

pub mod api;
pub mod combat;
pub mod db;
pub mod init;
pub mod persist;
pub mod reference;
pub mod store;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::{watch, RwLock};
use tracing::info;

use db::Database;
use persist::{SessionWriter, SqliteBackend};
use reference::{Offline, ReferenceLookup, StaticCatalog};
use store::SessionStore;

/// Config file read when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "encounterd.toml";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// None = in-memory
    pub db_path: Option<String>,
    /// JSON array of creature records used to resolve references
    pub bestiary_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            db_path: None,
            bestiary_path: None,
        }
    }
}

impl Config {
    /// Layer defaults, then the TOML file, then `ENCOUNTERD_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed("ENCOUNTERD_"))
            .extract()?;
        Ok(config)
    }
}

/// The encounterd server instance
pub struct Server {
    config: Config,
    db: Arc<Database>,
    store: Arc<RwLock<SessionStore>>,
    writer: SessionWriter,
    lookup: Arc<dyn ReferenceLookup>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Server {
    /// Create a new server instance, loading every stored session
    pub async fn new(config: Config) -> Result<Self> {
        let db = Database::new(config.db_path.as_deref()).await?;
        let backend = Arc::new(SqliteBackend::new(db.pool().clone()));
        let writer = SessionWriter::new(backend);
        let store = SessionStore::load(writer.clone()).await?;

        let lookup: Arc<dyn ReferenceLookup> = match config.bestiary_path {
            Some(ref path) => Arc::new(StaticCatalog::load(path)?),
            None => Arc::new(Offline),
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            db: Arc::new(db),
            store: Arc::new(RwLock::new(store)),
            writer,
            lookup,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Get the database handle
    pub fn db(&self) -> Arc<Database> {
        self.db.clone()
    }

    /// Get the session store
    pub fn store(&self) -> Arc<RwLock<SessionStore>> {
        self.store.clone()
    }

    /// Build the router
    fn router(&self) -> Router {
        api::router(api::AppState {
            db: self.db.clone(),
            store: self.store.clone(),
            lookup: self.lookup.clone(),
        })
    }

    /// Run the server until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("encounterd listening on {}", local_addr);

        let router = self.router();
        let mut shutdown_rx = self.shutdown_rx.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_rx.changed().await.ok();
            })
            .await?;

        self.writer.flush().await;
        info!("encounterd shutdown complete");
        Ok(())
    }

    /// Wait until every queued session write has landed
    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    /// Signal the server to shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}
