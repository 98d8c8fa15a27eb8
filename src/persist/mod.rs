//! Session persistence
//!
//! Provides:
//! - `SessionBackend`: the durable store port (one record per session plus an index)
//! - `SqliteBackend`: the SQLite implementation
//! - `SessionWriter`: fire-and-forget write-through with one ordered queue per session

mod sqlite;
mod writer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::combat::CombatSession;

pub use sqlite::SqliteBackend;
pub use writer::SessionWriter;

/// Index entry: enough to find a session body without loading it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub file: String,
}

impl IndexEntry {
    /// Index entry for a session id
    pub fn for_session(id: &str) -> Self {
        Self {
            id: id.to_string(),
            file: record_file(id),
        }
    }
}

/// Record name a session body is stored under
pub fn record_file(id: &str) -> String {
    format!("sessions/{}.json", id)
}

/// Persistence errors
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable session storage.
///
/// Saves always carry the entire session; there are no partial patches.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Enumerate known sessions without loading bodies
    async fn load_index(&self) -> Result<Vec<IndexEntry>, PersistError>;

    /// Load one session body by its record name
    async fn load_session(&self, file: &str) -> Result<Option<CombatSession>, PersistError>;

    /// Write the whole session and its index entry
    async fn save_session(&self, session: &CombatSession) -> Result<(), PersistError>;

    /// Remove the session body and its index entry
    async fn delete_session(&self, id: &str) -> Result<(), PersistError>;
}
