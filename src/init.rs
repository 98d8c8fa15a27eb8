//! Database initialization module
//!
//! Provides one-time database setup functionality for the encounterd_init tool.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use tracing::info;

use crate::db::Database;
use crate::persist::{SessionWriter, SqliteBackend};
use crate::store::SessionStore;

/// Initialize a new session database
///
/// # Arguments
/// * `path` - Path to the SQLite database file (must not exist)
/// * `session_names` - Empty sessions to create, in order
///
/// # Errors
/// * Database file already exists
/// * A session name is blank
/// * Database creation fails
pub async fn init_database(path: &Path, session_names: &[String]) -> Result<()> {
    // Fail if database already exists
    if path.exists() {
        bail!(
            "Database file already exists: {}. Remove it first or use a different path.",
            path.display()
        );
    }

    if session_names.iter().any(|name| name.trim().is_empty()) {
        bail!("Session names must not be blank");
    }

    info!("Creating new database at {}", path.display());

    // Create the database (runs migrations)
    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow!("Invalid database path: {}", path.display()))?;
    let db = Database::new(Some(path_str)).await?;

    if !session_names.is_empty() {
        let writer = SessionWriter::new(Arc::new(SqliteBackend::new(db.pool().clone())));
        let mut store = SessionStore::with_writer(writer.clone());
        for name in session_names {
            let session = store.create_session(name.trim(), None);
            info!("  {} -> {}", session.name, session.id);
        }
        writer.flush().await;
        info!("Created {} sessions", session_names.len());
    }

    info!("Database initialization complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_database_creates_new() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        init_database(&db_path, &["Goblin ambush".to_string(), "Dragon".to_string()])
            .await
            .unwrap();

        // Verify file was created
        assert!(db_path.exists());

        // Verify the sessions load back
        let db = Database::new(db_path.to_str()).await.unwrap();
        let writer = SessionWriter::new(Arc::new(SqliteBackend::new(db.pool().clone())));
        let store = SessionStore::load(writer).await.unwrap();
        let mut names: Vec<&str> = store.list().iter().map(|s| s.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["Dragon", "Goblin ambush"]);
    }

    #[tokio::test]
    async fn test_init_database_fails_if_exists() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        init_database(&db_path, &[]).await.unwrap();

        let result = init_database(&db_path, &[]).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_init_database_rejects_blank_session() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let result = init_database(&db_path, &["  ".to_string()]).await;
        assert!(result.is_err());
        assert!(!db_path.exists());
    }
}
