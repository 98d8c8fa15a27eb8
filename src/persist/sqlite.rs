//! SQLite session backend
//!
//! `session_index` is the index record, `session_records` holds one JSON
//! body per session.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

use super::{IndexEntry, PersistError, SessionBackend};
use crate::combat::CombatSession;

/// Session storage with database backing
#[derive(Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Create a new backend with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionBackend for SqliteBackend {
    async fn load_index(&self) -> Result<Vec<IndexEntry>, PersistError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT id, file FROM session_index ORDER BY updated_at, id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, file)| IndexEntry { id, file })
            .collect())
    }

    async fn load_session(&self, file: &str) -> Result<Option<CombatSession>, PersistError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT body FROM session_records WHERE file = ?")
                .bind(file)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((body,)) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    async fn save_session(&self, session: &CombatSession) -> Result<(), PersistError> {
        let entry = IndexEntry::for_session(&session.id);
        let body = serde_json::to_string(session)?;
        let updated_at = chrono::Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO session_records (file, body, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(file) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
            "#,
        )
        .bind(&entry.file)
        .bind(&body)
        .bind(&updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO session_index (id, file, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET file = excluded.file, updated_at = excluded.updated_at
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.file)
        .bind(&updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!("Saved session {} ({} bytes)", session.id, body.len());
        Ok(())
    }

    async fn delete_session(&self, id: &str) -> Result<(), PersistError> {
        let mut tx = self.pool.begin().await?;

        let file: Option<(String,)> = sqlx::query_as("SELECT file FROM session_index WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let file = file.map(|(f,)| f).unwrap_or_else(|| super::record_file(id));

        sqlx::query("DELETE FROM session_records WHERE file = ?")
            .bind(&file)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM session_index WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!("Deleted session {}", id);
        Ok(())
    }
}
