//! Shared test utilities for database-backed persistence
//!
//! Creates an in-memory database with the full schema so tests run
//! against the same tables as production.

use std::sync::Arc;

use sqlx::SqlitePool;

use super::Database;
use crate::persist::SqliteBackend;

/// Create an in-memory test database pool with full schema
pub async fn test_pool() -> SqlitePool {
    let db = Database::new(None)
        .await
        .expect("Failed to create test database");
    db.pool().clone()
}

/// Create a session backend over a fresh in-memory database
pub async fn test_backend() -> Arc<SqliteBackend> {
    Arc::new(SqliteBackend::new(test_pool().await))
}
