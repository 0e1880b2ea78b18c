/// Database layer for Simple Skins
///
/// Manages the SQLite connection pool backing the persisted user skins.

use crate::error::{SkinError, SkinResult};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;

/// Database connection options
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub enable_wal: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            enable_wal: true,
        }
    }
}

/// Create a SQLite connection pool
pub async fn create_pool(path: &Path, options: DatabaseOptions) -> SkinResult<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(if options.enable_wal {
                    SqliteJournalMode::Wal
                } else {
                    SqliteJournalMode::Delete
                })
                .busy_timeout(Duration::from_secs(5)),
        )
        .await
        .map_err(SkinError::Persistence)?;

    Ok(pool)
}

/// Create the users table if it does not exist yet
pub async fn init_schema(pool: &SqlitePool) -> SkinResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS Users (
            Name TEXT NOT NULL PRIMARY KEY,
            SkinUUID TEXT,
            SkinValue TEXT NOT NULL,
            SkinSignature TEXT NOT NULL,
            Timestamp INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(SkinError::Persistence)?;

    Ok(())
}

/// Test database connection
pub async fn test_connection(pool: &SqlitePool) -> SkinResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(SkinError::Persistence)?;

    Ok(())
}

/// Single-connection in-memory pool with the schema applied
#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    // One connection, otherwise every connection gets its own empty database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_schema(&pool).await.unwrap();
    pool
}
