//! Database module for user records and conversation history

pub mod history;
mod schema;
pub mod user;

use std::path::Path;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::StoreConfig;
use crate::{Error, Result};

pub use history::{AppendOutcome, ConversationLog, HistoryRepo, LogSummary, Speaker, Turn};
pub use schema::SCHEMA_VERSION;
pub use user::{User, UserRepo};

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Pooled database connection
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Initialize the database
///
/// # Errors
///
/// Returns error if database cannot be opened or initialized
pub fn init<P: AsRef<Path>>(path: P) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(path)
        .with_init(|conn| conn.busy_timeout(std::time::Duration::from_secs(5)));
    let pool = Pool::builder()
        .max_size(4)
        .build(manager)
        .map_err(|e| Error::Database(e.to_string()))?;

    // Run migrations on first connection
    let conn = pool.get().map_err(|e| Error::Database(e.to_string()))?;
    schema::init(&conn)?;

    tracing::info!(version = SCHEMA_VERSION, "database initialized");
    Ok(pool)
}

/// Initialize an in-memory database (for testing)
///
/// # Errors
///
/// Returns error if database cannot be initialized
pub fn init_memory() -> Result<DbPool> {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder()
        .max_size(1)
        .build(manager)
        .map_err(|e| Error::Database(e.to_string()))?;

    let conn = pool.get().map_err(|e| Error::Database(e.to_string()))?;
    schema::init(&conn)?;

    Ok(pool)
}

/// Open the store described by a connection string and database name
///
/// # Errors
///
/// Returns error if the database directory cannot be created or the
/// database cannot be initialized
pub fn open(store: &StoreConfig) -> Result<DbPool> {
    let Some(path) = store.database_path() else {
        tracing::info!("using in-memory conversation store");
        return init_memory();
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::debug!(path = %path.display(), "opening conversation store");
    init(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_memory() {
        let pool = init_memory().unwrap();
        let _conn = pool.get().unwrap();
    }

    #[test]
    fn test_open_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = StoreConfig {
            url: dir.path().join("nested").to_string_lossy().into_owned(),
            name: "chat".to_string(),
        };

        let pool = open(&store).unwrap();
        drop(pool);

        assert!(dir.path().join("nested").join("chat.db").exists());
    }

    #[test]
    fn test_open_memory() {
        let store = StoreConfig {
            url: crate::config::MEMORY_STORE_URL.to_string(),
            name: "ignored".to_string(),
        };
        assert!(open(&store).is_ok());
    }
}
