//! User repository

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use serde::Serialize;

use super::DbPool;
use crate::{Error, Result};

/// A user seen by the bot
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User repository
#[derive(Clone)]
pub struct UserRepo {
    pool: DbPool,
}

impl UserRepo {
    /// Create a new user repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a user or refresh its display name
    ///
    /// A `None` display name keeps whatever name was stored before.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn upsert(&self, id: &str, display_name: Option<&str>) -> Result<User> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO users (id, display_name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(id) DO UPDATE SET
                display_name = COALESCE(excluded.display_name, users.display_name),
                updated_at = excluded.updated_at",
            rusqlite::params![id, display_name, &now],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        drop(conn);

        self.find(id)?
            .ok_or_else(|| Error::Database(format!("user {id} vanished after upsert")))
    }

    /// Find a user by ID (returns None if not found)
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find(&self, id: &str) -> Result<Option<User>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let user = conn
            .query_row(
                "SELECT id, display_name, created_at, updated_at FROM users WHERE id = ?1",
                [id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        display_name: row.get(1)?,
                        created_at: parse_datetime(&row.get::<_, String>(2)?),
                        updated_at: parse_datetime(&row.get::<_, String>(3)?),
                    })
                },
            )
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(user)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
