//! Conversation history repository
//!
//! Each user owns one append-only log of turns. The log is created by the
//! first append for that user and is never deleted here.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};

use super::DbPool;
use crate::{Error, Result};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Bot,
}

impl Speaker {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "bot" => Some(Self::Bot),
            _ => None,
        }
    }
}

/// One utterance in a conversation
///
/// Serialized as a single-key object: `{"user": "hi"}` or `{"bot": "hello"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Turn {
    User(String),
    Bot(String),
}

impl Turn {
    /// A turn spoken by the user
    pub fn user(text: impl Into<String>) -> Self {
        Self::User(text.into())
    }

    /// A turn spoken by the bot
    pub fn bot(text: impl Into<String>) -> Self {
        Self::Bot(text.into())
    }

    fn from_parts(speaker: Speaker, text: String) -> Self {
        match speaker {
            Speaker::User => Self::User(text),
            Speaker::Bot => Self::Bot(text),
        }
    }

    #[must_use]
    pub const fn speaker(&self) -> Speaker {
        match self {
            Self::User(_) => Speaker::User,
            Self::Bot(_) => Speaker::Bot,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::User(text) | Self::Bot(text) => text,
        }
    }
}

/// A user's full conversation log
#[derive(Debug, Clone, Serialize)]
pub struct ConversationLog {
    pub user_id: String,
    pub turns: Vec<Turn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationLog {
    /// The last `size` turns in chronological order
    #[must_use]
    pub fn window(&self, size: usize) -> &[Turn] {
        crate::context::window(&self.turns, size)
    }
}

/// Summary row for listing logs
#[derive(Debug, Clone, Serialize)]
pub struct LogSummary {
    pub user_id: String,
    pub turn_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a successful append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    /// The log did not exist before this append
    pub created: bool,
    /// Number of turns written
    pub appended: usize,
}

impl AppendOutcome {
    /// Whether the append changed the store at all
    #[must_use]
    pub const fn changed(self) -> bool {
        self.created || self.appended > 0
    }
}

/// Conversation history repository
#[derive(Clone)]
pub struct HistoryRepo {
    pool: DbPool,
}

impl HistoryRepo {
    /// Create a new history repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Append turns to a user's log, creating the log if needed
    ///
    /// Returns `true` when the store changed. Any database failure is logged
    /// and reported as `false`; the caller should treat that as "not durably
    /// saved" and carry on.
    pub fn append_turns(&self, user_id: &str, turns: &[Turn]) -> bool {
        match self.try_append_turns(user_id, turns) {
            Ok(outcome) if outcome.changed() => {
                tracing::info!(
                    user_id,
                    appended = outcome.appended,
                    created = outcome.created,
                    "message history updated"
                );
                true
            }
            Ok(_) => {
                tracing::warn!(user_id, "no changes made to message history");
                false
            }
            Err(e) => {
                tracing::error!(user_id, error = %e, "failed to save message history");
                false
            }
        }
    }

    /// Append turns to a user's log in one transaction
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn try_append_turns(&self, user_id: &str, turns: &[Turn]) -> Result<AppendOutcome> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let now = Utc::now().to_rfc3339();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let created = tx.execute(
            "INSERT INTO message_history (user_id, created_at, updated_at)
             VALUES (?1, ?2, ?2)
             ON CONFLICT(user_id) DO NOTHING",
            [user_id, &now],
        )? == 1;

        let next: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM message_turns WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO message_turns (user_id, position, speaker, text, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;

            for (offset, turn) in turns.iter().enumerate() {
                #[allow(clippy::cast_possible_wrap)]
                let position = next + offset as i64;
                stmt.execute(rusqlite::params![
                    user_id,
                    position,
                    turn.speaker().as_str(),
                    turn.text(),
                    &now
                ])?;
            }
        }

        if !turns.is_empty() {
            tx.execute(
                "UPDATE message_history SET updated_at = ?1 WHERE user_id = ?2",
                [&now, user_id],
            )?;
        }

        tx.commit()?;

        Ok(AppendOutcome {
            created,
            appended: turns.len(),
        })
    }

    /// Fetch a user's full log, `None` if the user has never been saved
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn fetch_log(&self, user_id: &str) -> Result<Option<ConversationLog>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let header: Option<(String, String)> = conn
            .query_row(
                "SELECT created_at, updated_at FROM message_history WHERE user_id = ?1",
                [user_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((created_at, updated_at)) = header else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT speaker, text FROM message_turns
             WHERE user_id = ?1 ORDER BY position ASC",
        )?;

        let turns = stmt
            .query_map([user_id], row_to_turn)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(ConversationLog {
            user_id: user_id.to_string(),
            turns,
            created_at: parse_datetime(&created_at),
            updated_at: parse_datetime(&updated_at),
        }))
    }

    /// The last `size` turns of a user's log in chronological order
    ///
    /// An unknown user yields an empty window.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn window(&self, user_id: &str, size: usize) -> Result<Vec<Turn>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn.prepare(
            "SELECT speaker, text FROM message_turns
             WHERE user_id = ?1 ORDER BY position DESC LIMIT ?2",
        )?;

        #[allow(clippy::cast_possible_wrap)]
        let mut turns = stmt
            .query_map(rusqlite::params![user_id, size as i64], row_to_turn)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        // Reverse to get chronological order
        turns.reverse();
        Ok(turns)
    }

    /// Whether a log exists for the user, even an empty one
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn exists(&self, user_id: &str) -> Result<bool> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let found = conn
            .query_row(
                "SELECT 1 FROM message_history WHERE user_id = ?1",
                [user_id],
                |_| Ok(()),
            )
            .optional()?;

        Ok(found.is_some())
    }

    /// Count turns in a user's log
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn turn_count(&self, user_id: &str) -> Result<usize> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM message_turns WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;

        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// List logs, most recently updated first
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list_logs(&self, limit: usize) -> Result<Vec<LogSummary>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn.prepare(
            "SELECT h.user_id, COUNT(t.position), h.created_at, h.updated_at
             FROM message_history h
             LEFT JOIN message_turns t ON t.user_id = h.user_id
             GROUP BY h.user_id
             ORDER BY h.updated_at DESC
             LIMIT ?1",
        )?;

        #[allow(clippy::cast_possible_wrap)]
        let logs = stmt
            .query_map([limit as i64], |row| {
                Ok(LogSummary {
                    user_id: row.get(0)?,
                    turn_count: usize::try_from(row.get::<_, i64>(1)?).unwrap_or(0),
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                    updated_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(logs)
    }
}

fn row_to_turn(row: &rusqlite::Row<'_>) -> rusqlite::Result<Turn> {
    let speaker = Speaker::from_str(&row.get::<_, String>(0)?).unwrap_or(Speaker::User);
    Ok(Turn::from_parts(speaker, row.get(1)?))
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    fn setup() -> HistoryRepo {
        HistoryRepo::new(init_memory().unwrap())
    }

    fn numbered(count: usize) -> Vec<Turn> {
        (1..=count)
            .map(|i| {
                if i % 2 == 1 {
                    Turn::user(format!("turn {i}"))
                } else {
                    Turn::bot(format!("turn {i}"))
                }
            })
            .collect()
    }

    #[test]
    fn test_turn_serializes_as_tagged_object() {
        let json = serde_json::to_string(&vec![Turn::user("hi"), Turn::bot("hello")]).unwrap();
        assert_eq!(json, r#"[{"user":"hi"},{"bot":"hello"}]"#);

        let back: Vec<Turn> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[1].speaker(), Speaker::Bot);
    }

    #[test]
    fn test_missing_log_is_none() {
        let repo = setup();
        assert!(repo.fetch_log("nobody").unwrap().is_none());
        assert!(repo.window("nobody", 5).unwrap().is_empty());
        assert_eq!(repo.turn_count("nobody").unwrap(), 0);
    }

    #[test]
    fn test_first_append_creates_log() {
        let repo = setup();

        let outcome = repo
            .try_append_turns("42", &[Turn::user("hi"), Turn::bot("hello")])
            .unwrap();
        assert!(outcome.created);
        assert_eq!(outcome.appended, 2);

        let log = repo.fetch_log("42").unwrap().unwrap();
        assert_eq!(log.user_id, "42");
        assert_eq!(log.turns, vec![Turn::user("hi"), Turn::bot("hello")]);
    }

    #[test]
    fn test_append_is_monotonic() {
        let repo = setup();
        assert!(repo.append_turns("42", &[Turn::user("hi"), Turn::bot("hello")]));

        let before = repo.fetch_log("42").unwrap().unwrap().turns;
        assert!(repo.append_turns("42", &[Turn::user("bye"), Turn::bot("see you")]));
        let after = repo.fetch_log("42").unwrap().unwrap().turns;

        assert_eq!(after.len(), before.len() + 2);
        assert_eq!(&after[..before.len()], before.as_slice());
        assert_eq!(&after[before.len()..], &[Turn::user("bye"), Turn::bot("see you")]);
    }

    #[test]
    fn test_logs_are_per_user() {
        let repo = setup();
        repo.append_turns("a", &[Turn::user("from a")]);
        repo.append_turns("b", &[Turn::user("from b")]);

        assert_eq!(repo.window("a", 5).unwrap(), vec![Turn::user("from a")]);
        assert_eq!(repo.window("b", 5).unwrap(), vec![Turn::user("from b")]);
    }

    #[test]
    fn test_window_short_log_returns_all() {
        let repo = setup();
        let turns = vec![Turn::user("hi"), Turn::bot("hello"), Turn::user("bye")];
        repo.append_turns("42", &turns);

        assert_eq!(repo.window("42", 5).unwrap(), turns);
    }

    #[test]
    fn test_window_long_log_returns_suffix() {
        let repo = setup();
        let turns = numbered(7);
        repo.append_turns("42", &turns);

        let window = repo.window("42", 5).unwrap();
        assert_eq!(window, turns[2..].to_vec());
        assert_eq!(window[0].text(), "turn 3");
        assert_eq!(window[4].text(), "turn 7");
    }

    #[test]
    fn test_window_spans_appends() {
        let repo = setup();
        repo.append_turns("42", &numbered(4));
        repo.append_turns("42", &[Turn::user("five"), Turn::bot("six")]);

        let window = repo.window("42", 3).unwrap();
        assert_eq!(
            window,
            vec![Turn::bot("turn 4"), Turn::user("five"), Turn::bot("six")]
        );
    }

    #[test]
    fn test_empty_append_on_existing_log_reports_no_change() {
        let repo = setup();
        assert!(repo.append_turns("42", &[Turn::user("hi")]));
        assert!(!repo.append_turns("42", &[]));
        assert_eq!(repo.turn_count("42").unwrap(), 1);
    }

    #[test]
    fn test_empty_append_creates_empty_log() {
        let repo = setup();
        assert!(!repo.exists("new").unwrap());
        assert!(repo.append_turns("new", &[]));
        assert!(repo.exists("new").unwrap());

        let log = repo.fetch_log("new").unwrap().unwrap();
        assert!(log.turns.is_empty());
    }

    #[test]
    fn test_append_failure_returns_false() {
        let pool = init_memory().unwrap();
        pool.get()
            .unwrap()
            .execute_batch("DROP TABLE message_turns")
            .unwrap();

        let repo = HistoryRepo::new(pool);
        assert!(!repo.append_turns("42", &[Turn::user("hi")]));
        // The whole append rolled back
        assert!(repo.fetch_log("42").unwrap().is_none());
    }

    #[test]
    fn test_list_logs() {
        let repo = setup();
        repo.append_turns("a", &numbered(3));
        repo.append_turns("b", &numbered(2));

        let logs = repo.list_logs(10).unwrap();
        assert_eq!(logs.len(), 2);

        let a = logs.iter().find(|l| l.user_id == "a").unwrap();
        assert_eq!(a.turn_count, 3);
    }

    #[test]
    fn test_log_window_method() {
        let repo = setup();
        repo.append_turns("42", &numbered(7));

        let log = repo.fetch_log("42").unwrap().unwrap();
        assert_eq!(log.window(5), &log.turns[2..]);
    }
}
