//! Server side storage for session data, keyed by the session ID in the cookie.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tokio::time::MissedTickBehavior;

use crate::{Error, user::UserID};

/// The data kept for a session between requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// The logged in user, `None` for anonymous sessions.
    pub user_id: Option<UserID>,
    /// When the session was last used, as an RFC 3339 timestamp.
    pub last_activity: Option<String>,
}

/// Reads and writes session data.
pub trait SessionStore: Clone + Send + Sync + 'static {
    /// Get the data for `session_id`, `None` if there is no such session.
    fn load(&self, session_id: &str) -> Result<Option<SessionData>, Error>;

    /// Create or replace the data for `session_id`.
    fn save(&self, session_id: &str, data: &SessionData) -> Result<(), Error>;

    /// Remove `session_id`. Removing a missing session is not an error.
    fn delete(&self, session_id: &str) -> Result<(), Error>;
}

/// Create the table for [SqliteSessionStore].
pub fn create_session_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS session (
            id TEXT PRIMARY KEY,
            data TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

/// Stores sessions as JSON in the application database.
#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    db_connection: Arc<Mutex<Connection>>,
}

impl SqliteSessionStore {
    pub fn new(db_connection: Arc<Mutex<Connection>>) -> Self {
        Self { db_connection }
    }

    fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let connection = self
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        f(&connection)
    }

    /// Delete the sessions that have not been saved since `cutoff`.
    ///
    /// Returns the number of sessions deleted.
    pub fn delete_stale_sessions(&self, cutoff: OffsetDateTime) -> Result<usize, Error> {
        self.with_connection(|connection| {
            connection
                .execute("DELETE FROM session WHERE updated_at < ?1", params![cutoff])
                .map_err(Error::from)
        })
    }

    /// Delete the sessions that have been idle for longer than `idle_timeout`
    /// once every `period`, starting straight away. Runs until the task is
    /// dropped or aborted.
    pub async fn sweep_stale_sessions(self, idle_timeout: Duration, period: std::time::Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            match self.delete_stale_sessions(OffsetDateTime::now_utc() - idle_timeout) {
                Ok(0) => {}
                Ok(count) => tracing::info!("Deleted {count} stale sessions."),
                Err(error) => tracing::error!("Could not delete stale sessions: {error}"),
            }
        }
    }
}

impl SessionStore for SqliteSessionStore {
    fn load(&self, session_id: &str) -> Result<Option<SessionData>, Error> {
        let raw_data: Option<String> = self.with_connection(|connection| {
            connection
                .query_row(
                    "SELECT data FROM session WHERE id = ?1",
                    params![session_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(Error::from)
        })?;

        raw_data
            .map(|raw_data| {
                serde_json::from_str(&raw_data)
                    .map_err(|error| Error::SessionDataError(error.to_string()))
            })
            .transpose()
    }

    fn save(&self, session_id: &str, data: &SessionData) -> Result<(), Error> {
        let raw_data =
            serde_json::to_string(data).map_err(|error| Error::SessionDataError(error.to_string()))?;

        self.with_connection(|connection| {
            connection.execute(
                "INSERT INTO session (id, data, updated_at) VALUES (?1, ?2, ?3)
                ON CONFLICT(id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
                params![session_id, raw_data, OffsetDateTime::now_utc()],
            )?;

            Ok(())
        })
    }

    fn delete(&self, session_id: &str) -> Result<(), Error> {
        self.with_connection(|connection| {
            connection.execute("DELETE FROM session WHERE id = ?1", params![session_id])?;

            Ok(())
        })
    }
}

#[cfg(test)]
pub(crate) use memory::MemorySessionStore;
