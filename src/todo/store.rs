use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::data::DBConnection;
use crate::internal_error::{InternalError, InternalResult};

use super::data::{Snapshot, UserToken};

/// Whole-document persistence keyed by user token. There are no partial
/// updates: every save replaces the stored snapshot.
pub trait TaskStore: Send + Sync {
    /// `InternalError::NotFound` when nothing was ever saved for `token`.
    fn load_all(&self, token: &UserToken) -> InternalResult<Snapshot>;

    fn save_all(&self, token: &UserToken, snapshot: &Snapshot) -> InternalResult<()>;
}

pub struct SqliteStore {
    db_connection: DBConnection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> InternalResult<SqliteStore> {
        SqliteStore::new(Connection::open(path)?)
    }

    #[cfg(test)]
    pub fn in_memory() -> InternalResult<SqliteStore> {
        SqliteStore::new(Connection::open_in_memory()?)
    }

    fn new(connection: Connection) -> InternalResult<SqliteStore> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS documents (user_token TEXT PRIMARY KEY, body TEXT NOT NULL, updated_at TEXT NOT NULL)",
            params![],
        )?;

        Ok(SqliteStore {
            db_connection: Arc::new(Mutex::new(connection)),
        })
    }
}

impl TaskStore for SqliteStore {
    fn load_all(&self, token: &UserToken) -> InternalResult<Snapshot> {
        let db_connection = self.db_connection.lock()?;

        let body: Option<String> = db_connection
            .query_row(
                "SELECT body FROM documents WHERE user_token = (?1)",
                params![token.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match body {
            Some(body) => Ok(serde_json::from_str(&body)?),
            None => Err(InternalError::NotFound),
        }
    }

    fn save_all(&self, token: &UserToken, snapshot: &Snapshot) -> InternalResult<()> {
        let body = serde_json::to_string(snapshot)?;
        let db_connection = self.db_connection.lock()?;

        db_connection.execute(
            "INSERT INTO documents (user_token, body, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_token) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
            params![token.as_str(), body, Utc::now().to_rfc3339()],
        )?;

        tracing::debug!(%token, bytes = body.len(), "document saved");
        Ok(())
    }
}
