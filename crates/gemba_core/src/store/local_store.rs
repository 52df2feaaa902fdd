//! Key-value slot store for the dashboard document.
//!
//! # Responsibility
//! - Persist one JSON-serialized [`DashboardDocument`] under a named key.
//! - Fail soft on load: malformed or foreign-shaped data reads as absent.
//!
//! # Invariants
//! - `save` overwrites the entire stored value.
//! - Stored data must decode and pass `DashboardDocument::validate()`.

use crate::store::slot_db::{open_slot_db, open_slot_db_in_memory, SlotDbError};
use crate::model::document::{DashboardDocument, DocumentValidationError};
use log::{debug, info, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Default slot key for the dashboard document.
pub const DEFAULT_STORAGE_KEY: &str = "gemba_dashboard_data";

pub type LocalStoreResult<T> = Result<T, LocalStoreError>;

/// Errors raised by local slot reads and writes.
#[derive(Debug)]
pub enum LocalStoreError {
    Db(SlotDbError),
    Encode(serde_json::Error),
    Decode(serde_json::Error),
    Invalid(DocumentValidationError),
}

impl Display for LocalStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode dashboard document: {err}"),
            Self::Decode(err) => write!(f, "stored dashboard document is unreadable: {err}"),
            Self::Invalid(err) => write!(f, "stored dashboard document is invalid: {err}"),
        }
    }
}

impl Error for LocalStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encode(err) | Self::Decode(err) => Some(err),
            Self::Invalid(err) => Some(err),
        }
    }
}

impl From<SlotDbError> for LocalStoreError {
    fn from(value: SlotDbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for LocalStoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(SlotDbError::Sqlite(value))
    }
}

impl From<DocumentValidationError> for LocalStoreError {
    fn from(value: DocumentValidationError) -> Self {
        Self::Invalid(value)
    }
}

/// Durable slot holding the whole dashboard document.
pub trait LocalStore {
    /// Reads the slot. `Ok(None)` means nothing was stored yet.
    fn try_load(&self) -> LocalStoreResult<Option<DashboardDocument>>;

    /// Overwrites the slot with `document`.
    fn save(&self, document: &DashboardDocument) -> LocalStoreResult<()>;

    /// Fail-soft read: every error is logged and reported as absent.
    fn load(&self) -> Option<DashboardDocument> {
        match self.try_load() {
            Ok(document) => document,
            Err(err) => {
                warn!(
                    "event=local_load module=store status=fallback error_code=load_parse_error error={}",
                    err
                );
                None
            }
        }
    }
}

/// SQLite-backed [`LocalStore`] using the `kv_slots` table.
pub struct SqliteLocalStore {
    conn: Connection,
    key: String,
}

impl SqliteLocalStore {
    /// Wraps a connection prepared by [`ensure_schema`](crate::store::slot_db::ensure_schema).
    pub fn new(conn: Connection, key: impl Into<String>) -> Self {
        Self {
            conn,
            key: key.into(),
        }
    }

    /// Opens (or creates) a database file and binds the slot `key`.
    pub fn open(path: impl AsRef<Path>, key: impl Into<String>) -> LocalStoreResult<Self> {
        Ok(Self::new(open_slot_db(path)?, key))
    }

    /// Opens a throwaway in-memory database.
    pub fn open_in_memory(key: impl Into<String>) -> LocalStoreResult<Self> {
        Ok(Self::new(open_slot_db_in_memory()?, key))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Removes the stored document, if any.
    pub fn clear(&self) -> LocalStoreResult<()> {
        self.conn
            .execute("DELETE FROM kv_slots WHERE key = ?1;", params![self.key])?;
        info!("event=local_clear module=store status=ok");
        Ok(())
    }

    /// Raw slot access for diagnostics and tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl LocalStore for SqliteLocalStore {
    fn try_load(&self) -> LocalStoreResult<Option<DashboardDocument>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv_slots WHERE key = ?1;",
                params![self.key],
                |row| row.get(0),
            )
            .optional()?;

        let Some(raw) = raw else {
            debug!("event=local_load module=store status=empty");
            return Ok(None);
        };

        let document: DashboardDocument =
            serde_json::from_str(&raw).map_err(LocalStoreError::Decode)?;
        document.validate()?;
        debug!(
            "event=local_load module=store status=ok bytes={}",
            raw.len()
        );
        Ok(Some(document))
    }

    fn save(&self, document: &DashboardDocument) -> LocalStoreResult<()> {
        let raw = serde_json::to_string(document).map_err(LocalStoreError::Encode)?;
        self.conn.execute(
            "INSERT INTO kv_slots (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![self.key, raw],
        )?;
        debug!(
            "event=local_save module=store status=ok bytes={}",
            raw.len()
        );
        Ok(())
    }
}
