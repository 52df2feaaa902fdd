//! SQLite file holding the persisted dashboard slots.
//!
//! # Responsibility
//! - Open file or in-memory connections with the `kv_slots` table in place.
//! - Stamp and check the slot schema version in `PRAGMA user_version`.
//!
//! # Invariants
//! - A returned connection always has `kv_slots`, even when the file was
//!   stamped with the current version but lost the table.
//! - Files stamped with a newer version are refused, never rewritten.

use log::{error, info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Slot schema version written to `PRAGMA user_version`.
pub const SCHEMA_VERSION: u32 = 1;

const KV_SLOTS_DDL: &str = "CREATE TABLE IF NOT EXISTS kv_slots (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now') * 1000)
);";

pub type SlotDbResult<T> = Result<T, SlotDbError>;

/// Failure to open or prepare the slot database.
#[derive(Debug)]
pub enum SlotDbError {
    Sqlite(rusqlite::Error),
    /// The directory for the database file could not be created.
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The file was written by a newer client.
    SchemaTooNew { found: u32, supported: u32 },
}

impl Display for SlotDbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::CreateDir { path, source } => {
                write!(f, "cannot create `{}`: {source}", path.display())
            }
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "slot database version {found} is newer than supported {supported}"
            ),
        }
    }
}

impl Error for SlotDbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::CreateDir { source, .. } => Some(source),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for SlotDbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Opens (or creates) the slot database at `path`.
///
/// Missing parent directories are created.
pub fn open_slot_db(path: impl AsRef<Path>) -> SlotDbResult<Connection> {
    let path = path.as_ref();
    traced_open("file", || {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| SlotDbError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Ok(Connection::open(path)?)
    })
}

/// Opens a private in-memory slot database.
pub fn open_slot_db_in_memory() -> SlotDbResult<Connection> {
    traced_open("memory", || Ok(Connection::open_in_memory()?))
}

fn traced_open<F>(mode: &'static str, connect: F) -> SlotDbResult<Connection>
where
    F: FnOnce() -> SlotDbResult<Connection>,
{
    let started_at = Instant::now();
    let result = connect().and_then(|mut conn| {
        conn.busy_timeout(Duration::from_secs(5))?;
        ensure_schema(&mut conn)?;
        Ok(conn)
    });

    match &result {
        Ok(_) => info!(
            "event=slot_db_open module=store status=ok mode={mode} duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=slot_db_open module=store status=error mode={mode} duration_ms={} error={err}",
            started_at.elapsed().as_millis()
        ),
    }
    result
}

/// Creates `kv_slots` when missing and stamps [`SCHEMA_VERSION`].
pub fn ensure_schema(conn: &mut Connection) -> SlotDbResult<()> {
    let found = schema_version(conn)?;
    if found > SCHEMA_VERSION {
        return Err(SlotDbError::SchemaTooNew {
            found,
            supported: SCHEMA_VERSION,
        });
    }

    let tx = conn.transaction()?;
    tx.execute_batch(KV_SLOTS_DDL)?;
    if found < SCHEMA_VERSION {
        tx.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    }
    tx.commit()?;

    if found == 0 {
        info!("event=slot_db_schema module=store status=created version={SCHEMA_VERSION}");
    } else if found < SCHEMA_VERSION {
        warn!("event=slot_db_schema module=store status=upgraded from={found} to={SCHEMA_VERSION}");
    }
    Ok(())
}

/// Reads the version stamp of `conn`; `0` for a fresh file.
pub fn schema_version(conn: &Connection) -> SlotDbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}
