//! # Relational Store
//!
//! SQLite persistence for templates, fields, batches, records and their field
//! values. A single connection is opened at startup and shared behind a mutex;
//! the store handle is cloned into every component that needs it instead of
//! each call opening the database file on its own.
//!
//! ## Sub-modules:
//! - `templates`: the template registry (templates and their ordered fields).
//! - `batches`: batch creation together with its records, summaries and the
//!   cascading delete.
//! - `records`: per-record reads, updates and delivery outcome writes.
//!
//! Tables are created idempotently by [`Store::open`]; there are no migrations.
//!
//! Store calls block on SQLite. Async code (the dispatch jobs) goes through
//! [`Store::run_blocking`] so the runtime's workers are not held up.

pub mod batches;
pub mod records;
pub mod templates;

use crate::error::{PipelineError, Result};
use rusqlite::{Connection, ErrorCode};
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS templates (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    name             TEXT NOT NULL UNIQUE,
    channel_template TEXT NOT NULL UNIQUE,
    preview_text     TEXT,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS fields (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    template_id INTEGER NOT NULL REFERENCES templates(id),
    name        TEXT NOT NULL,
    sequence    INTEGER NOT NULL,
    active      INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS fields_template_idx ON fields(template_id);

CREATE TABLE IF NOT EXISTS batches (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    template_id INTEGER NOT NULL REFERENCES templates(id),
    name        TEXT NOT NULL,
    kind        TEXT NOT NULL,
    description TEXT NOT NULL,
    source_md5  TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS records (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    batch_id   INTEGER NOT NULL REFERENCES batches(id),
    contact    TEXT NOT NULL,
    email      TEXT,
    outcome    TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS records_batch_idx ON records(batch_id);

CREATE TABLE IF NOT EXISTS field_values (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    record_id  INTEGER NOT NULL REFERENCES records(id),
    field_id   INTEGER NOT NULL REFERENCES fields(id),
    value      TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS field_values_record_idx ON field_values(record_id);
";

/// Shared handle to the SQLite database.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database file and make sure every table exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    /// A private, empty database. Used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` with exclusive access to the connection.
    ///
    /// The lock must not be held across an `.await`; callers only pass
    /// synchronous closures.
    pub fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut conn)
    }

    /// Run `f` with a clone of this handle on Tokio's blocking thread pool.
    pub async fn run_blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Store) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))?
    }

    /// Close the connection if this is the last handle.
    pub fn close(self) -> Result<()> {
        match Arc::try_unwrap(self.conn) {
            Ok(mutex) => {
                let conn = mutex.into_inner().unwrap_or_else(|p| p.into_inner());
                conn.close().map_err(|(_, e)| PipelineError::Storage(e))
            }
            // Still shared (e.g. a job is running); dropped with the last clone.
            Err(_) => Ok(()),
        }
    }
}

/// Turn a UNIQUE/FOREIGN KEY violation into a client error with `message`.
pub(crate) fn constraint_as_invalid(e: rusqlite::Error, message: impl Into<String>) -> PipelineError {
    match &e {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            PipelineError::InvalidInput(message.into())
        }
        _ => PipelineError::Storage(e),
    }
}
