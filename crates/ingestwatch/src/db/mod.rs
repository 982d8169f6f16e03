//! SQLite file holding the client's key/value state.
//!
//! One connection per process, shared behind a mutex. The store above it is
//! best-effort, so a connection left behind by a panicking holder is reused
//! rather than treated as fatal.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use rusqlite::Connection;

pub mod error;
pub mod kv_repo;
pub mod migrations;

pub use error::DatabaseError;

/// Shared handle to the state database. Clones use the same connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens the state file at `path`, creating it and its directory if
    /// needed, and brings the schema up to date.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| DatabaseError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)
            .and_then(|conn| {
                conn.execute_batch("PRAGMA journal_mode=WAL;")?;
                Ok(conn)
            })
            .map_err(|source| DatabaseError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let db = Self::init(conn)?;
        log::debug!("State database ready at {}", path.display());
        Ok(db)
    }

    /// Volatile database, used when nothing should outlive the process.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, DatabaseError> {
        migrations::run_all(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` with exclusive access to the connection.
    pub fn with_conn<F, T>(&self, f: F) -> rusqlite::Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self.conn.lock().unwrap_or_else(|poisoned| {
            log::warn!("State database lock was poisoned, reusing connection");
            PoisonError::into_inner(poisoned)
        });
        f(&conn)
    }
}
