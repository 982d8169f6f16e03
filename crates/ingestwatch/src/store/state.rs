//! Best-effort persistence of the active-job pointer and the history list.
//!
//! Nothing in here returns an error. A broken or missing database reads as
//! "nothing stored" and writes are dropped with a warning.

use std::path::Path;

use crate::db::{kv_repo, Database, DatabaseError};
use crate::store::history::HistoryEntry;

/// Key holding the id of the job currently being tracked.
pub const ACTIVE_JOB_KEY: &str = "ingestwatch.active_job";

/// Key holding the JSON-encoded history list.
pub const HISTORY_KEY: &str = "ingestwatch.history";

/// Persistence adapter over the key/value table.
///
/// Cloning is cheap; clones share the same database handle.
#[derive(Clone)]
pub struct StateStore {
    db: Option<Database>,
}

impl StateStore {
    /// Creates a store backed by an open database.
    pub fn new(db: Database) -> Self {
        Self { db: Some(db) }
    }

    /// Creates a store with persistence disabled. Reads are empty, writes
    /// are ignored.
    pub fn disabled() -> Self {
        Self { db: None }
    }

    /// Opens the database at `path`, falling back to a disabled store if
    /// it cannot be opened.
    pub fn open(path: &Path) -> Self {
        match Database::open(path) {
            Ok(db) => Self::new(db),
            Err(e) => {
                log::warn!(
                    "State database at {} unavailable, persistence disabled: {}",
                    path.display(),
                    e
                );
                Self::disabled()
            }
        }
    }

    /// Returns true if a database is attached.
    pub fn is_enabled(&self) -> bool {
        self.db.is_some()
    }

    /// Returns the id of the tracked job, if any.
    pub fn get_pointer(&self) -> Option<String> {
        self.read(ACTIVE_JOB_KEY).filter(|id| !id.is_empty())
    }

    /// Records `job_id` as the tracked job, replacing any previous pointer.
    pub fn set_pointer(&self, job_id: &str) {
        self.write("set active job pointer", |db| {
            kv_repo::put(db, ACTIVE_JOB_KEY, job_id)
        });
    }

    /// Removes the active-job pointer.
    pub fn clear_pointer(&self) {
        self.write("clear active job pointer", |db| {
            kv_repo::delete(db, ACTIVE_JOB_KEY)
        });
    }

    /// Returns the persisted history, newest first. Unreadable or malformed
    /// data yields an empty list.
    pub fn get_history(&self) -> Vec<HistoryEntry> {
        let Some(raw) = self.read(HISTORY_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Discarding malformed job history: {}", e);
                Vec::new()
            }
        }
    }

    /// Replaces the persisted history.
    pub fn set_history(&self, entries: &[HistoryEntry]) {
        let json = match serde_json::to_string(entries) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Failed to serialize job history: {}", e);
                return;
            }
        };
        self.write("save job history", |db| kv_repo::put(db, HISTORY_KEY, &json));
    }

    fn read(&self, key: &str) -> Option<String> {
        let db = self.db.as_ref()?;
        match kv_repo::get(db, key) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Failed to read '{}' from state store: {}", key, e);
                None
            }
        }
    }

    fn write<F>(&self, action: &str, f: F)
    where
        F: FnOnce(&Database) -> Result<(), DatabaseError>,
    {
        let Some(db) = self.db.as_ref() else {
            log::debug!("Persistence disabled, skipping: {}", action);
            return;
        };
        if let Err(e) = f(db) {
            log::warn!("Failed to {}: {}", action, e);
        }
    }
}
