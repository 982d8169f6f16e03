//! String values stored by key in the `kv_store` table.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use super::{Database, DatabaseError};

/// Returns the value stored under `key`, if any.
pub fn get(db: &Database, key: &str) -> Result<Option<String>, DatabaseError> {
    db.with_conn(|conn| {
        conn.query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
    })
    .map_err(|source| DatabaseError::Read {
        key: key.to_string(),
        source,
    })
}

/// Inserts or replaces the value stored under `key`.
pub fn put(db: &Database, key: &str, value: &str) -> Result<(), DatabaseError> {
    let now = Utc::now().to_rfc3339();
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
            params![key, value, now],
        )
    })
    .map(|_| ())
    .map_err(|source| DatabaseError::Write {
        key: key.to_string(),
        source,
    })
}

/// Deletes the value stored under `key`. Deleting a missing key is a no-op.
pub fn delete(db: &Database, key: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key]))
        .map(|_| ())
        .map_err(|source| DatabaseError::Write {
            key: key.to_string(),
            source,
        })
}
