//! Durable client state: the active-job pointer and the job history.

pub mod history;
pub mod state;

pub use history::{HistoryEntry, HistoryStore, DEFAULT_HISTORY_LIMIT};
pub use state::{StateStore, ACTIVE_JOB_KEY, HISTORY_KEY};
