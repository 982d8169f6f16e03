//! Bounded, deduplicated log of finished jobs, newest first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LifecycleError;
use crate::job::Job;
use crate::status::JobStatus;
use crate::store::state::StateStore;

/// Number of entries kept unless configured otherwise.
pub const DEFAULT_HISTORY_LIMIT: usize = 5;

/// Frozen summary of a job that reached a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub job_id: String,
    pub path: String,
    pub project: String,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub files_processed: u64,
    pub total_files: u64,
    pub documents: u64,
    pub chunks: u64,
    pub error_count: usize,
}

impl HistoryEntry {
    /// Builds an entry from a terminal job.
    pub fn from_job(job: &Job) -> Self {
        let stats = job.stats.unwrap_or_default();
        Self {
            job_id: job.job_id.clone(),
            path: job.path.clone(),
            project: job.project.clone(),
            status: job.status.clone(),
            started_at: job.started_at,
            completed_at: job.completed_at,
            files_processed: job.progress.processed_files,
            total_files: job.progress.total_files,
            documents: stats.documents,
            chunks: stats.chunks,
            error_count: job.error_count(),
        }
    }
}

/// History of recently finished jobs.
///
/// Ordered by insertion (the order this client observed completions), not
/// by timestamp.
#[derive(Clone)]
pub struct HistoryStore {
    store: StateStore,
    limit: usize,
}

impl HistoryStore {
    /// Creates a history store keeping at most `limit` entries (minimum 1).
    pub fn new(store: StateStore, limit: usize) -> Self {
        Self {
            store,
            limit: limit.max(1),
        }
    }

    /// Maximum number of entries kept.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Records a terminal job and returns the updated list.
    ///
    /// An existing entry with the same job id is replaced and the new entry
    /// moves to the front. The oldest entries beyond the limit are evicted.
    pub fn record(&self, job: &Job) -> Result<Vec<HistoryEntry>, LifecycleError> {
        if !job.is_terminal() {
            return Err(LifecycleError::NotTerminal {
                job_id: job.job_id.clone(),
                status: job.status.to_string(),
            });
        }

        let entry = HistoryEntry::from_job(job);
        let mut entries = self.store.get_history();
        entries.retain(|e| e.job_id != entry.job_id);
        entries.insert(0, entry);
        entries.truncate(self.limit);

        self.store.set_history(&entries);
        log::debug!(
            "Recorded job {} ({}) in history, {} entries",
            job.job_id,
            job.status,
            entries.len()
        );

        Ok(entries)
    }

    /// Returns the persisted history, empty if none or unreadable.
    pub fn load(&self) -> Vec<HistoryEntry> {
        let mut entries = self.store.get_history();
        entries.truncate(self.limit);
        entries
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.store.set_history(&[]);
        log::info!("Job history cleared");
    }
}
