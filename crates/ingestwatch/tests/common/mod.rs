//! Shared fixtures for lifecycle integration tests.
//!
//! - `ScriptedJobService` replays queued responses and counts requests.
//! - `TestHarness` owns a temporary state database; every call to
//!   `manager()` opens it afresh, like a new process would.
//! - Snapshot builders for the common service responses.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::broadcast;

use ingestwatch::{
    FileError, JobProgress, JobService, JobSnapshot, JobStats, JobStatus, LifecycleEvent,
    LifecycleManager, ServiceError, StateStore,
};

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

type Scripted = Mutex<VecDeque<Result<JobSnapshot, ServiceError>>>;

/// Job service double that answers from scripted queues.
///
/// An exhausted queue answers with a transport error.
#[derive(Default)]
pub struct ScriptedJobService {
    creates: Scripted,
    statuses: Scripted,
    create_calls: AtomicUsize,
    status_calls: AtomicUsize,
    requested_ids: Mutex<Vec<String>>,
}

impl ScriptedJobService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_create(&self, result: Result<JobSnapshot, ServiceError>) {
        self.creates.lock().unwrap().push_back(result);
    }

    pub fn push_status(&self, result: Result<JobSnapshot, ServiceError>) {
        self.statuses.lock().unwrap().push_back(result);
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Job ids passed to status requests, in order.
    pub fn requested_ids(&self) -> Vec<String> {
        self.requested_ids.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobService for ScriptedJobService {
    async fn create_job(&self, _path: &str, _project: &str) -> Result<JobSnapshot, ServiceError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.creates
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::Transport("no scripted create".to_string())))
    }

    async fn get_job_status(&self, job_id: &str) -> Result<JobSnapshot, ServiceError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.requested_ids.lock().unwrap().push(job_id.to_string());
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::Transport("no scripted status".to_string())))
    }
}

/// Isolated environment: temporary state database plus a scripted service.
pub struct TestHarness {
    temp_dir: TempDir,
    pub db_path: PathBuf,
    pub service: Arc<ScriptedJobService>,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("data").join("state.db");
        Self {
            temp_dir,
            db_path,
            service: ScriptedJobService::new(),
        }
    }

    /// Opens the state database.
    pub fn store(&self) -> StateStore {
        let store = StateStore::open(&self.db_path);
        assert!(store.is_enabled(), "state database should open");
        store
    }

    /// Builds a manager over a freshly opened state database.
    pub fn manager(&self) -> LifecycleManager {
        LifecycleManager::new(self.service.clone(), self.store(), POLL_INTERVAL, 5)
    }
}

/// Receives the next event, failing the test if none arrives in time.
pub async fn next_event(rx: &mut broadcast::Receiver<LifecycleEvent>) -> LifecycleEvent {
    tokio::time::timeout(Duration::from_secs(60), rx.recv())
        .await
        .expect("timed out waiting for lifecycle event")
        .expect("event channel closed")
}

pub fn snapshot(job_id: &str, status: JobStatus) -> JobSnapshot {
    JobSnapshot::new(job_id, status)
}

/// Response to a submission of `path` in `project`.
pub fn created(job_id: &str, path: &str, project: &str) -> JobSnapshot {
    let mut snapshot = JobSnapshot::new(job_id, JobStatus::Started);
    snapshot.path = Some(path.to_string());
    snapshot.project = Some(project.to_string());
    snapshot.started_at = Some("2026-03-01T09:00:00Z".parse().unwrap());
    snapshot
}

pub fn running(job_id: &str, percent: f64, total_files: u64, processed_files: u64) -> JobSnapshot {
    let mut snapshot = JobSnapshot::new(job_id, JobStatus::Running);
    snapshot.progress = Some(JobProgress {
        percent,
        total_files,
        processed_files,
        current_file: None,
    });
    snapshot
}

/// Terminal response carrying only results, no progress block.
pub fn completed(job_id: &str, documents: u64, chunks: u64) -> JobSnapshot {
    let mut snapshot = JobSnapshot::new(job_id, JobStatus::Completed);
    snapshot.stats = Some(JobStats { documents, chunks });
    snapshot.errors = Some(vec![]);
    snapshot.completed_at = Some("2026-03-01T09:05:00Z".parse().unwrap());
    snapshot
}

pub fn failed(job_id: &str, errors: &[(&str, &str)]) -> JobSnapshot {
    let mut snapshot = JobSnapshot::new(job_id, JobStatus::Failed);
    snapshot.errors = Some(
        errors
            .iter()
            .map(|(file, error)| FileError {
                file: file.to_string(),
                error: error.to_string(),
            })
            .collect(),
    );
    snapshot
}

pub fn transport_error() -> ServiceError {
    ServiceError::Transport("connection reset by peer".to_string())
}
