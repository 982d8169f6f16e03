//! Orchestrates submission, polling, restart recovery and history.
//!
//! The persisted active-job pointer is the single source of truth for
//! whether unfinished work exists. It is written only after the service has
//! accepted a job and removed only once the job is finalized or recovery has
//! given up on it.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tracing::Instrument;

use crate::config::Config;
use crate::error::LifecycleError;
use crate::job::{Job, JobSnapshot};
use crate::lifecycle::events::{EventBroadcaster, LifecycleEvent};
use crate::lifecycle::poller::{Poller, TickControl};
use crate::service::{JobService, ServiceError};
use crate::store::{HistoryEntry, HistoryStore, StateStore};

/// Result of [`LifecycleManager::recover_on_startup`].
#[derive(Debug, Clone)]
pub enum RecoveryOutcome {
    /// No job was pointed to.
    NothingToRecover,
    /// The job is still running; polling resumed.
    Resumed(Job),
    /// The job finished while the client was away and was recorded.
    Finalized(Job),
    /// The job could not be resolved; the pointer was cleared.
    Discarded { job_id: String, error: ServiceError },
}

struct ManagerState {
    job: Option<Job>,
    poller: Poller,
}

struct Inner {
    service: Arc<dyn JobService>,
    store: StateStore,
    history: HistoryStore,
    events: EventBroadcaster,
    state: Mutex<ManagerState>,
}

/// Tracks at most one active job from submission to completion.
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct LifecycleManager {
    inner: Arc<Inner>,
}

impl LifecycleManager {
    /// Creates a manager.
    pub fn new(
        service: Arc<dyn JobService>,
        store: StateStore,
        poll_interval: Duration,
        history_limit: usize,
    ) -> Self {
        let history = HistoryStore::new(store.clone(), history_limit);
        Self {
            inner: Arc::new(Inner {
                service,
                store,
                history,
                events: EventBroadcaster::default(),
                state: Mutex::new(ManagerState {
                    job: None,
                    poller: Poller::new(poll_interval),
                }),
            }),
        }
    }

    /// Creates a manager using the interval and history limit from `config`.
    pub fn from_config(service: Arc<dyn JobService>, store: StateStore, config: &Config) -> Self {
        Self::new(service, store, config.poll_interval(), config.history_limit)
    }

    /// Subscribes to progress, terminal and poll-failure events.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.inner.events.subscribe()
    }

    /// Submits a new job and starts polling it.
    ///
    /// Nothing is persisted unless the service accepts the job. A job that
    /// was already active is replaced: its polling stops and the pointer
    /// moves to the new job.
    pub async fn submit(&self, path: &str, project: &str) -> Result<Job, LifecycleError> {
        let span = tracing::info_span!("lifecycle.submit", path = %path, project = %project);
        async {
            let snapshot = self
                .inner
                .service
                .create_job(path, project)
                .await
                .map_err(|e| {
                    log::warn!("Job submission for {} rejected: {}", path, e);
                    LifecycleError::Submission(e)
                })?;

            let mut state = self.inner.state.lock().await;
            if let Some(previous) = state.job.take() {
                log::warn!(
                    "Replacing active job {} with {}",
                    previous.job_id,
                    snapshot.job_id
                );
            }

            let job = Job::from_snapshot(&snapshot, path, project);
            self.inner.store.set_pointer(&job.job_id);
            state.job = Some(job.clone());
            Inner::start_polling(&self.inner, &mut state, &job.job_id);

            log::info!("Submitted job {} for {} ({})", job.job_id, path, project);
            Ok::<Job, LifecycleError>(job)
        }
        .instrument(span)
        .await
    }

    /// Resumes tracking of a job left over from a previous run.
    ///
    /// A non-terminal job resumes polling, a terminal one is recorded in the
    /// history right away, and a job the service cannot report on is
    /// forgotten. None of these outcomes is an error for the caller.
    pub async fn recover_on_startup(&self) -> RecoveryOutcome {
        let span = tracing::info_span!("lifecycle.recover");
        async {
            let Some(job_id) = self.inner.store.get_pointer() else {
                log::debug!("No active job to recover");
                return RecoveryOutcome::NothingToRecover;
            };

            let mut state = self.inner.state.lock().await;
            let result = self.inner.service.get_job_status(&job_id).await;

            match result {
                Ok(snapshot) if snapshot.job_id != job_id => {
                    let error = ServiceError::Decode(format!(
                        "status for job '{}' returned job '{}'",
                        job_id, snapshot.job_id
                    ));
                    self.discard(&mut state, job_id, error)
                }
                Ok(snapshot) if snapshot.status.is_terminal() => {
                    state.poller.stop();
                    let job = self.inner.finalize(&mut state, &snapshot);
                    log::info!("Recovered job {} finished while away ({})", job_id, job.status);
                    self.inner.events.send(LifecycleEvent::Terminal(job.clone()));
                    RecoveryOutcome::Finalized(job)
                }
                Ok(snapshot) => {
                    let job = match state.job.as_ref().filter(|j| j.job_id == snapshot.job_id) {
                        Some(known) => {
                            let mut job = known.clone();
                            job.apply_progress(&snapshot);
                            job
                        }
                        None => Job::from_snapshot(&snapshot, "", ""),
                    };
                    state.job = Some(job.clone());
                    Inner::start_polling(&self.inner, &mut state, &job_id);
                    log::info!("Resumed polling of job {} ({})", job_id, job.status);
                    RecoveryOutcome::Resumed(job)
                }
                Err(error) => self.discard(&mut state, job_id, error),
            }
        }
        .instrument(span)
        .await
    }

    fn discard(
        &self,
        state: &mut ManagerState,
        job_id: String,
        error: ServiceError,
    ) -> RecoveryOutcome {
        log::warn!("Could not recover job {}, forgetting it: {}", job_id, error);
        self.inner.store.clear_pointer();
        if state.job.as_ref().is_some_and(|j| j.job_id == job_id) {
            state.poller.stop();
            state.job = None;
        }
        RecoveryOutcome::Discarded { job_id, error }
    }

    /// Stops polling without forgetting the job.
    pub async fn stop_polling(&self) {
        self.inner.state.lock().await.poller.stop();
    }

    /// Snapshot of the job currently tracked in memory.
    pub async fn current_job(&self) -> Option<Job> {
        self.inner.state.lock().await.job.clone()
    }

    /// Returns true while the active job is being polled.
    pub async fn is_polling(&self) -> bool {
        self.inner.state.lock().await.poller.is_polling()
    }

    /// Id stored in the persisted active-job pointer.
    pub fn active_job_id(&self) -> Option<String> {
        self.inner.store.get_pointer()
    }

    /// Recently finished jobs, newest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.inner.history.load()
    }

    /// Removes all history entries.
    pub fn clear_history(&self) {
        self.inner.history.clear();
    }
}

impl Inner {
    fn start_polling(this: &Arc<Self>, state: &mut ManagerState, job_id: &str) {
        let weak: Weak<Inner> = Arc::downgrade(this);
        state
            .poller
            .start(job_id, Arc::clone(&this.service), move |generation, result| {
                let weak = weak.clone();
                async move {
                    match weak.upgrade() {
                        Some(inner) => inner.handle_tick(generation, result).await,
                        None => TickControl::Stop,
                    }
                }
            });
    }

    async fn handle_tick(
        &self,
        generation: u64,
        result: Result<JobSnapshot, ServiceError>,
    ) -> TickControl {
        let mut state = self.state.lock().await;
        if !state.poller.is_current(generation) {
            log::debug!("Discarding stale poll response (generation {})", generation);
            return TickControl::Stop;
        }

        let Some(active_id) = state.job.as_ref().map(|j| j.job_id.clone()) else {
            state.poller.stop();
            return TickControl::Stop;
        };

        match result {
            Ok(snapshot) if snapshot.job_id != active_id => {
                log::warn!(
                    "Ignoring status for job {} while tracking {}",
                    snapshot.job_id,
                    active_id
                );
                TickControl::Continue
            }
            Ok(snapshot) if snapshot.status.is_terminal() => {
                state.poller.stop();
                let job = self.finalize(&mut state, &snapshot);
                log::info!("Job {} finished: {}", job.job_id, job.status);
                self.events.send(LifecycleEvent::Terminal(job));
                TickControl::Stop
            }
            Ok(snapshot) => {
                if let Some(job) = state.job.as_mut() {
                    job.apply_progress(&snapshot);
                    log::debug!(
                        "Job {} {}: {:.0}% ({}/{})",
                        job.job_id,
                        job.status,
                        job.progress.percent,
                        job.progress.processed_files,
                        job.progress.total_files
                    );
                    self.events.send(LifecycleEvent::Progress(job.clone()));
                }
                TickControl::Continue
            }
            Err(error) => {
                state.poller.stop();
                log::warn!("Polling job {} failed, stopping: {}", active_id, error);
                self.events.send(LifecycleEvent::PollFailed {
                    job_id: active_id,
                    error,
                });
                TickControl::Stop
            }
        }
    }

    /// Applies a terminal snapshot, records the job in the history, clears
    /// the pointer and forgets the in-memory job.
    fn finalize(&self, state: &mut ManagerState, snapshot: &JobSnapshot) -> Job {
        let mut job = match state.job.take() {
            Some(job) if job.job_id == snapshot.job_id => job,
            _ => Job::from_snapshot(snapshot, "", ""),
        };
        job.finalize(snapshot);

        if let Err(e) = self.history.record(&job) {
            log::error!("Failed to record job {} in history: {}", job.job_id, e);
        }
        self.store.clear_pointer();
        job
    }
}
