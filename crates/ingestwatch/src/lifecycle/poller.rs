//! Cancellable repeating status refresh for the active job.
//!
//! The poller owns at most one background task. Each task is tagged with a
//! generation number; [`Poller::stop`] and [`Poller::start`] bump the
//! generation so that a response still in flight when the task was stopped
//! can be recognised as stale and dropped by the tick handler.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::job::JobSnapshot;
use crate::service::{JobService, ServiceError};

/// Shortest delay between two ticks; shorter intervals are raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// What the poll task should do after a tick was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

struct PollTask {
    job_id: String,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Timer-driven status polling for one job at a time.
pub struct Poller {
    interval: Duration,
    generation: u64,
    task: Option<PollTask>,
}

impl Poller {
    /// Creates an idle poller ticking every `interval`, at least
    /// [`MIN_POLL_INTERVAL`].
    pub fn new(interval: Duration) -> Self {
        if interval < MIN_POLL_INTERVAL {
            log::warn!(
                "Poll interval {:?} too short, using {:?}",
                interval,
                MIN_POLL_INTERVAL
            );
        }
        Self {
            interval: interval.max(MIN_POLL_INTERVAL),
            generation: 0,
            task: None,
        }
    }

    /// Delay between two ticks.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Generation of the current (or most recently stopped) task.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns true if `generation` belongs to the running task.
    pub fn is_current(&self, generation: u64) -> bool {
        self.task.is_some() && self.generation == generation
    }

    /// Returns true while a poll task is active.
    pub fn is_polling(&self) -> bool {
        self.task.is_some()
    }

    /// Id of the job being polled, if any.
    pub fn job_id(&self) -> Option<&str> {
        self.task.as_ref().map(|t| t.job_id.as_str())
    }

    /// Starts polling `job_id`, cancelling any task already running.
    ///
    /// The first status request is issued one interval after this call.
    /// Ticks are serialized: `on_tick` must finish before the next tick is
    /// scheduled. The task ends when `on_tick` returns [`TickControl::Stop`]
    /// or when the poller is stopped. Returns the generation of the new task.
    pub fn start<F, Fut>(&mut self, job_id: &str, service: Arc<dyn JobService>, on_tick: F) -> u64
    where
        F: Fn(u64, Result<JobSnapshot, ServiceError>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TickControl> + Send + 'static,
    {
        self.stop();
        self.generation += 1;

        let generation = self.generation;
        let interval = self.interval;
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let task_job_id = job_id.to_string();
        let span = tracing::info_span!("poller", job_id = %job_id, generation);

        let handle = tokio::spawn(
            async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                ticker.tick().await; // skip immediate first tick

                loop {
                    tokio::select! {
                        _ = task_cancel.cancelled() => break,
                        _ = ticker.tick() => {}
                    }

                    let result = service.get_job_status(&task_job_id).await;
                    if on_tick(generation, result).await == TickControl::Stop {
                        break;
                    }
                    if task_cancel.is_cancelled() {
                        break;
                    }
                }
                log::debug!("Poll task for job {} finished", task_job_id);
            }
            .instrument(span),
        );

        log::debug!(
            "Started polling job {} every {:?} (generation {})",
            job_id,
            interval,
            generation
        );

        self.task = Some(PollTask {
            job_id: job_id.to_string(),
            cancel,
            handle,
        });
        generation
    }

    /// Stops polling. A no-op when idle.
    ///
    /// Takes effect before the next tick. A status request already in flight
    /// is not aborted; its response is delivered with a stale generation.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.cancel.cancel();
            // Detach rather than abort so an in-flight request completes.
            drop(task.handle);
            self.generation += 1;
            log::debug!("Stopped polling job {}", task.job_id);
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}
