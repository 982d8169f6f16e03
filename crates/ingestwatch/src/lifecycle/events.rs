//! Events delivered to the presentation layer.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::job::Job;
use crate::service::ServiceError;

/// Something that happened to the tracked job.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// A poll tick returned a non-terminal snapshot.
    Progress(Job),
    /// The job reached `completed` or `failed`. Fires once per job.
    Terminal(Job),
    /// A status request failed and polling stopped. The active-job pointer
    /// is kept so the next startup retries.
    PollFailed { job_id: String, error: ServiceError },
}

impl LifecycleEvent {
    /// Id of the job the event refers to.
    pub fn job_id(&self) -> &str {
        match self {
            LifecycleEvent::Progress(job) | LifecycleEvent::Terminal(job) => &job.job_id,
            LifecycleEvent::PollFailed { job_id, .. } => job_id,
        }
    }
}

/// Fans lifecycle events out to any number of subscribers.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: Arc<broadcast::Sender<LifecycleEvent>>,
}

impl EventBroadcaster {
    /// Creates a broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends an event to all subscribers.
    pub fn send(&self, event: LifecycleEvent) {
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(event);
    }

    /// Creates a new subscriber.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
