//! Job lifecycle: submission, status polling, restart recovery and the
//! handoff of finished jobs into the history.

pub mod events;
pub mod manager;
pub mod poller;

pub use events::{EventBroadcaster, LifecycleEvent};
pub use manager::{LifecycleManager, RecoveryOutcome};
pub use poller::{Poller, TickControl};
