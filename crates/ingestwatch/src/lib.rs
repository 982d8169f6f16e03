pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod job;
pub mod lifecycle;
pub mod logging;
pub mod service;
pub mod status;
pub mod store;

pub use config::{load_config, Config, ServiceConfig};
pub use error::{ConfigError, IngestError, LifecycleError, Result};
pub use job::{Job, JobSnapshot};
pub use lifecycle::{LifecycleEvent, LifecycleManager, RecoveryOutcome};
pub use service::{HttpJobService, JobService, ServiceError};
pub use status::{label, FileError, JobProgress, JobStats, JobStatus};
pub use store::{HistoryEntry, HistoryStore, StateStore};
