//! Process-wide log/trace output.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global tracing subscriber and routes `log` records into it.
///
/// `RUST_LOG` takes precedence over `default_filter`. Returns false if a
/// subscriber was already installed, in which case nothing changes.
pub fn init_logging(default_filter: &str, json: bool) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        tracing::subscriber::set_global_default(registry.with(fmt::layer().json()))
    } else {
        tracing::subscriber::set_global_default(registry.with(fmt::layer().with_target(true)))
    };
    if installed.is_err() {
        return false;
    }

    if let Err(e) = tracing_log::LogTracer::init() {
        tracing::warn!("log records will not be captured: {}", e);
    }
    true
}
