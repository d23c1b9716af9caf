//! Structured logging setup.
//!
//! Builds a `tracing-subscriber` registry (env filter + plain or JSON
//! formatting) and hands it back as a `Dispatch`, which is what the server
//! takes as its logger.

use tracing::Dispatch;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

use crate::config::LogSettings;

/// Default filter when neither CLI, environment nor config set one.
pub const DEFAULT_LOG_FILTER: &str = "service_lifecycle=info,tower_http=info";

/// Build a dispatch for the given filter and format.
pub fn dispatch(settings: &LogSettings) -> Dispatch {
    let filter = EnvFilter::try_new(&settings.filter)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    if settings.json {
        Dispatch::new(registry.with(tracing_subscriber::fmt::layer().json()))
    } else {
        Dispatch::new(registry.with(tracing_subscriber::fmt::layer()))
    }
}

/// Build the dispatch and make it the process-wide default.
pub fn init(settings: &LogSettings) -> Dispatch {
    let dispatch = dispatch(settings);
    if tracing::dispatcher::set_global_default(dispatch.clone()).is_err() {
        tracing::warn!("Global tracing subscriber already set");
    }
    dispatch
}
