//! Stats collection.
//!
//! # Metrics
//! - `requests` (counter): requests entering a handler, by `handler`
//! - `responses` (counter): completed responses, by `handler`, `code`, `code-group`
//! - `response.size` (histogram): response body bytes
//! - `response.duration` (histogram, seconds): handler latency
//!
//! # Design Decisions
//! - `MetricsSink` forwards to the `metrics` facade; whichever recorder is
//!   installed (Prometheus in the binary) receives the data
//! - Tags are owned strings so callers can build them per request

use std::net::SocketAddr;
use std::time::Duration;

use metrics::Label;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Key/value tags attached to a stat.
pub type Tags = [(&'static str, String)];

/// Stats sink capability used by the server and its middleware.
pub trait StatsSink: Send + Sync {
    fn counter(&self, name: &str, value: u64, tags: &Tags);

    fn histogram(&self, name: &str, value: f64, tags: &Tags);

    fn timing(&self, name: &str, value: Duration, tags: &Tags);
}

/// Sink backed by the global `metrics` recorder.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSink;

fn labels(tags: &Tags) -> Vec<Label> {
    tags.iter()
        .map(|(k, v)| Label::new(*k, v.clone()))
        .collect()
}

impl StatsSink for MetricsSink {
    fn counter(&self, name: &str, value: u64, tags: &Tags) {
        metrics::counter!(name.to_owned(), labels(tags)).increment(value);
    }

    fn histogram(&self, name: &str, value: f64, tags: &Tags) {
        metrics::histogram!(name.to_owned(), labels(tags)).record(value);
    }

    fn timing(&self, name: &str, value: Duration, tags: &Tags) {
        metrics::histogram!(name.to_owned(), labels(tags)).record(value.as_secs_f64());
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStats;

impl StatsSink for NoopStats {
    fn counter(&self, _name: &str, _value: u64, _tags: &Tags) {}

    fn histogram(&self, _name: &str, _value: f64, _tags: &Tags) {}

    fn timing(&self, _name: &str, _value: Duration, _tags: &Tags) {}
}

/// Install the Prometheus recorder and its scrape listener.
pub fn init_prometheus(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}
