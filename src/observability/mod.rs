//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle and request events:
//!     → logging.rs (tracing subscriber, returned as a Dispatch)
//!     → metrics.rs (StatsSink: counters, histograms, timings)
//!
//! Consumers:
//!     → stdout (plain or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - The server receives its logger and stats sink explicitly
//! - Stats go through a small trait so tests can swap the backend

pub mod logging;
pub mod metrics;

pub use metrics::{MetricsSink, NoopStats, StatsSink, Tags};
