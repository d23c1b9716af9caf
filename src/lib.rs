//! HTTP service lifecycle shell.
//!
//! Wraps an application `Router` with `/readyz` and `/livez` health
//! endpoints, request stats and log scoping, and runs it through a managed
//! lifecycle: bind, post-start hooks, wait for cancellation, pre-shutdown
//! hooks, graceful shutdown.
//!
//! ```text
//!     Client Request
//!     ──────▶ net (bind, TLS) ──▶ http (timeouts, trace, stats)
//!                                   ├─▶ /livez   health::HealthHandler
//!                                   ├─▶ /readyz  health::HealthHandler (+ hooks, shutdown)
//!                                   └─▶ application handler
//!
//!     lifecycle::Server::run
//!         post-start hooks ──▶ context done ──▶ pre-shutdown hooks ──▶ drain
//! ```

// Core subsystems
pub mod config;
pub mod error;
pub mod http;
pub mod net;

// Lifecycle and health
pub mod health;
pub mod lifecycle;

// Cross-cutting concerns
pub mod observability;

pub use config::ServerConfig;
pub use error::{BoxError, ConfigError, HookError, HookErrors, ServerError};
pub use health::{named_check, HealthChecker};
pub use lifecycle::{RunContext, Server, ServerState};
pub use tokio_util::sync::CancellationToken;
