//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (axum-server accept loop, HTTP/1.1 + HTTP/2 detection,
//!                  header/body/response timeouts, graceful shutdown)
//!     → middleware (log scoping, tracing, stats)
//!     → /readyz, /livez or the application handler
//! ```

pub mod middleware;
pub mod server;

pub use middleware::{with_dispatch, with_recovery, with_request_id, with_stats};
