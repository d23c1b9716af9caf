//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Server::run (server.rs):
//!     validate → install /readyz, /livez → bind → serve + shutdown watcher
//!     → post-start hooks (hooks.rs, concurrent)
//!     → wait: context done | server stopped prematurely
//!     → pre-shutdown hooks (hooks.rs, sequential)
//!     → shutdown-begun (readyz fails) → stop (graceful close) → wait
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → cancel the run context
//! ```
//!
//! # Design Decisions
//! - A bind failure aborts before any hook runs
//! - Hook panics are contained and logged, never fatal
//! - Shutdown proceeds even when pre-shutdown hooks fail
//! - Only the shutdown phase is time-bounded

pub mod context;
pub mod hooks;
pub mod server;
pub mod signal;
pub mod signals;

pub use context::RunContext;
pub use hooks::HookFuture;
pub use server::{Server, ServerState};
pub use signal::Signal;
