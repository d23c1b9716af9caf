//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (check_set.rs):
//!     add checks → CheckSet (ordered, locked)
//!     → install() latches the set, no further adds
//!
//! Request (handler.rs):
//!     GET /readyz[?verbose]
//!     → run every check in order (checker.rs)
//!     → 200 "ok" | 200 verbose listing | 500 listing + failure callback
//! ```
//!
//! # Design Decisions
//! - Checks run sequentially so a slow check shows up as endpoint latency
//! - An empty set behaves as a single `ping` check
//! - Registration after install is an error, never a silent no-op

pub mod check_set;
pub mod checker;
pub mod handler;

pub use check_set::CheckSet;
pub use checker::{named_check, ping, HealthChecker, NamedCheck, Ping};
pub use handler::HealthHandler;
