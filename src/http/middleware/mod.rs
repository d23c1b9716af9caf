//! Reusable request middleware.
//!
//! Each helper wraps an `axum::Router` and returns the wrapped router.

pub mod dispatch;
pub mod recovery;
pub mod request_id;
pub mod stats;

pub use dispatch::with_dispatch;
pub use recovery::with_recovery;
pub use request_id::{with_request_id, X_REQUEST_ID};
pub use stats::with_stats;
