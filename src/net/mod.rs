//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ServerConfig.addr
//!     → listener.rs (default port, bind, hand off a std listener)
//!     → tls.rs (optional certificate material)
//!     → http::server (accept loop, protocol detection)
//! ```
//!
//! # Design Decisions
//! - Bind happens before anything else starts, so a bind error leaves
//!   nothing to clean up
//! - TLS is optional and handled by the acceptor

pub mod listener;
pub mod tls;

pub use listener::{bind, listen_address};
pub use tls::load_tls_config;
