//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → Settings (validated)
//!     → ServerConfig::from_settings (runtime config)
//!     + handler, stats sink, logger, TLS material from the caller
//! ```
//!
//! # Design Decisions
//! - Runtime config is fixed once `Server::run` begins
//! - Zero durations mean "use the default"
//! - Validation reports every problem at once

pub mod loader;
pub mod schema;
pub mod server;
pub mod validation;

pub use loader::{load_config, SettingsError};
pub use schema::{LogSettings, MetricsSettings, ServerSettings, Settings, TlsSettings};
pub use server::{ListenObserver, ServerConfig};
