//! Configuration file schema.
//!
//! All types derive Serde traits and default every field, so an empty file
//! is a valid configuration.

use serde::{Deserialize, Serialize};

/// Root of the configuration file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Listener and timeout settings.
    pub server: ServerSettings,

    /// Logging settings.
    pub log: LogSettings,

    /// Metrics exporter settings.
    pub metrics: MetricsSettings,
}

/// Listener and timeout settings.
///
/// Timeouts are whole seconds; `0` keeps the server default.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address (e.g. "0.0.0.0:8080"). Empty picks port 80 or 443.
    pub address: String,

    /// Optional TLS certificate material.
    pub tls: Option<TlsSettings>,

    pub read_header_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub shutdown_timeout_secs: u64,
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsSettings {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogSettings {
    /// `EnvFilter` directive string.
    pub filter: String,

    /// Emit JSON lines instead of human readable output.
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: crate::observability::logging::DEFAULT_LOG_FILTER.to_string(),
            json: false,
        }
    }
}

/// Prometheus exporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub enabled: bool,

    /// Scrape listener address.
    pub address: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "0.0.0.0:9090".to_string(),
        }
    }
}
