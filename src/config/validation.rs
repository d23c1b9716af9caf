//! Configuration validation.
//!
//! Serde handles syntax; this checks values. All problems are collected
//! rather than stopping at the first.

use std::net::SocketAddr;

use crate::config::schema::Settings;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("server.address {0:?} is not a valid socket address")]
    InvalidAddress(String),

    #[error("server.tls.{0} must not be empty")]
    EmptyTlsPath(&'static str),

    #[error("metrics.address {0:?} is not a valid socket address")]
    InvalidMetricsAddress(String),
}

/// Validate settings, returning every problem found.
pub fn validate_config(settings: &Settings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let address = &settings.server.address;
    if !address.is_empty() && !is_host_port(address) {
        errors.push(ValidationError::InvalidAddress(address.clone()));
    }

    if let Some(tls) = &settings.server.tls {
        if tls.cert_path.is_empty() {
            errors.push(ValidationError::EmptyTlsPath("cert_path"));
        }
        if tls.key_path.is_empty() {
            errors.push(ValidationError::EmptyTlsPath("key_path"));
        }
    }

    if settings.metrics.enabled && settings.metrics.address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(
            settings.metrics.address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `host:port` where host may be a name (resolved at bind time).
fn is_host_port(address: &str) -> bool {
    if address.parse::<SocketAddr>().is_ok() {
        return true;
    }
    match address.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}
