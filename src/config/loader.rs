//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::Settings;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Settings, SettingsError> {
    let content = fs::read_to_string(path)?;
    let settings: Settings = toml::from_str(&content)?;

    validate_config(&settings).map_err(SettingsError::Validation)?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_full_config() {
        let file = write_config(
            r#"
            [server]
            address = "127.0.0.1:8080"
            shutdown_timeout_secs = 5

            [server.tls]
            cert_path = "cert.pem"
            key_path = "key.pem"

            [log]
            filter = "debug"
            json = true

            [metrics]
            enabled = true
            address = "127.0.0.1:9100"
            "#,
        );

        let settings = load_config(file.path()).unwrap();

        assert_eq!(settings.server.address, "127.0.0.1:8080");
        assert_eq!(settings.server.shutdown_timeout_secs, 5);
        assert_eq!(settings.server.read_timeout_secs, 0);
        assert_eq!(settings.server.tls.unwrap().key_path, "key.pem");
        assert!(settings.log.json);
        assert!(settings.metrics.enabled);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let file = write_config("");

        let settings = load_config(file.path()).unwrap();

        assert!(settings.server.address.is_empty());
        assert!(settings.server.tls.is_none());
        assert!(!settings.metrics.enabled);
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let file = write_config("[server\naddress = 1");

        assert!(matches!(load_config(file.path()), Err(SettingsError::Parse(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/service.toml")).unwrap_err();
        assert!(matches!(err, SettingsError::Io(_)));
    }

    #[test]
    fn validation_errors_are_reported() {
        let file = write_config(
            r#"
            [metrics]
            enabled = true
            address = "nowhere"
            "#,
        );

        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("Validation failed: "));
    }
}
