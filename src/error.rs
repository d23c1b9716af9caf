//! Error taxonomy for the server lifecycle.
//!
//! # Categories
//! - `ConfigError`: missing collaborators, duplicate or late registration.
//!   Always returned synchronously, never after side effects.
//! - `ServerError`: everything `Server::run` can end with.
//! - `HookError` / `HookErrors`: pre-shutdown hook failures, joined.

use std::any::Any;
use std::fmt;

/// Error type returned by health checks and hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Configuration and registration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("handler must not be empty")]
    MissingHandler,

    #[error("stats must not be empty")]
    MissingStats,

    #[error("log must not be empty")]
    MissingLog,

    #[error("could not add checks as {0} has already been installed")]
    ChecksInstalled(&'static str),

    #[error("name is required")]
    EmptyHookName,

    #[error("hook {0:?} is already registered")]
    DuplicateHook(String),

    #[error("hooks have already been called")]
    HooksCalled,

    #[error("server has already been run")]
    AlreadyRun,
}

/// Terminal error of `Server::run`.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("starting server: {0}")]
    Bind(#[source] std::io::Error),

    #[error("server stopped prematurely")]
    StoppedPrematurely,

    #[error("running pre-shutdown hooks: {0}")]
    PreShutdown(#[source] HookErrors),
}

/// A single failed hook.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("running pre-shutdown hook {name:?}: {source}")]
    Failed {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("running pre-shutdown hook {name:?}: panicked: {message}")]
    Panicked { name: String, message: String },
}

impl HookError {
    /// Name of the hook that failed.
    pub fn name(&self) -> &str {
        match self {
            HookError::Failed { name, .. } | HookError::Panicked { name, .. } => name,
        }
    }
}

/// Several hook failures joined into one error, one per line.
#[derive(Debug, Default)]
pub struct HookErrors(Vec<HookError>);

impl HookErrors {
    pub(crate) fn push(&mut self, err: HookError) {
        self.0.push(err);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HookError> {
        self.0.iter()
    }

    /// `Ok` when nothing was collected.
    pub(crate) fn into_result(self) -> Result<(), HookErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for HookErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for HookErrors {}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joined_errors_display_one_per_line() {
        let mut errs = HookErrors::default();
        errs.push(HookError::Failed {
            name: "first".into(),
            source: "boom".into(),
        });
        errs.push(HookError::Panicked {
            name: "second".into(),
            message: "oops".into(),
        });

        assert_eq!(
            errs.to_string(),
            "running pre-shutdown hook \"first\": boom\n\
             running pre-shutdown hook \"second\": panicked: oops"
        );
        assert_eq!(errs.iter().map(HookError::name).collect::<Vec<_>>(), ["first", "second"]);
    }

    #[test]
    fn empty_errors_are_ok() {
        assert!(HookErrors::default().into_result().is_ok());
    }

    #[test]
    fn bind_error_is_wrapped() {
        let err = ServerError::Bind(std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"));
        assert_eq!(err.to_string(), "starting server: in use");
    }
}
