//! Ordered, latched set of health checks backing one endpoint.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::checker::{ping, HealthChecker};
use crate::error::ConfigError;

/// Checks for one health endpoint (`readyz` or `livez`).
///
/// Once installed, the set is frozen: further adds fail.
#[derive(Debug)]
pub struct CheckSet {
    name: &'static str,
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    installed: bool,
    checks: Vec<Arc<dyn HealthChecker>>,
}

impl CheckSet {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Endpoint name, also the path without its leading slash.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Append checks, keeping registration order.
    pub fn add<I>(&self, checks: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = Arc<dyn HealthChecker>>,
    {
        let mut inner = self.lock();
        if inner.installed {
            return Err(ConfigError::ChecksInstalled(self.name));
        }
        inner.checks.extend(checks);
        Ok(())
    }

    /// Freeze the set and return its checks (`ping` if none were added).
    pub fn install(&self) -> Vec<Arc<dyn HealthChecker>> {
        let mut inner = self.lock();
        inner.installed = true;
        if inner.checks.is_empty() {
            vec![ping()]
        } else {
            inner.checks.clone()
        }
    }

    pub fn is_installed(&self) -> bool {
        self.lock().installed
    }

    pub fn len(&self) -> usize {
        self.lock().checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
