//! Named health checks.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::request::Parts;

use crate::error::BoxError;

/// A named health check.
///
/// Checks receive the head of the inbound health request. Any state a check
/// needs belongs to whoever created it.
#[async_trait]
pub trait HealthChecker: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self, req: &Parts) -> Result<(), BoxError>;
}

impl fmt::Debug for dyn HealthChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HealthChecker").field(&self.name()).finish()
    }
}

/// A health check built from a name and a synchronous closure.
pub struct NamedCheck<F> {
    name: String,
    check: F,
}

impl<F> NamedCheck<F>
where
    F: Fn(&Parts) -> Result<(), BoxError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

#[async_trait]
impl<F> HealthChecker for NamedCheck<F>
where
    F: Fn(&Parts) -> Result<(), BoxError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, req: &Parts) -> Result<(), BoxError> {
        (self.check)(req)
    }
}

/// Shorthand for a shared [`NamedCheck`].
pub fn named_check<F>(name: impl Into<String>, check: F) -> Arc<dyn HealthChecker>
where
    F: Fn(&Parts) -> Result<(), BoxError> + Send + Sync + 'static,
{
    Arc::new(NamedCheck::new(name, check))
}

/// Always passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ping;

#[async_trait]
impl HealthChecker for Ping {
    fn name(&self) -> &str {
        "ping"
    }

    async fn check(&self, _req: &Parts) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Shared [`Ping`] check.
pub fn ping() -> Arc<dyn HealthChecker> {
    Arc::new(Ping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts() -> Parts {
        Request::builder().uri("/readyz").body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn named_check_forwards_result() {
        let good = named_check("good", |_| Ok(()));
        let bad = named_check("bad", |_| Err("test error".into()));

        assert_eq!(good.name(), "good");
        assert!(good.check(&parts()).await.is_ok());

        let err = bad.check(&parts()).await.unwrap_err();
        assert_eq!(err.to_string(), "test error");
    }

    #[tokio::test]
    async fn named_check_sees_request() {
        let check = named_check("path", |req| {
            if req.uri.path() == "/readyz" {
                Ok(())
            } else {
                Err("unexpected path".into())
            }
        });

        assert!(check.check(&parts()).await.is_ok());
    }

    #[tokio::test]
    async fn ping_always_passes() {
        let check = ping();
        assert_eq!(check.name(), "ping");
        assert!(check.check(&parts()).await.is_ok());
    }
}
