//! Health endpoint rendering.
//!
//! Response contract:
//! - any check failed: 500, check listing + `"<name> check failed"`, failure
//!   callback invoked once with the detailed output
//! - all passed, not verbose: 200 `"ok"`
//! - all passed, `?verbose`: 200, check listing + `"<name> check passed"`

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

use axum::{
    extract::{Query, Request},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
};

use super::checker::{ping, HealthChecker};

type FailureFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Aggregates a list of checks into one HTTP response.
#[derive(Clone)]
pub struct HealthHandler {
    name: Arc<str>,
    checks: Arc<[Arc<dyn HealthChecker>]>,
    on_failure: FailureFn,
}

impl HealthHandler {
    /// Create a handler. An empty check list is replaced by a single `ping`.
    pub fn new<F>(name: impl Into<String>, on_failure: F, checks: Vec<Arc<dyn HealthChecker>>) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let checks = if checks.is_empty() { vec![ping()] } else { checks };
        Self {
            name: Arc::from(name.into()),
            checks: checks.into(),
            on_failure: Arc::new(on_failure),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the checks, in the order they run.
    pub fn check_names(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// Run every check in order and render the result.
    pub async fn respond(&self, req: &Parts) -> Response {
        let mut output = String::new();
        let mut failed_output = String::new();
        let mut failed = false;

        for check in self.checks.iter() {
            match check.check(req).await {
                Ok(()) => {
                    let _ = writeln!(output, "+ {} ok", check.name());
                }
                Err(err) => {
                    let _ = writeln!(output, "- {} failed", check.name());
                    let _ = writeln!(failed_output, "{} failed: {}", check.name(), err);
                    failed = true;
                }
            }
        }

        if failed {
            (self.on_failure)(&failed_output);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::X_CONTENT_TYPE_OPTIONS, "nosniff")],
                format!("{}{} check failed\n", output, self.name),
            )
                .into_response();
        }

        if !is_verbose(req) {
            return (StatusCode::OK, "ok").into_response();
        }

        (StatusCode::OK, format!("{}{} check passed", output, self.name)).into_response()
    }

    /// Mount the handler as a `GET` route.
    pub fn into_route(self) -> MethodRouter {
        get(move |req: Request| {
            let handler = self.clone();
            async move {
                let (parts, _body) = req.into_parts();
                handler.respond(&parts).await
            }
        })
    }
}

/// `?verbose` with any value (or none) requests the check listing.
fn is_verbose(req: &Parts) -> bool {
    Query::<HashMap<String, String>>::try_from_uri(&req.uri)
        .map(|Query(params)| params.contains_key("verbose"))
        .unwrap_or(false)
}
