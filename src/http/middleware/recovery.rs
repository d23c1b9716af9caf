//! Panic recovery for request handlers.

use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::error::panic_message;

/// Turn handler panics into logged 500 responses.
pub fn with_recovery(router: Router) -> Router {
    router.layer(CatchPanicLayer::custom(handle_panic))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!(error = %panic_message(&err), "Panic while serving request");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}
