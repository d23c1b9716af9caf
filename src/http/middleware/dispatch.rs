//! Scope request handling to the server's logger.
//!
//! Connections are served on their own tasks, which do not inherit the
//! dispatcher `Server::run` executes under. This layer re-applies it per
//! request so traces and health failure logs reach the configured logger.

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    Router,
};
use tracing::{instrument::WithSubscriber, Dispatch};

pub fn with_dispatch(router: Router, dispatch: Dispatch) -> Router {
    router.layer(middleware::from_fn_with_state(dispatch, scoped))
}

async fn scoped(State(dispatch): State<Dispatch>, req: Request, next: Next) -> Response {
    next.run(req).with_subscriber(dispatch).await
}
