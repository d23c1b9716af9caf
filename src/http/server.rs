//! HTTP server setup and serving.
//!
//! # Responsibilities
//! - Wrap the route tree with timeouts, tracing and log scoping
//! - Bind the listener and serve HTTP/1.1 and HTTP/2 (clear text or TLS)
//! - Run the serve task and the shutdown watcher task
//!
//! # Design Decisions
//! - The serve task fires `stopped` whenever serving ends, for any reason;
//!   the caller decides whether that was expected
//! - Shutdown is graceful up to the shutdown timeout, then connections are
//!   closed forcibly

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;

use axum::Router;
use axum_server::Handle;
use hyper_util::{
    rt::{TokioExecutor, TokioTimer},
    server::conn::auto,
};
use tower::ServiceBuilder;
use tower_http::{
    timeout::{RequestBodyTimeoutLayer, TimeoutLayer},
    trace::TraceLayer,
};
use tracing::{instrument::WithSubscriber, Dispatch};

use super::middleware::with_dispatch;
use crate::config::ServerConfig;
use crate::lifecycle::Signal;
use crate::net;

type ServeFuture = Pin<Box<dyn Future<Output = std::io::Result<()>> + Send>>;

/// A live server: its bound address and completion signals.
#[derive(Debug)]
pub(crate) struct Serving {
    pub addr: SocketAddr,
    /// Fired when the serve task returns.
    pub stopped: Signal,
    /// Fired when the shutdown watcher has finished closing the server.
    pub shutdown_done: Signal,
}

/// Wrap the route tree with the server-wide layers.
#[allow(deprecated)]
pub(crate) fn build_app(router: Router, config: &ServerConfig, log: Dispatch) -> Router {
    let router = router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(config.write_timeout()))
            .layer(RequestBodyTimeoutLayer::new(config.read_timeout())),
    );
    with_dispatch(router, log)
}

/// Bind the listener and start the serve and shutdown watcher tasks.
///
/// Returns once the listener is bound; a bind error means nothing was started.
/// Firing `stop` begins the graceful shutdown.
pub(crate) async fn serve(config: &ServerConfig, app: Router, stop: Signal) -> std::io::Result<Serving> {
    let addr = net::listen_address(&config.addr, config.tls.is_some());
    let (listener, local_addr) = net::bind(&addr).await?;

    if let Some(observe) = &config.on_listen {
        observe(local_addr);
    }

    let handle = Handle::new();
    let make_service = app.into_make_service();
    let serve: ServeFuture = match &config.tls {
        Some(tls) => {
            let mut server =
                axum_server::tls_rustls::from_tcp_rustls(listener, tls.clone()).handle(handle.clone());
            configure(server.http_builder(), config);
            Box::pin(server.serve(make_service))
        }
        None => {
            let mut server = axum_server::from_tcp(listener).handle(handle.clone());
            configure(server.http_builder(), config);
            Box::pin(server.serve(make_service))
        }
    };

    tracing::info!(address = %local_addr, tls = config.tls.is_some(), "Serving");

    let stopped = Signal::new();
    tokio::spawn(
        {
            let stopped = stopped.clone();
            async move {
                match serve.await {
                    Ok(()) => tracing::info!(address = %local_addr, "Stopped serving"),
                    Err(err) => tracing::error!(address = %local_addr, error = %err, "Stopped serving"),
                }
                stopped.fire();
            }
        }
        .with_current_subscriber(),
    );

    let shutdown_done = Signal::new();
    let timeout = config.shutdown_timeout();
    tokio::spawn(
        {
            let stopped = stopped.clone();
            let shutdown_done = shutdown_done.clone();
            async move {
                stop.wait().await;

                handle.graceful_shutdown(Some(timeout));
                if tokio::time::timeout(timeout, stopped.wait()).await.is_err() {
                    tracing::warn!(timeout = ?timeout, "Graceful shutdown timed out, closing connections");
                    handle.shutdown();
                }

                shutdown_done.fire();
            }
        }
        .with_current_subscriber(),
    );

    Ok(Serving {
        addr: local_addr,
        stopped,
        shutdown_done,
    })
}

/// Apply header-read and keep-alive timeouts to the connection builder.
fn configure(builder: &mut auto::Builder<TokioExecutor>, config: &ServerConfig) {
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(config.read_header_timeout());
    builder
        .http2()
        .timer(TokioTimer::new())
        .keep_alive_interval(config.idle_timeout());
}
