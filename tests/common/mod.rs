//! Shared helpers for lifecycle integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{routing::get, Router};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::Dispatch;

use service_lifecycle::observability::NoopStats;
use service_lifecycle::{RunContext, Server, ServerConfig, ServerError};

/// How long a test waits on anything before giving up.
pub const WAIT: Duration = Duration::from_secs(5);

/// A handler answering `GET /` with `"app"`.
pub fn app() -> Router {
    Router::new().route("/", get(|| async { "app" }))
}

/// Config bound to an ephemeral loopback port. The receiver yields the
/// bound address once the listener is live.
pub fn test_config(handler: Router) -> (ServerConfig, oneshot::Receiver<SocketAddr>) {
    let (tx, rx) = oneshot::channel();
    let tx = Mutex::new(Some(tx));

    let config = ServerConfig {
        addr: "127.0.0.1:0".to_string(),
        handler: Some(handler),
        stats: Some(Arc::new(NoopStats)),
        log: Some(Dispatch::none()),
        shutdown_timeout: Duration::from_secs(2),
        on_listen: Some(Arc::new(move |addr: SocketAddr| {
            if let Some(tx) = tx.lock().unwrap().take() {
                let _ = tx.send(addr);
            }
        })),
        ..ServerConfig::default()
    };
    (config, rx)
}

/// A server running in a background task.
pub struct Running {
    pub addr: SocketAddr,
    pub task: JoinHandle<Result<(), ServerError>>,
}

impl Running {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Wait for `run` to return.
    pub async fn join(self) -> Result<(), ServerError> {
        tokio::time::timeout(WAIT, self.task)
            .await
            .expect("server did not stop in time")
            .expect("server task panicked")
    }
}

/// Spawn `server.run(ctx)` and wait until it is listening.
pub async fn start<C: RunContext>(
    server: Arc<Server<C>>,
    ctx: C,
    listening: oneshot::Receiver<SocketAddr>,
) -> Running {
    let task = tokio::spawn(async move { server.run(ctx).await });
    let addr = tokio::time::timeout(WAIT, listening)
        .await
        .expect("server did not start listening")
        .expect("listener observer dropped");
    Running { addr, task }
}

/// `GET url`, returning status and body. Connections are not pooled so a
/// stopped server is never masked by a kept-alive connection.
pub async fn get_text(url: &str) -> (u16, String) {
    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap();
    let res = client.get(url).send().await.unwrap();
    let status = res.status().as_u16();
    (status, res.text().await.unwrap())
}
