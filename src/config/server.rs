//! Runtime server configuration.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use tracing::Dispatch;

use crate::config::schema::ServerSettings;
use crate::observability::StatsSink;

pub const DEFAULT_READ_HEADER_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Called with the bound address once the listener is live.
pub type ListenObserver = Arc<dyn Fn(SocketAddr) + Send + Sync>;

/// Everything the server needs to run.
///
/// `handler`, `stats` and `log` are required; `Server::run` fails up front
/// when any of them is missing.
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Bind address. Empty means `0.0.0.0:80`, or `0.0.0.0:443` with TLS.
    pub addr: String,

    /// TLS material. Without it the server speaks clear-text HTTP/1 and HTTP/2.
    ///
    /// Clear-text HTTP/2 requires prior knowledge: clients must open with the
    /// HTTP/2 preface. The HTTP/1 `Upgrade: h2c` handshake is not supported.
    pub tls: Option<RustlsConfig>,

    /// Application handler, served for every path except the health endpoints.
    pub handler: Option<Router>,

    /// Time allowed to read request headers.
    pub read_header_timeout: Duration,

    /// Time allowed to read the request body.
    pub read_timeout: Duration,

    /// Time allowed to produce a response.
    pub write_timeout: Duration,

    /// HTTP/2 keep-alive interval for idle connections.
    pub idle_timeout: Duration,

    /// Graceful shutdown budget before connections are forcibly closed.
    pub shutdown_timeout: Duration,

    pub stats: Option<Arc<dyn StatsSink>>,

    pub log: Option<Dispatch>,

    pub on_listen: Option<ListenObserver>,
}

impl ServerConfig {
    /// Map file settings onto a config. TLS material and collaborators are
    /// left for the caller.
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            addr: settings.address.clone(),
            read_header_timeout: Duration::from_secs(settings.read_header_timeout_secs),
            read_timeout: Duration::from_secs(settings.read_timeout_secs),
            write_timeout: Duration::from_secs(settings.write_timeout_secs),
            idle_timeout: Duration::from_secs(settings.idle_timeout_secs),
            shutdown_timeout: Duration::from_secs(settings.shutdown_timeout_secs),
            ..Self::default()
        }
    }

    pub fn read_header_timeout(&self) -> Duration {
        with_default(self.read_header_timeout, DEFAULT_READ_HEADER_TIMEOUT)
    }

    pub fn read_timeout(&self) -> Duration {
        with_default(self.read_timeout, DEFAULT_READ_TIMEOUT)
    }

    pub fn write_timeout(&self) -> Duration {
        with_default(self.write_timeout, DEFAULT_WRITE_TIMEOUT)
    }

    pub fn idle_timeout(&self) -> Duration {
        with_default(self.idle_timeout, DEFAULT_IDLE_TIMEOUT)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        with_default(self.shutdown_timeout, DEFAULT_SHUTDOWN_TIMEOUT)
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("addr", &self.addr)
            .field("tls", &self.tls.is_some())
            .field("handler", &self.handler.is_some())
            .field("read_header_timeout", &self.read_header_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("stats", &self.stats.is_some())
            .field("log", &self.log.is_some())
            .finish_non_exhaustive()
    }
}

fn with_default(val: Duration, default: Duration) -> Duration {
    if val.is_zero() {
        default
    } else {
        val
    }
}
