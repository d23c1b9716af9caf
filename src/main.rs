//! Demo service built on the lifecycle shell.
//!
//! Serves a greeting next to `/readyz` and `/livez`, registers a warm-up
//! post-start hook and a drain pre-shutdown hook, and shuts down gracefully
//! on SIGINT / SIGTERM.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use clap::Parser;

use service_lifecycle::config::{self, Settings};
use service_lifecycle::health::named_check;
use service_lifecycle::http::{with_recovery, with_request_id};
use service_lifecycle::lifecycle::signals::cancel_on_signal;
use service_lifecycle::observability::{logging, metrics, MetricsSink};
use service_lifecycle::{net, BoxError, CancellationToken, Server, ServerConfig};

#[derive(Parser)]
#[command(name = "service-lifecycle")]
#[command(about = "Demo HTTP service with health endpoints and lifecycle hooks", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter, overriding the config file (e.g. "debug").
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => config::load_config(path)?,
        None => Settings::default(),
    };
    if let Some(filter) = args.log_level {
        settings.log.filter = filter;
    }

    let log = logging::init(&settings.log);
    tracing::info!("service-lifecycle v{} starting", env!("CARGO_PKG_VERSION"));

    if settings.metrics.enabled {
        match settings.metrics.address.parse() {
            Ok(addr) => metrics::init_prometheus(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %settings.metrics.address,
                "Failed to parse metrics address"
            ),
        }
    }

    let app = Router::new().route("/", get(|| async { "hello\n" }));

    let mut server_config = ServerConfig::from_settings(&settings.server);
    server_config.handler = Some(with_recovery(with_request_id(app)));
    server_config.stats = Some(Arc::new(MetricsSink));
    server_config.log = Some(log);
    if let Some(tls) = &settings.server.tls {
        let rustls = net::load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?;
        server_config.tls = Some(rustls);
    }
    server_config.on_listen = Some(Arc::new(|addr: SocketAddr| {
        tracing::info!(address = %addr, "Listening for connections");
    }));

    let server: Server = Server::new(server_config);

    let warm = Arc::new(AtomicBool::new(false));
    let warmed = warm.clone();
    server.add_healthz_checks([named_check("warm-cache", move |_| {
        if warmed.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err("cache is cold".into())
        }
    })])?;

    server.add_post_start_hook("warm-cache", move |ctx: CancellationToken| async move {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(500)) => {}
            _ = ctx.cancelled() => return Err::<(), BoxError>("cancelled while warming".into()),
        }
        warm.store(true, Ordering::Release);
        tracing::info!("Cache warmed");
        Ok(())
    })?;

    server.add_pre_shutdown_hook("drain", || async {
        tracing::info!("Draining before shutdown");
        Ok(())
    })?;

    let ctx = CancellationToken::new();
    cancel_on_signal(ctx.clone());

    server.run(ctx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
