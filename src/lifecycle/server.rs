//! Server lifecycle orchestration.
//!
//! # States
//! ```text
//! Configured → Listening → Starting → Running → ShuttingDown → Stopped
//! ```
//! `Starting` covers the window where post-start hooks are still in flight
//! and readiness is partial. A bind error goes straight to `Stopped`.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::Router;
use futures_util::future::join_all;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{instrument::WithSubscriber, Dispatch};

use super::context::RunContext;
use super::hooks::{PostStartHooks, PreShutdownHooks, ShutdownCheck};
use super::signal::Signal;
use crate::config::ServerConfig;
use crate::error::{BoxError, ConfigError, ServerError};
use crate::health::{CheckSet, HealthChecker, HealthHandler};
use crate::http::{self, with_stats};
use crate::observability::StatsSink;

/// Where a server is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Created, `run` not called yet.
    Configured,
    /// Listener bound.
    Listening,
    /// Post-start hooks running; readyz fails until they finish.
    Starting,
    /// All post-start hooks finished.
    Running,
    /// Context cancelled; pre-shutdown hooks and graceful close in progress.
    ShuttingDown,
    /// `run` is returning.
    Stopped,
}

/// An HTTP server with health endpoints and lifecycle hooks.
///
/// The server handles `/livez` and `/readyz` next to the configured handler,
/// and runs post-start and pre-shutdown hooks around the listener's life.
/// `C` is the context type handed to `run` and to every post-start hook.
pub struct Server<C = CancellationToken> {
    config: ServerConfig,

    readyz: CheckSet,
    livez: CheckSet,

    post_start: PostStartHooks<C>,
    pre_shutdown: PreShutdownHooks,

    started: AtomicBool,
    state: Arc<watch::Sender<ServerState>>,
}

impl<C: RunContext> Server<C> {
    pub fn new(config: ServerConfig) -> Self {
        let (state, _) = watch::channel(ServerState::Configured);
        Self {
            config,
            readyz: CheckSet::new("readyz"),
            livez: CheckSet::new("livez"),
            post_start: PostStartHooks::new(),
            pre_shutdown: PreShutdownHooks::new(),
            started: AtomicBool::new(false),
            state: Arc::new(state),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Add checks to both readyz and livez, panicking on error.
    pub fn must_add_healthz_checks<I>(&self, checks: I)
    where
        I: IntoIterator<Item = Arc<dyn HealthChecker>>,
    {
        if let Err(err) = self.add_healthz_checks(checks) {
            panic!("{}", err);
        }
    }

    /// Add checks to both readyz and livez.
    pub fn add_healthz_checks<I>(&self, checks: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = Arc<dyn HealthChecker>>,
    {
        let checks: Vec<_> = checks.into_iter().collect();
        self.add_readyz_checks(checks.iter().cloned())?;
        self.add_livez_checks(checks)
    }

    /// Add checks to readyz, panicking on error.
    pub fn must_add_readyz_checks<I>(&self, checks: I)
    where
        I: IntoIterator<Item = Arc<dyn HealthChecker>>,
    {
        if let Err(err) = self.add_readyz_checks(checks) {
            panic!("{}", err);
        }
    }

    /// Add checks to readyz. Fails once readyz has been installed by `run`.
    pub fn add_readyz_checks<I>(&self, checks: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = Arc<dyn HealthChecker>>,
    {
        self.readyz.add(checks)
    }

    /// Add checks to livez, panicking on error.
    pub fn must_add_livez_checks<I>(&self, checks: I)
    where
        I: IntoIterator<Item = Arc<dyn HealthChecker>>,
    {
        if let Err(err) = self.add_livez_checks(checks) {
            panic!("{}", err);
        }
    }

    /// Add checks to livez. Fails once livez has been installed by `run`.
    pub fn add_livez_checks<I>(&self, checks: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = Arc<dyn HealthChecker>>,
    {
        self.livez.add(checks)
    }

    /// Add a post-start hook, panicking on error.
    pub fn must_add_post_start_hook<F, Fut>(&self, name: &str, hook: F)
    where
        F: FnOnce(C) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        if let Err(err) = self.add_post_start_hook(name, hook) {
            panic!("{}", err);
        }
    }

    /// Add a hook run once the listener is live.
    ///
    /// Readyz reports the hook as failing until it has finished.
    pub fn add_post_start_hook<F, Fut>(&self, name: &str, hook: F) -> Result<(), ConfigError>
    where
        F: FnOnce(C) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.post_start.add(name, hook, &self.readyz)
    }

    /// Add a pre-shutdown hook, panicking on error.
    pub fn must_add_pre_shutdown_hook<F, Fut>(&self, name: &str, hook: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        if let Err(err) = self.add_pre_shutdown_hook(name, hook) {
            panic!("{}", err);
        }
    }

    /// Add a hook run after cancellation, before the listener closes.
    pub fn add_pre_shutdown_hook<F, Fut>(&self, name: &str, hook: F) -> Result<(), ConfigError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.pre_shutdown.add(name, hook)
    }

    /// Run the server, managing its full lifecycle, until `ctx` is done.
    ///
    /// If the server fails to start, e.g. on a bind error, no hooks are run.
    pub async fn run(&self, ctx: C) -> Result<(), ServerError> {
        let handler = self.config.handler.clone().ok_or(ConfigError::MissingHandler)?;
        let stats = self.config.stats.clone().ok_or(ConfigError::MissingStats)?;
        let log = self.config.log.clone().ok_or(ConfigError::MissingLog)?;

        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ConfigError::AlreadyRun.into());
        }

        self.run_with(ctx, handler, stats, log.clone())
            .with_subscriber(log)
            .await
    }

    async fn run_with(
        &self,
        ctx: C,
        handler: Router,
        stats: Arc<dyn StatsSink>,
        log: Dispatch,
    ) -> Result<(), ServerError> {
        let shutdown = Signal::new();
        let routes = self.install_checks(handler, &stats, &shutdown);
        let app = http::server::build_app(routes, &self.config, log);

        let stop = Signal::new();
        let serving = match http::server::serve(&self.config, app, stop.clone()).await {
            Ok(serving) => serving,
            Err(err) => {
                self.set_state(ServerState::Stopped);
                return Err(ServerError::Bind(err));
            }
        };
        self.set_state(ServerState::Listening);

        self.drive(ctx, serving, stop, shutdown).await
    }

    /// Everything after a successful bind: hooks, the main wait, shutdown.
    async fn drive(
        &self,
        ctx: C,
        serving: http::server::Serving,
        stop: Signal,
        shutdown: Signal,
    ) -> Result<(), ServerError> {
        tracing::debug!(address = %serving.addr, "Running post-start hooks");

        let hooks_done = self.post_start.run(&ctx);
        self.set_state(ServerState::Starting);
        let started = tokio::spawn(mark_running(self.state.clone(), hooks_done));

        tokio::select! {
            _ = serving.stopped.wait() => {
                tracing::error!(address = %serving.addr, "Server stopped prematurely");
                started.abort();
                shutdown.fire();
                stop.fire();
                self.set_state(ServerState::Stopped);
                return Err(ServerError::StoppedPrematurely);
            }
            _ = ctx.done() => {}
        }

        tracing::info!("Shutting the server down...");
        started.abort();
        self.set_state(ServerState::ShuttingDown);

        let (ran, hooks_result) = self.pre_shutdown.run().await;
        if ran > 0 {
            tracing::info!(hooks = ran, "Pre-shutdown hooks completed");
        }

        // Readyz must fail before the listener starts closing.
        shutdown.fire();
        stop.fire();

        serving.shutdown_done.wait().await;
        serving.stopped.wait().await;
        self.set_state(ServerState::Stopped);

        hooks_result.map_err(ServerError::PreShutdown)
    }

    /// Mount `/livez` and `/readyz` in front of `handler`, latching both sets.
    fn install_checks(
        &self,
        handler: Router,
        stats: &Arc<dyn StatsSink>,
        shutdown: &Signal,
    ) -> Router {
        let livez = self.install_endpoint(&self.livez, stats);

        let shutdown_check = ShutdownCheck {
            shutdown: shutdown.clone(),
        };
        if let Err(err) = self.readyz.add([Arc::new(shutdown_check) as Arc<dyn HealthChecker>]) {
            tracing::error!(error = %err, "Could not install readyz shutdown check");
        }
        let readyz = self.install_endpoint(&self.readyz, stats);

        Router::new()
            .merge(livez)
            .merge(readyz)
            .fallback_service(with_stats("app", stats.clone(), handler))
    }

    fn install_endpoint(&self, set: &CheckSet, stats: &Arc<dyn StatsSink>) -> Router {
        let name = set.name();
        let path = format!("/{}", name);

        let handler = HealthHandler::new(
            name,
            move |output: &str| tracing::info!("{} check failed\n{}", name, output),
            set.install(),
        );

        tracing::info!(
            path = %path,
            checks = %handler.check_names().join(","),
            "Installing health checkers"
        );

        with_stats(name, stats.clone(), Router::new().route(&path, handler.into_route()))
    }

    fn set_state(&self, state: ServerState) {
        self.state.send_replace(state);
    }
}

/// Move `Starting` to `Running` once every post-start hook has finished.
async fn mark_running(state: Arc<watch::Sender<ServerState>>, hooks_done: Vec<Signal>) {
    join_all(hooks_done.iter().map(Signal::wait)).await;
    state.send_if_modified(|current| {
        if *current == ServerState::Starting {
            *current = ServerState::Running;
            true
        } else {
            false
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::named_check;
    use crate::observability::NoopStats;
    use axum::{
        body::{to_bytes, Body},
        extract::Request,
        http::StatusCode,
        routing::get,
    };
    use tower::ServiceExt;

    fn server() -> Server {
        Server::new(ServerConfig {
            handler: Some(Router::new().route("/", get(|| async { "app" }))),
            stats: Some(Arc::new(NoopStats)),
            log: Some(Dispatch::none()),
            ..ServerConfig::default()
        })
    }

    fn routes(srv: &Server, shutdown: &Signal) -> Router {
        let handler = srv.config.handler.clone().unwrap();
        let stats = srv.config.stats.clone().unwrap();
        srv.install_checks(handler, &stats, shutdown)
    }

    async fn get_body(router: &Router, uri: &str) -> (StatusCode, String) {
        let res = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn run_requires_collaborators() {
        let cases = [
            (
                ServerConfig {
                    stats: Some(Arc::new(NoopStats)),
                    log: Some(Dispatch::none()),
                    ..ServerConfig::default()
                },
                ConfigError::MissingHandler,
            ),
            (
                ServerConfig {
                    handler: Some(Router::new()),
                    log: Some(Dispatch::none()),
                    ..ServerConfig::default()
                },
                ConfigError::MissingStats,
            ),
            (
                ServerConfig {
                    handler: Some(Router::new()),
                    stats: Some(Arc::new(NoopStats)),
                    ..ServerConfig::default()
                },
                ConfigError::MissingLog,
            ),
        ];

        for (config, want) in cases {
            let srv: Server = Server::new(config);
            match srv.run(CancellationToken::new()).await {
                Err(ServerError::Config(got)) => assert_eq!(got, want),
                other => panic!("expected {:?}, got {:?}", want, other),
            }
            assert_eq!(srv.state(), ServerState::Configured);
            assert!(!srv.readyz.is_installed());
        }
    }

    #[tokio::test]
    async fn installed_routes_serve_health_and_app() {
        let srv = server();
        srv.must_add_healthz_checks([named_check("test", |_| Ok(()))]);
        srv.must_add_post_start_hook("test", |_| async { Ok(()) });
        let shutdown = Signal::new();

        let router = routes(&srv, &shutdown);

        assert_eq!(get_body(&router, "/").await, (StatusCode::OK, "app".to_string()));
        assert_eq!(
            get_body(&router, "/livez?verbose=1").await,
            (StatusCode::OK, "+ test ok\nlivez check passed".to_string())
        );
        let (status, body) = get_body(&router, "/readyz?verbose=1").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            "+ test ok\n- postStartHook:test failed\n+ shutdown ok\nreadyz check failed\n"
        );
    }

    #[tokio::test]
    async fn readyz_fails_once_shutdown_begins() {
        let srv = server();
        let shutdown = Signal::new();
        let router = routes(&srv, &shutdown);

        assert_eq!(get_body(&router, "/readyz").await, (StatusCode::OK, "ok".to_string()));

        shutdown.fire();

        for uri in ["/readyz", "/readyz?verbose"] {
            let (status, body) = get_body(&router, uri).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, "- shutdown failed\nreadyz check failed\n");
        }
        assert_eq!(get_body(&router, "/livez").await, (StatusCode::OK, "ok".to_string()));
    }

    #[tokio::test]
    async fn empty_sets_install_ping() {
        let srv = server();
        let router = routes(&srv, &Signal::new());

        assert_eq!(
            get_body(&router, "/livez?verbose").await,
            (StatusCode::OK, "+ ping ok\nlivez check passed".to_string())
        );
    }

    #[tokio::test]
    async fn registration_fails_after_install() {
        let srv = server();
        let _ = routes(&srv, &Signal::new());

        let check = named_check("late", |_| Ok(()));
        assert_eq!(
            srv.add_readyz_checks([check.clone()]),
            Err(ConfigError::ChecksInstalled("readyz"))
        );
        assert_eq!(
            srv.add_livez_checks([check.clone()]),
            Err(ConfigError::ChecksInstalled("livez"))
        );
        assert_eq!(
            srv.add_healthz_checks([check]),
            Err(ConfigError::ChecksInstalled("readyz"))
        );
        assert_eq!(
            srv.add_post_start_hook("late", |_| async { Ok(()) }),
            Err(ConfigError::ChecksInstalled("readyz"))
        );
    }

    #[test]
    #[should_panic(expected = "name is required")]
    fn must_variants_panic() {
        server().must_add_pre_shutdown_hook("", || async { Ok(()) });
    }

    #[tokio::test]
    async fn serve_ending_early_is_reported_without_shutdown_hooks() {
        let srv = server();
        let pre_shutdown_calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let calls = pre_shutdown_calls.clone();
        srv.must_add_pre_shutdown_hook("drain", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let shutdown = Signal::new();
        let router = routes(&srv, &shutdown);

        let serving = http::server::Serving {
            addr: "127.0.0.1:0".parse().unwrap(),
            stopped: Signal::new(),
            shutdown_done: Signal::new(),
        };
        serving.stopped.fire();
        let stop = Signal::new();
        let ctx = CancellationToken::new();

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            srv.drive(ctx.clone(), serving, stop.clone(), shutdown.clone()),
        )
        .await
        .expect("drive should return");

        assert!(matches!(result, Err(ServerError::StoppedPrematurely)), "{:?}", result);
        assert!(!ctx.is_cancelled());
        assert!(shutdown.is_fired());
        assert!(stop.is_fired());
        assert_eq!(srv.state(), ServerState::Stopped);
        assert_eq!(pre_shutdown_calls.load(Ordering::SeqCst), 0);

        let (status, body) = get_body(&router, "/readyz").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "- shutdown failed\nreadyz check failed\n");
    }

    #[tokio::test]
    async fn mark_running_waits_for_hooks() {
        let (tx, _) = watch::channel(ServerState::Starting);
        let state = Arc::new(tx);
        let hook = Signal::new();
        let task = tokio::spawn(mark_running(state.clone(), vec![hook.clone()]));

        tokio::task::yield_now().await;
        assert_eq!(*state.borrow(), ServerState::Starting);

        hook.fire();
        task.await.unwrap();
        assert_eq!(*state.borrow(), ServerState::Running);
    }

    #[tokio::test]
    async fn mark_running_leaves_later_states_alone() {
        let (tx, _) = watch::channel(ServerState::ShuttingDown);
        let state = Arc::new(tx);

        mark_running(state.clone(), Vec::new()).await;

        assert_eq!(*state.borrow(), ServerState::ShuttingDown);
    }
}
