//! Post-start and pre-shutdown hook registries.
//!
//! # Execution
//! ```text
//! post-start:   all hooks spawned at once after the listener is live;
//!               each fires its done signal when finished, even on error
//!               or panic, which releases its readyz gate
//! pre-shutdown: hooks run one after another in registration order;
//!               errors and panics are collected and joined
//! ```
//!
//! Both registries latch once their hooks have been called; registering
//! afterwards is an error.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use axum::http::request::Parts;
use futures_util::future::{BoxFuture, FutureExt};
use tracing::instrument::WithSubscriber;

use super::context::RunContext;
use super::signal::Signal;
use crate::error::{panic_message, BoxError, ConfigError, HookError, HookErrors};
use crate::health::{CheckSet, HealthChecker};

/// Future returned by a hook.
pub type HookFuture = BoxFuture<'static, Result<(), BoxError>>;

type PostStartFn<C> = Box<dyn FnOnce(C) -> HookFuture + Send>;
type PreShutdownFn = Box<dyn FnOnce() -> HookFuture + Send>;

struct PostStartEntry<C> {
    name: String,
    run: PostStartFn<C>,
    done: Signal,
}

struct PreShutdownEntry {
    name: String,
    run: PreShutdownFn,
}

/// Named hooks in registration order, plus the "called" latch.
struct Registry<T> {
    called: bool,
    names: Vec<String>,
    hooks: Vec<T>,
}

impl<T> Registry<T> {
    fn new() -> Self {
        Self {
            called: false,
            names: Vec::new(),
            hooks: Vec::new(),
        }
    }

    fn check_add(&self, name: &str) -> Result<(), ConfigError> {
        if self.called {
            return Err(ConfigError::HooksCalled);
        }
        if self.names.iter().any(|n| n == name) {
            return Err(ConfigError::DuplicateHook(name.to_string()));
        }
        Ok(())
    }

    fn push(&mut self, name: &str, hook: T) {
        self.names.push(name.to_string());
        self.hooks.push(hook);
    }

    fn take(&mut self) -> Vec<T> {
        self.called = true;
        std::mem::take(&mut self.hooks)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn validate_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::EmptyHookName);
    }
    Ok(())
}

/// Hooks run once the listener is accepting connections.
pub(crate) struct PostStartHooks<C> {
    registry: Mutex<Registry<PostStartEntry<C>>>,
}

impl<C: RunContext> PostStartHooks<C> {
    pub(crate) fn new() -> Self {
        Self {
            registry: Mutex::new(Registry::new()),
        }
    }

    /// Register a hook and gate readiness on its completion.
    pub(crate) fn add<F, Fut>(&self, name: &str, hook: F, readyz: &CheckSet) -> Result<(), ConfigError>
    where
        F: FnOnce(C) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        validate_name(name)?;

        let mut registry = lock(&self.registry);
        registry.check_add(name)?;

        let done = Signal::new();
        readyz.add([Arc::new(PostStartHookCheck {
            name: format!("postStartHook:{}", name),
            done: done.clone(),
        }) as Arc<dyn HealthChecker>])?;

        registry.push(
            name,
            PostStartEntry {
                name: name.to_string(),
                run: Box::new(move |ctx| hook(ctx).boxed()),
                done,
            },
        );
        Ok(())
    }

    /// Latch the registry and spawn every hook. Returns their done signals.
    pub(crate) fn run(&self, ctx: &C) -> Vec<Signal> {
        let hooks = lock(&self.registry).take();

        hooks
            .into_iter()
            .map(|entry| {
                let done = entry.done.clone();
                tokio::spawn(run_post_start_hook(ctx.clone(), entry).with_current_subscriber());
                done
            })
            .collect()
    }
}

async fn run_post_start_hook<C>(ctx: C, entry: PostStartEntry<C>) {
    let PostStartEntry { name, run, done } = entry;

    tracing::info!(hook = %name, "Running post-start hook");

    match AssertUnwindSafe(async move { run(ctx).await }).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            tracing::error!(hook = %name, error = %err, "Could not run post-start hook");
        }
        Err(panic) => {
            tracing::error!(hook = %name, error = %panic_message(&panic), "Panic while running post-start hook");
        }
    }

    done.fire();
}

/// Hooks run after cancellation, before the listener closes.
pub(crate) struct PreShutdownHooks {
    registry: Mutex<Registry<PreShutdownEntry>>,
}

impl PreShutdownHooks {
    pub(crate) fn new() -> Self {
        Self {
            registry: Mutex::new(Registry::new()),
        }
    }

    pub(crate) fn add<F, Fut>(&self, name: &str, hook: F) -> Result<(), ConfigError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        validate_name(name)?;

        let mut registry = lock(&self.registry);
        registry.check_add(name)?;
        registry.push(
            name,
            PreShutdownEntry {
                name: name.to_string(),
                run: Box::new(move || hook().boxed()),
            },
        );
        Ok(())
    }

    /// Latch the registry and run every hook in order.
    ///
    /// Returns how many hooks ran and the joined failures.
    pub(crate) async fn run(&self) -> (usize, Result<(), HookErrors>) {
        let hooks = lock(&self.registry).take();
        let count = hooks.len();

        let mut errors = HookErrors::default();
        for entry in hooks {
            if let Err(err) = run_pre_shutdown_hook(entry).await {
                errors.push(err);
            }
        }

        (count, errors.into_result())
    }
}

async fn run_pre_shutdown_hook(entry: PreShutdownEntry) -> Result<(), HookError> {
    let PreShutdownEntry { name, run } = entry;

    tracing::info!(hook = %name, "Running pre-shutdown hook");

    match AssertUnwindSafe(async move { run().await }).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) => {
            tracing::error!(hook = %name, error = %source, "Pre-shutdown hook failed");
            Err(HookError::Failed { name, source })
        }
        Err(panic) => {
            let message = panic_message(&panic);
            tracing::error!(hook = %name, error = %message, "Panic while running pre-shutdown hook");
            Err(HookError::Panicked { name, message })
        }
    }
}

/// Readyz check that fails until its post-start hook has finished.
struct PostStartHookCheck {
    name: String,
    done: Signal,
}

#[async_trait]
impl HealthChecker for PostStartHookCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, _req: &Parts) -> Result<(), BoxError> {
        if self.done.is_fired() {
            Ok(())
        } else {
            Err("not finished".into())
        }
    }
}

/// Readyz check that fails once shutdown has begun.
pub(crate) struct ShutdownCheck {
    pub(crate) shutdown: Signal,
}

#[async_trait]
impl HealthChecker for ShutdownCheck {
    fn name(&self) -> &str {
        "shutdown"
    }

    async fn check(&self, _req: &Parts) -> Result<(), BoxError> {
        if self.shutdown.is_fired() {
            Err("server is shutting down".into())
        } else {
            Ok(())
        }
    }
}
