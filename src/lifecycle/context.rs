//! Cancellation context handed to `Server::run` and post-start hooks.

use std::future::Future;

use tokio_util::sync::CancellationToken;

/// A cancellable context.
///
/// The server waits on [`RunContext::done`] to begin shutdown, and passes a
/// clone to every post-start hook. Applications can implement this on their
/// own context type so hooks receive it fully typed.
pub trait RunContext: Clone + Send + Sync + 'static {
    /// Resolves once the context is cancelled.
    fn done(&self) -> impl Future<Output = ()> + Send + '_;

    fn is_done(&self) -> bool;
}

impl RunContext for CancellationToken {
    fn done(&self) -> impl Future<Output = ()> + Send + '_ {
        self.cancelled()
    }

    fn is_done(&self) -> bool {
        self.is_cancelled()
    }
}
