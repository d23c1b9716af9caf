//! One-shot broadcast signal.

use std::sync::Arc;

use tokio::sync::watch;

/// A latch that fires once and stays fired.
///
/// Clones share the same state; any clone may fire it or wait on it.
#[derive(Debug, Clone)]
pub struct Signal {
    tx: Arc<watch::Sender<bool>>,
}

impl Signal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Fire the signal. Firing twice is a no-op.
    pub fn fire(&self) {
        self.tx.send_if_modified(|fired| !std::mem::replace(fired, true));
    }

    pub fn is_fired(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the signal fires. Returns immediately if it already has.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot see a closed channel.
        let _ = rx.wait_for(|fired| *fired).await;
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}
