//! Shutdown coordination.

use std::time::Duration;

use axum_server::Handle;
use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain `handle` once `shutdown` fires (or its sender is gone).
///
/// In-flight requests get `grace` to finish before connections are dropped.
pub fn drain_on_shutdown(handle: Handle, mut shutdown: broadcast::Receiver<()>, grace: Duration) {
    tokio::spawn(async move {
        let _ = shutdown.recv().await;
        tracing::info!(grace_secs = grace.as_secs(), "Draining connections");
        handle.graceful_shutdown(Some(grace));
    });
}
