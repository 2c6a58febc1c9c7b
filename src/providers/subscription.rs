//! Pending transaction subscription handle
//!
//! The feed side pushes hashes into an mpsc channel; the consumer owns the
//! receiver plus a one-shot release signal. Releasing is synchronous so it
//! can run from `Drop` when a watch is cancelled.

use tokio::sync::{mpsc, oneshot};

use crate::models::{AppResult, TxHash};

/// Consumer half of a pending transaction feed
#[derive(Debug)]
pub struct PendingTxSubscription {
    /// Server-side subscription id (or a mock label)
    id: String,
    hashes: mpsc::Receiver<AppResult<TxHash>>,
    release: Option<oneshot::Sender<()>>,
}

impl PendingTxSubscription {
    pub fn new(
        id: impl Into<String>,
        hashes: mpsc::Receiver<AppResult<TxHash>>,
        release: oneshot::Sender<()>,
    ) -> Self {
        Self {
            id: id.into(),
            hashes,
            release: Some(release),
        }
    }

    /// Build a subscription together with the producer handles
    pub fn channel(
        id: impl Into<String>,
        buffer: usize,
    ) -> (Self, mpsc::Sender<AppResult<TxHash>>, oneshot::Receiver<()>) {
        let (hash_tx, hash_rx) = mpsc::channel(buffer.max(1));
        let (release_tx, release_rx) = oneshot::channel();
        (Self::new(id, hash_rx, release_tx), hash_tx, release_rx)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Next hash from the feed. `None` once the producer is gone.
    pub async fn next(&mut self) -> Option<AppResult<TxHash>> {
        if self.release.is_none() {
            return None;
        }
        self.hashes.recv().await
    }

    /// Signal the producer to unsubscribe.
    ///
    /// Returns `true` only for the call that actually released the
    /// subscription; later calls are no-ops.
    pub fn unsubscribe(&mut self) -> bool {
        match self.release.take() {
            Some(release) => {
                // Producer may already be gone, nothing left to release then.
                let _ = release.send(());
                self.hashes.close();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }
}
