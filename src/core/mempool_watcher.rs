//! Mempool watcher
//!
//! Subscribes to pending transaction hashes, resolves each one, runs the
//! caller's predicate and returns the first transaction that satisfies it.
//!
//! Lookups for different hashes run concurrently on the caller's task; the
//! first evaluation to *complete* with a match wins, regardless of the
//! order in which hashes were announced. The subscription is owned by a
//! `WatchSession` and released exactly once, on match, on error, or when the
//! caller drops the future (timeout, `select!`, task abort).

use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::predicate::TxPredicate;
use crate::models::{
    AppError, AppResult, ErrorCode, Transaction, TransactionResponse, TxHash, WatchMode,
};
use crate::providers::{Endpoint, PendingTxSubscription};
use crate::utils::constants::DEFAULT_MAX_IN_FLIGHT;

/// Live subscription plus bookkeeping for one `watch` call
struct WatchSession {
    id: Uuid,
    subscription: PendingTxSubscription,
    resolved: bool,
}

impl WatchSession {
    fn new(subscription: PendingTxSubscription) -> Self {
        Self {
            id: Uuid::new_v4(),
            subscription,
            resolved: false,
        }
    }

    /// Mark the session resolved. Only the first call counts.
    fn resolve(&mut self) -> bool {
        if self.resolved {
            return false;
        }
        self.resolved = true;
        true
    }

    fn teardown(&mut self, reason: &str) {
        if self.subscription.unsubscribe() {
            debug!(
                "🔕 Watch session {} released subscription {} ({})",
                self.id,
                self.subscription.id(),
                reason
            );
        }
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        let reason = if self.resolved { "resolved" } else { "cancelled" };
        self.teardown(reason);
    }
}

/// Push-driven pending transaction watcher bound to one endpoint
pub struct MempoolWatcher {
    endpoint: Arc<dyn Endpoint>,
    max_in_flight: usize,
}

impl MempoolWatcher {
    pub fn new(endpoint: Arc<dyn Endpoint>) -> Self {
        Self {
            endpoint,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    /// Cap on concurrent lookups; the feed is not read while the cap is hit
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    pub fn endpoint(&self) -> &Arc<dyn Endpoint> {
        &self.endpoint
    }

    /// Resolve with the first pending transaction matching `predicate`
    pub async fn watch<P>(&self, predicate: &P, mode: WatchMode) -> AppResult<Transaction>
    where
        P: TxPredicate + ?Sized,
    {
        match mode {
            WatchMode::Fast => self.watch_subscription(predicate).await,
            WatchMode::Cheap => Err(AppError::unsupported_mode(mode.as_str())),
        }
    }

    async fn watch_subscription<P>(&self, predicate: &P) -> AppResult<Transaction>
    where
        P: TxPredicate + ?Sized,
    {
        let subscription = self.endpoint.subscribe_pending_transactions().await?;
        let mut session = WatchSession::new(subscription);
        info!(
            "👀 Watch session {} listening on {}",
            session.id,
            self.endpoint.label()
        );

        // Declared after the session so pending lookups are dropped before
        // the subscription is released.
        let mut in_flight: FuturesUnordered<BoxFuture<'_, AppResult<Option<Transaction>>>> =
            FuturesUnordered::new();
        let mut feed_open = true;
        let mut seen: u64 = 0;

        loop {
            tokio::select! {
                Some(outcome) = in_flight.next(), if !in_flight.is_empty() => {
                    match outcome {
                        Ok(Some(tx)) => {
                            if session.resolve() {
                                session.teardown("matched");
                                info!(
                                    "🎯 Watch session {} matched {} after {} hashes",
                                    session.id, tx.tx_hash(), seen
                                );
                                return Ok(tx);
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            session.teardown("predicate error");
                            return Err(e);
                        }
                    }
                }
                next = session.subscription.next(), if feed_open && in_flight.len() < self.max_in_flight => {
                    match next {
                        Some(Ok(hash)) => {
                            seen += 1;
                            in_flight.push(Box::pin(self.evaluate(hash, predicate)));
                        }
                        Some(Err(e)) => {
                            warn!("❌ Watch session {} feed error: {}", session.id, e);
                            session.teardown("feed error");
                            return Err(into_feed_error(e));
                        }
                        None => {
                            debug!("Watch session {} feed ended, draining {} lookups", session.id, in_flight.len());
                            feed_open = false;
                        }
                    }
                }
                else => {
                    session.teardown("feed closed");
                    return Err(AppError::feed_error("Pending transaction feed closed without a match"));
                }
            }
        }
    }

    /// Resolve one hash and run the predicate.
    ///
    /// Unknown hashes and failed lookups are skipped; predicate errors are
    /// returned.
    async fn evaluate<P>(&self, hash: TxHash, predicate: &P) -> AppResult<Option<Transaction>>
    where
        P: TxPredicate + ?Sized,
    {
        let tx = match self.endpoint.get_transaction(hash).await {
            Ok(Some(tx)) => tx,
            Ok(None) => {
                debug!("Transaction {} no longer pending, skipping", hash);
                return Ok(None);
            }
            Err(e) => {
                debug!("Error fetching tx {}: {}", hash, e);
                return Ok(None);
            }
        };

        match predicate.matches(&tx).await {
            Ok(true) => Ok(Some(tx)),
            Ok(false) => Ok(None),
            Err(e) => Err(AppError::with_source(
                ErrorCode::PredicateFailed,
                format!("Predicate failed on {}", hash),
                e,
            )),
        }
    }
}

/// Keep feed failures under one code, whatever the transport reported
fn into_feed_error(e: AppError) -> AppError {
    if e.code == ErrorCode::FeedError {
        e
    } else {
        let message = e.message.clone();
        AppError::with_source(ErrorCode::FeedError, message, e)
    }
}
