//! Transaction predicates for the mempool watcher
//!
//! A predicate may be a plain closure or may itself need I/O (e.g. to look
//! up a contract), so the trait is async. Errors are not swallowed: they end
//! the watch session.

use async_trait::async_trait;
use std::future::Future;

use crate::models::{Address, AppResult, Transaction, TransactionResponse, TransactionTrait};

/// Condition a pending transaction has to satisfy
#[async_trait]
pub trait TxPredicate: Send + Sync {
    async fn matches(&self, tx: &Transaction) -> AppResult<bool>;
}

/// Synchronous closure predicate
pub struct FnPredicate<F>(F);

/// Build a predicate from `Fn(&Transaction) -> bool`
pub fn predicate_fn<F>(f: F) -> FnPredicate<F>
where
    F: Fn(&Transaction) -> bool + Send + Sync,
{
    FnPredicate(f)
}

#[async_trait]
impl<F> TxPredicate for FnPredicate<F>
where
    F: Fn(&Transaction) -> bool + Send + Sync,
{
    async fn matches(&self, tx: &Transaction) -> AppResult<bool> {
        Ok((self.0)(tx))
    }
}

/// Async closure predicate. Receives an owned copy of the transaction.
pub struct AsyncPredicate<F>(F);

/// Build a predicate from `Fn(Transaction) -> impl Future<Output = AppResult<bool>>`
pub fn async_predicate<F, Fut>(f: F) -> AsyncPredicate<F>
where
    F: Fn(Transaction) -> Fut + Send + Sync,
    Fut: Future<Output = AppResult<bool>> + Send + 'static,
{
    AsyncPredicate(f)
}

#[async_trait]
impl<F, Fut> TxPredicate for AsyncPredicate<F>
where
    F: Fn(Transaction) -> Fut + Send + Sync,
    Fut: Future<Output = AppResult<bool>> + Send + 'static,
{
    async fn matches(&self, tx: &Transaction) -> AppResult<bool> {
        (self.0)(tx.clone()).await
    }
}

/// Matches transactions sent to `address`. Contract creations never match.
pub fn sent_to(address: Address) -> impl TxPredicate {
    predicate_fn(move |tx: &Transaction| tx.to() == Some(address))
}

/// Matches transactions sent from `address`
pub fn sent_from(address: Address) -> impl TxPredicate {
    predicate_fn(move |tx: &Transaction| tx.from() == address)
}

/// Both predicates must hold. The second one is skipped when the first fails.
pub struct AllOf<A, B>(pub A, pub B);

#[async_trait]
impl<A, B> TxPredicate for AllOf<A, B>
where
    A: TxPredicate,
    B: TxPredicate,
{
    async fn matches(&self, tx: &Transaction) -> AppResult<bool> {
        if !self.0.matches(tx).await? {
            return Ok(false);
        }
        self.1.matches(tx).await
    }
}
