//! RPC Sentry Library
//!
//! Two pieces of chain plumbing:
//! - Sync checking: compare the block height of a main RPC endpoint
//!   against its peers, tolerating unreachable peers
//! - Mempool watching: subscribe to pending transactions and resolve the
//!   first one matching a caller predicate, releasing the subscription on
//!   every exit path

pub mod core;
pub mod models;
pub mod providers;
pub mod reporter;
pub mod sentry;
pub mod utils;

pub use crate::core::{
    async_predicate, predicate_fn, sent_from, sent_to, AllOf, MempoolWatcher, SyncChecker,
    TxPredicate,
};
pub use models::{
    Address, AppError, AppResult, BlockHeight, EndpointStatus, ErrorCode, SentryConfig,
    SyncClassification, SyncReport, SyncVerdict, Transaction, TxHash, WatchMode,
};
pub use providers::{Endpoint, EndpointTarget, PendingTxSubscription, RpcEndpoint};
pub use reporter::{ConsoleReporter, Reporter, SilentReporter};
pub use sentry::{check_rpc_sync, check_rpc_sync_with, wait_for_tx, WatchOptions};
