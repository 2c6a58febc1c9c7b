//! Endpoint abstraction
//!
//! The sync checker and the mempool watcher only talk to `dyn Endpoint`.
//! `EndpointTarget` normalizes the accepted endpoint representations
//! (URL string or ready handle) into that single handle type.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use super::rpc::RpcEndpoint;
use super::subscription::PendingTxSubscription;
use crate::models::{AppResult, BlockHeight, SentryConfig, Transaction, TxHash};
use crate::utils::constants::mask_url;

/// One network node able to answer height queries, resolve transactions
/// and open the pending transaction feed
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Stable identifier, used for de-duplication only
    fn id(&self) -> &str;

    /// Name safe to show in logs and reports (API keys masked)
    fn label(&self) -> &str {
        self.id()
    }

    /// Current chain height (`eth_blockNumber`)
    async fn block_height(&self) -> AppResult<BlockHeight>;

    /// Resolve a hash. `Ok(None)` when the node does not know it
    /// (e.g. already mined and pruned from the pending set).
    async fn get_transaction(&self, hash: TxHash) -> AppResult<Option<Transaction>>;

    /// Open a push feed of pending transaction hashes
    async fn subscribe_pending_transactions(&self) -> AppResult<PendingTxSubscription>;
}

/// Anything that can be turned into an endpoint handle
#[derive(Clone)]
pub enum EndpointTarget {
    Url(String),
    Handle(Arc<dyn Endpoint>),
}

impl EndpointTarget {
    /// Normalize into a concrete handle
    pub fn into_endpoint(self, config: &SentryConfig) -> AppResult<Arc<dyn Endpoint>> {
        match self {
            Self::Url(url) => {
                let endpoint = RpcEndpoint::new(&url, config)?;
                Ok(Arc::new(endpoint))
            }
            Self::Handle(handle) => Ok(handle),
        }
    }
}

impl fmt::Debug for EndpointTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.debug_tuple("Url").field(&mask_url(url)).finish(),
            Self::Handle(handle) => f.debug_tuple("Handle").field(&handle.label()).finish(),
        }
    }
}

impl From<&str> for EndpointTarget {
    fn from(url: &str) -> Self {
        Self::Url(url.to_string())
    }
}

impl From<String> for EndpointTarget {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

impl From<&String> for EndpointTarget {
    fn from(url: &String) -> Self {
        Self::Url(url.clone())
    }
}

impl From<Arc<dyn Endpoint>> for EndpointTarget {
    fn from(handle: Arc<dyn Endpoint>) -> Self {
        Self::Handle(handle)
    }
}
