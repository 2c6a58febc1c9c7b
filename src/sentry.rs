//! Public entry points
//!
//! Normalize caller-supplied endpoints, then hand off to the sync checker
//! or the mempool watcher. No global provider state: every call builds its
//! own handles from the arguments and the config.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::core::{MempoolWatcher, SyncChecker, TxPredicate};
use crate::models::{AppError, AppResult, SentryConfig, SyncReport, Transaction, WatchMode};
use crate::providers::{Endpoint, EndpointTarget, RpcEndpoint};
use crate::reporter::{ConsoleReporter, Reporter};

/// Per-call overrides for `wait_for_tx`
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    /// Endpoint to watch, falls back to the configured WebSocket URL
    pub endpoint: Option<EndpointTarget>,
    /// Poll interval for the polling mode
    pub poll_interval: Option<Duration>,
    /// WebSocket URL for the feed when it is not the endpoint URL with a
    /// swapped scheme (Infura serves `/ws/v3/<key>` next to `/v3/<key>`).
    /// Only applies to URL endpoints.
    pub ws_url: Option<String>,
}

impl WatchOptions {
    pub fn with_endpoint(endpoint: impl Into<EndpointTarget>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            poll_interval: None,
            ws_url: None,
        }
    }
}

/// Check the main endpoint against its peers and print the report.
///
/// Fails with `SYNC_MAIN_UNREACHABLE`, `SYNC_MAIN_TOO_FAR_BEHIND` or
/// `SYNC_ALL_ENDPOINTS_UNREACHABLE`; the report is printed first.
pub async fn check_rpc_sync<M, I, P>(main: M, peers: I, config: &SentryConfig) -> AppResult<SyncReport>
where
    M: Into<EndpointTarget>,
    I: IntoIterator<Item = P>,
    P: Into<EndpointTarget>,
{
    check_rpc_sync_with(main, peers, config, ConsoleReporter::new(config.color)).await
}

/// `check_rpc_sync` with a custom reporter
pub async fn check_rpc_sync_with<M, I, P, R>(
    main: M,
    peers: I,
    config: &SentryConfig,
    reporter: R,
) -> AppResult<SyncReport>
where
    M: Into<EndpointTarget>,
    I: IntoIterator<Item = P>,
    P: Into<EndpointTarget>,
    R: Reporter,
{
    let main = main.into().into_endpoint(config)?;
    let peers = peers
        .into_iter()
        .map(|peer| peer.into().into_endpoint(config))
        .collect::<AppResult<Vec<Arc<dyn Endpoint>>>>()?;

    SyncChecker::new(reporter).check_sync(&main, &peers).await
}

/// Wait for the first pending transaction matching `predicate`.
///
/// The mode is validated before any connection is made, so an unsupported
/// mode never opens a subscription.
pub async fn wait_for_tx<P>(
    predicate: &P,
    mode: &str,
    options: WatchOptions,
    config: &SentryConfig,
) -> AppResult<Transaction>
where
    P: TxPredicate + ?Sized,
{
    let mode: WatchMode = mode.parse()?;
    if mode != WatchMode::Fast {
        return Err(AppError::unsupported_mode(mode.as_str()));
    }
    if let Some(interval) = options.poll_interval {
        debug!("Poll interval {:?} has no effect in {} mode", interval, mode.as_str());
    }

    let target = match options.endpoint {
        Some(target) => target,
        None => config
            .wss_url
            .clone()
            .map(EndpointTarget::Url)
            .ok_or_else(|| AppError::invalid_input("No endpoint given and ETH_WSS_URL is not set"))?,
    };
    let endpoint: Arc<dyn Endpoint> = match (target, options.ws_url) {
        (EndpointTarget::Url(url), Some(ws_url)) => {
            Arc::new(RpcEndpoint::new(&url, config)?.with_ws_url(&ws_url)?)
        }
        (EndpointTarget::Handle(_), Some(_)) => {
            return Err(AppError::invalid_input(
                "A WebSocket URL override needs a URL endpoint, not a handle",
            ))
        }
        (target, None) => target.into_endpoint(config)?,
    };

    MempoolWatcher::new(endpoint)
        .with_max_in_flight(config.max_in_flight)
        .watch(predicate, mode)
        .await
}
