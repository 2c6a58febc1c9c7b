//! RPC Client Module - alloy provider per endpoint
//!
//! 1. One concrete endpoint handle per URL (HTTP for queries, WebSocket for the feed)
//! 2. Exponential backoff retry with jitter for retryable failures
//! 3. User-Agent header, gzip, API key masking in logs
//!
//! Uses constants from utils/constants.rs

use alloy_provider::{Provider, ProviderBuilder, RootProvider};
use alloy_provider::transport::TransportResult;
use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, CONTENT_TYPE, USER_AGENT};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use super::endpoint::Endpoint;
use super::subscription::PendingTxSubscription;
use super::websocket;
use crate::models::{
    AppError, AppResult, BlockHeight, ErrorCode, SentryConfig, Transaction, TxHash,
};
use crate::utils::constants::{
    mask_url, BASE_RETRY_DELAY_MS, MAX_RETRY_DELAY_MS, METHOD_BLOCK_NUMBER,
    METHOD_GET_TRANSACTION, RETRY_JITTER_PERCENT, USER_AGENT as USER_AGENT_CONST,
};

/// JSON-RPC endpoint reachable over HTTP(S) and WS(S)
#[derive(Clone)]
pub struct RpcEndpoint {
    /// URL as given by the caller
    id: String,
    /// URL with the API key hidden, for logs
    masked: String,
    http_url: String,
    ws_url: String,
    provider: RootProvider,
    max_retries: u32,
}

impl RpcEndpoint {
    /// Build an endpoint from any http/https/ws/wss URL
    pub fn new(url: &str, config: &SentryConfig) -> AppResult<Self> {
        let id = url.trim().to_string();
        let (http_url, ws_url) = derive_urls(&id)?;
        let client = Self::build_client(config.rpc_timeout)?;
        let parsed = reqwest::Url::parse(&http_url)
            .map_err(|e| AppError::invalid_input(format!("Invalid endpoint URL {}: {}", mask_url(&id), e)))?;

        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_reqwest(client, parsed);

        Ok(Self {
            masked: mask_url(&id),
            id,
            http_url,
            ws_url,
            provider,
            max_retries: config.max_retries,
        })
    }

    /// Use a dedicated WebSocket URL for the pending transaction feed.
    ///
    /// Needed when the provider serves WebSocket on a different path than
    /// HTTP (e.g. Infura's `/ws/v3/<key>`).
    pub fn with_ws_url(mut self, ws_url: &str) -> AppResult<Self> {
        let ws_url = ws_url.trim();
        let parsed = reqwest::Url::parse(ws_url)
            .map_err(|e| AppError::invalid_input(format!("Invalid WebSocket URL {}: {}", mask_url(ws_url), e)))?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(AppError::invalid_input(format!(
                "WebSocket URL must use ws or wss, got {}",
                parsed.scheme()
            )));
        }
        self.ws_url = ws_url.to_string();
        Ok(self)
    }

    /// Build HTTP client with custom headers and gzip
    fn build_client(timeout: Duration) -> AppResult<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| AppError::with_source(ErrorCode::Unknown, "Failed to build HTTP client", e))
    }

    pub fn http_url(&self) -> &str {
        &self.http_url
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Get RPC URL (masked for logging)
    pub fn masked_url(&self) -> &str {
        &self.masked
    }

    /// Run a provider call, retrying retryable failures with backoff
    async fn call<T, F, Fut>(&self, method: &str, request: F) -> AppResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match request().await.map_err(AppError::from) {
                Ok(result) => return Ok(result),
                Err(e) if e.code.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = retry_delay_ms(attempt);
                    debug!(
                        "⏳ {} on {} failed ({}), retry {}/{} in {}ms",
                        method, self.masked, e, attempt, self.max_retries, delay
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl Endpoint for RpcEndpoint {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        self.masked_url()
    }

    async fn block_height(&self) -> AppResult<BlockHeight> {
        self.call(METHOD_BLOCK_NUMBER, || self.provider.get_block_number())
            .await
    }

    async fn get_transaction(&self, hash: TxHash) -> AppResult<Option<Transaction>> {
        self.call(METHOD_GET_TRANSACTION, || self.provider.get_transaction_by_hash(hash))
            .await
    }

    async fn subscribe_pending_transactions(&self) -> AppResult<PendingTxSubscription> {
        websocket::subscribe_pending_transactions(&self.ws_url, &self.masked, self.max_retries).await
    }
}

impl std::fmt::Debug for RpcEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcEndpoint")
            .field("url", &self.masked)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Derive the HTTP and WebSocket URL pair from one endpoint URL.
///
/// Only the scheme is swapped (`http` ↔ `ws`, `https` ↔ `wss`); host and
/// path are kept. Providers that serve WebSocket on another path (Infura
/// expects `/ws/v3/<key>` next to `/v3/<key>`) need
/// `RpcEndpoint::with_ws_url` or `WatchOptions::ws_url`.
pub fn derive_urls(url: &str) -> AppResult<(String, String)> {
    if url.is_empty() {
        return Err(AppError::invalid_input("Endpoint URL is empty"));
    }

    let parsed = reqwest::Url::parse(url)
        .map_err(|e| AppError::invalid_input(format!("Invalid endpoint URL {}: {}", mask_url(url), e)))?;

    let (http_scheme, ws_scheme) = match parsed.scheme() {
        "http" | "ws" => ("http", "ws"),
        "https" | "wss" => ("https", "wss"),
        other => {
            return Err(AppError::invalid_input(format!(
                "Unsupported endpoint scheme: {}",
                other
            )))
        }
    };

    let mut http = parsed.clone();
    let mut ws = parsed;
    http.set_scheme(http_scheme)
        .map_err(|_| AppError::invalid_input("Cannot derive HTTP URL"))?;
    ws.set_scheme(ws_scheme)
        .map_err(|_| AppError::invalid_input("Cannot derive WebSocket URL"))?;

    Ok((http.to_string(), ws.to_string()))
}

/// Exponential backoff with ±jitter, capped
fn retry_delay_ms(attempt: u32) -> u64 {
    let base_delay = BASE_RETRY_DELAY_MS.saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)));
    let capped_delay = base_delay.min(MAX_RETRY_DELAY_MS);

    let jitter_range = (capped_delay * RETRY_JITTER_PERCENT) / 100;
    let jitter: i64 = rand::thread_rng().gen_range(-(jitter_range as i64)..=(jitter_range as i64));
    (capped_delay as i64 + jitter).max(0) as u64
}
