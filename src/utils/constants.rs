//! Constants Module - Single Source of Truth
//!
//! Defaults and protocol constants shared by providers, config and core.

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "RpcSentry";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for HTTP requests
pub const USER_AGENT: &str = concat!("RpcSentry/", env!("CARGO_PKG_VERSION"));

// ============================================
// RPC CONSTANTS
// ============================================

/// Default timeout for RPC requests (seconds)
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 10;

/// Default retries for retryable RPC failures
pub const DEFAULT_RPC_MAX_RETRIES: u32 = 2;

/// Base retry delay in milliseconds
pub const BASE_RETRY_DELAY_MS: u64 = 250;

/// Maximum retry delay in milliseconds
pub const MAX_RETRY_DELAY_MS: u64 = 4000;

/// Jitter percentage for retry delay
pub const RETRY_JITTER_PERCENT: u64 = 20;

/// JSON-RPC methods
pub const METHOD_BLOCK_NUMBER: &str = "eth_blockNumber";
pub const METHOD_GET_TRANSACTION: &str = "eth_getTransactionByHash";
pub const METHOD_SUBSCRIBE: &str = "eth_subscribe";
pub const METHOD_UNSUBSCRIBE: &str = "eth_unsubscribe";

/// Subscription kind for pending transaction hashes
pub const SUBSCRIPTION_PENDING_TX: &str = "newPendingTransactions";

// ============================================
// MEMPOOL WATCH CONSTANTS
// ============================================

/// Default cap on concurrent transaction lookups per watch session
pub const DEFAULT_MAX_IN_FLIGHT: usize = 50;

/// Buffer between the WebSocket reader and the watch session
pub const PENDING_FEED_BUFFER: usize = 1000;

/// How long to wait for the `eth_subscribe` acknowledgement (seconds)
pub const SUBSCRIBE_ACK_TIMEOUT_SECS: u64 = 10;

/// Upper bound on the round trip that flushes `eth_unsubscribe` (milliseconds)
pub const UNSUBSCRIBE_FLUSH_TIMEOUT_MS: u64 = 2000;

// ============================================
// HELPERS
// ============================================

/// Mask API keys embedded in endpoint URLs before logging
///
/// Keys usually live in the last path segment (`/v2/<key>`, `/v3/<key>`)
/// or in the userinfo part of the URL.
pub fn mask_url(url: &str) -> String {
    let Ok(mut parsed) = reqwest::Url::parse(url) else {
        return url.to_string();
    };

    if !parsed.username().is_empty() || parsed.password().is_some() {
        let _ = parsed.set_username("***");
        let _ = parsed.set_password(None);
    }

    let segments: Vec<String> = parsed
        .path_segments()
        .map(|s| s.map(str::to_string).collect())
        .unwrap_or_default();

    if let Some(last) = segments.last() {
        if last.len() >= 16 {
            let mut masked = segments.clone();
            if let Some(slot) = masked.last_mut() {
                *slot = "***HIDDEN***".to_string();
            }
            parsed.set_path(&format!("/{}", masked.join("/")));
        }
    }

    parsed.to_string().trim_end_matches('/').to_string()
}
