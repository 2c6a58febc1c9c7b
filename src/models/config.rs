//! Configuration module for RPC Sentry
//!
//! All tunables come from the environment first, CLI flags override them.

use std::time::Duration;

use super::errors::{AppError, AppResult};
use crate::utils::constants::{
    DEFAULT_MAX_IN_FLIGHT, DEFAULT_RPC_MAX_RETRIES, DEFAULT_RPC_TIMEOUT_SECS,
};

/// Configuration for the sync checker and mempool watcher
#[derive(Debug, Clone)]
pub struct SentryConfig {
    /// RPC endpoint whose health decides the sync check verdict
    pub main_rpc_url: Option<String>,

    /// Peer endpoints used as height reference
    pub peer_rpc_urls: Vec<String>,

    /// WebSocket URL for the pending transaction feed
    pub wss_url: Option<String>,

    /// Timeout for a single RPC request
    pub rpc_timeout: Duration,

    /// Retries for retryable RPC failures (timeouts, 429, connect errors)
    pub max_retries: u32,

    /// Maximum concurrent transaction lookups in a watch session
    pub max_in_flight: usize,

    /// Colored console report
    pub color: bool,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            main_rpc_url: None,
            peer_rpc_urls: Vec::new(),
            wss_url: None,
            rpc_timeout: Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS),
            max_retries: DEFAULT_RPC_MAX_RETRIES,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            color: true,
        }
    }
}

impl SentryConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let rpc_timeout = match non_empty("RPC_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number(&raw, "RPC_TIMEOUT_SECS")?),
            None => defaults.rpc_timeout,
        };
        let max_retries = match non_empty("RPC_MAX_RETRIES") {
            Some(raw) => parse_number(&raw, "RPC_MAX_RETRIES")?,
            None => defaults.max_retries,
        };
        let max_in_flight = match non_empty("MEMPOOL_MAX_IN_FLIGHT") {
            Some(raw) => parse_number(&raw, "MEMPOOL_MAX_IN_FLIGHT")?,
            None => defaults.max_in_flight,
        };

        Ok(Self {
            main_rpc_url: non_empty("MAIN_RPC_URL").map(|v| v.trim().to_string()),
            peer_rpc_urls: non_empty("PEER_RPC_URLS")
                .map(|raw| split_urls(&raw))
                .unwrap_or_default(),
            wss_url: non_empty("ETH_WSS_URL").map(|v| v.trim().to_string()),
            rpc_timeout,
            max_retries,
            max_in_flight,
            // https://no-color.org
            color: lookup("NO_COLOR").is_none(),
        })
    }
}

/// Split a comma separated URL list, dropping blanks
pub fn split_urls(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number<T: std::str::FromStr>(raw: &str, key: &str) -> AppResult<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| AppError::invalid_config(key, raw))
}
