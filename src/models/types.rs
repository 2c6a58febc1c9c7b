//! Type definitions for RPC Sentry
//! Data structures shared by the sync checker, the mempool watcher and the reporter

use alloy_primitives::B256;
pub use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::errors::AppError;

/// Index of the most recent block an endpoint has processed
pub type BlockHeight = u64;

/// Pending transaction identifier emitted by the feed
pub type TxHash = B256;

/// Resolved transaction as returned by `eth_getTransactionByHash`
pub type Transaction = alloy_rpc_types::Transaction;

/// Accessors on `Transaction` (`to`, `tx_hash`, `from`)
pub use alloy_provider::network::TransactionResponse;
pub use alloy_rpc_types::TransactionTrait;

/// Health of one endpoint relative to the highest observed block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncClassification {
    UpToDate,
    OneBehind,
    /// More than one block behind (or, degenerate, ahead of the max)
    Stale,
    Unreachable,
}

impl SyncClassification {
    /// Classify a height against the maximum observed height
    pub fn classify(height: Option<BlockHeight>, max_height: BlockHeight) -> Self {
        match height {
            None => Self::Unreachable,
            Some(h) if h == max_height => Self::UpToDate,
            Some(h) if h.checked_add(1) == Some(max_height) => Self::OneBehind,
            Some(_) => Self::Stale,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::UpToDate => "✅",
            Self::OneBehind => "🟡",
            Self::Stale => "🔴",
            Self::Unreachable => "💀",
        }
    }
}

/// Per-endpoint line of a sync report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointStatus {
    /// Endpoint label, API keys masked
    pub endpoint: String,
    pub height: Option<BlockHeight>,
    pub is_main: bool,
    pub classification: SyncClassification,
}

impl EndpointStatus {
    /// Signed distance to the max height, `None` when unreachable
    pub fn delta(&self, max_height: BlockHeight) -> Option<i128> {
        self.height.map(|h| h as i128 - max_height as i128)
    }
}

/// Outcome of a sync check for the main endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncVerdict {
    /// Main endpoint is at the max height
    Healthy,
    /// Main endpoint is one block behind (tolerated)
    Warning,
    MainUnreachable,
    MainTooFarBehind { height: BlockHeight },
}

impl SyncVerdict {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Healthy | Self::Warning)
    }
}

/// Result of one sync check. Produced fresh on every call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub max_height: BlockHeight,
    /// Label of the main endpoint
    pub main_endpoint: String,
    pub statuses: Vec<EndpointStatus>,
    pub verdict: SyncVerdict,
    pub checked_at: DateTime<Utc>,
}

impl SyncReport {
    pub fn main_status(&self) -> Option<&EndpointStatus> {
        self.statuses.iter().find(|s| s.is_main)
    }

    pub fn status(&self, endpoint: &str) -> Option<&EndpointStatus> {
        self.statuses.iter().find(|s| s.endpoint == endpoint)
    }

    /// Error for a failing verdict, `None` when the call succeeds
    pub fn verdict_error(&self) -> Option<AppError> {
        match self.verdict {
            SyncVerdict::Healthy | SyncVerdict::Warning => None,
            SyncVerdict::MainUnreachable => Some(AppError::main_unreachable(&self.main_endpoint)),
            SyncVerdict::MainTooFarBehind { height } => Some(AppError::main_too_far_behind(
                &self.main_endpoint,
                height,
                self.max_height,
            )),
        }
    }
}

/// Strategy used to watch the mempool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    /// Push subscription to the pending transaction feed
    Fast,
    /// Pending-block polling. Not implemented.
    Cheap,
}

impl WatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Cheap => "cheap",
        }
    }
}

impl FromStr for WatchMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "cheap" => Ok(Self::Cheap),
            _ => Err(AppError::unsupported_mode(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::ErrorCode;

    #[test]
    fn test_classify_table() {
        assert_eq!(SyncClassification::classify(Some(100), 100), SyncClassification::UpToDate);
        assert_eq!(SyncClassification::classify(Some(99), 100), SyncClassification::OneBehind);
        assert_eq!(SyncClassification::classify(Some(98), 100), SyncClassification::Stale);
        assert_eq!(SyncClassification::classify(Some(101), 100), SyncClassification::Stale);
        assert_eq!(SyncClassification::classify(None, 100), SyncClassification::Unreachable);
        assert_eq!(SyncClassification::classify(Some(u64::MAX), 0), SyncClassification::Stale);
    }

    #[test]
    fn test_watch_mode_parse() {
        assert_eq!("fast".parse::<WatchMode>().unwrap(), WatchMode::Fast);
        assert_eq!(" Cheap ".parse::<WatchMode>().unwrap(), WatchMode::Cheap);
        let err = "unsupported-mode".parse::<WatchMode>().unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedMode);
    }

    #[test]
    fn test_pending_transaction_deserialize() {
        let json = serde_json::json!({
            "blockHash": null,
            "blockNumber": null,
            "transactionIndex": null,
            "hash": "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b",
            "type": "0x0",
            "nonce": "0x15",
            "input": "0x68656c6c6f21",
            "r": "0x3b08715b4403c792b8c7567edea634088bedcd7f60d9352b1f16c69830f3afd5",
            "s": "0x10b9afb67d2ec8b956f0e1dbc07eb79152904f3a7bf789fc869db56320adfe09",
            "chainId": "0x0",
            "v": "0x1c",
            "gas": "0xc350",
            "from": "0xa7d9ddbe1f17865597fbd27ec712455208b6b76d",
            "to": "0xF02c1c8e6114b1Dbe8937a39260b5b0a374432bB",
            "value": "0xf3dbb76162000",
            "gasPrice": "0x4a817c800"
        });
        let tx: Transaction = serde_json::from_value(json).unwrap();
        let to: alloy_primitives::Address = "0xf02c1c8e6114b1dbe8937a39260b5b0a374432bb".parse().unwrap();

        assert!(tx.block_number.is_none());
        assert_eq!(tx.to(), Some(to));
        assert_eq!(
            tx.from(),
            "0xA7D9DDBE1F17865597FBD27EC712455208B6B76D".parse::<alloy_primitives::Address>().unwrap()
        );
        assert_eq!(
            tx.tx_hash(),
            "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b".parse::<TxHash>().unwrap()
        );
    }

    #[test]
    fn test_classification_serializes_as_code() {
        let json = serde_json::to_string(&SyncClassification::OneBehind).unwrap();
        assert_eq!(json, "\"ONE_BEHIND\"");
    }

    #[test]
    fn test_endpoint_status_delta() {
        let status = EndpointStatus {
            endpoint: "a".to_string(),
            height: Some(97),
            is_main: false,
            classification: SyncClassification::Stale,
        };
        assert_eq!(status.delta(100), Some(-3));
    }
}
