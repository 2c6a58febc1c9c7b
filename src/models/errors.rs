//! Centralized Error Handling Module
//!
//! Every failure carries a unique error code so sync checks and watch
//! sessions can be told apart in logs.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - RPC_xxx: single endpoint failures (recoverable inside a sync check)
//! - SYNC_xxx: fatal sync check outcomes
//! - WATCH_xxx / FEED_xxx: mempool watch failures
//! - CFG_xxx: Configuration errors

use alloy_provider::transport::{RpcError, TransportError, TransportErrorKind};
use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Input Errors
    // ============================================
    /// Missing or malformed endpoint, bad argument
    InvalidInput,
    /// Watch mode string not supported
    UnsupportedMode,

    // ============================================
    // RPC Errors (single endpoint)
    // ============================================
    /// RPC connection failed
    RpcConnectionFailed,
    /// RPC request timeout
    RpcTimeout,
    /// RPC rate limited (HTTP 429)
    RpcRateLimited,
    /// RPC returned error response
    RpcError,
    /// Invalid RPC response
    RpcInvalidResponse,

    // ============================================
    // Sync Check Errors
    // ============================================
    /// Every height query failed
    AllEndpointsUnreachable,
    /// Main endpoint height query failed
    MainUnreachable,
    /// Main endpoint more than one block behind
    MainTooFarBehind,

    // ============================================
    // Mempool Watch Errors
    // ============================================
    /// Subscription transport failure or rejection
    FeedError,
    /// Caller predicate returned an error
    PredicateFailed,

    // ============================================
    // Configuration Errors
    // ============================================
    /// Missing environment variable
    ConfigMissingEnv,
    /// Invalid configuration value
    ConfigInvalidValue,

    // ============================================
    // Generic Errors
    // ============================================
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::UnsupportedMode => "WATCH_UNSUPPORTED_MODE",

            Self::RpcConnectionFailed => "RPC_CONNECTION_FAILED",
            Self::RpcTimeout => "RPC_TIMEOUT",
            Self::RpcRateLimited => "RPC_RATE_LIMITED",
            Self::RpcError => "RPC_ERROR",
            Self::RpcInvalidResponse => "RPC_INVALID_RESPONSE",

            Self::AllEndpointsUnreachable => "SYNC_ALL_ENDPOINTS_UNREACHABLE",
            Self::MainUnreachable => "SYNC_MAIN_UNREACHABLE",
            Self::MainTooFarBehind => "SYNC_MAIN_TOO_FAR_BEHIND",

            Self::FeedError => "FEED_ERROR",
            Self::PredicateFailed => "WATCH_PREDICATE_FAILED",

            Self::ConfigMissingEnv => "CFG_MISSING_ENV",
            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",

            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RpcTimeout | Self::RpcRateLimited | Self::RpcConnectionFailed
        )
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Bad argument or endpoint
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    /// Unsupported watch mode
    pub fn unsupported_mode(mode: &str) -> Self {
        Self::new(
            ErrorCode::UnsupportedMode,
            format!("Unsupported watch mode: {}", mode),
        )
    }

    /// RPC connection failed
    pub fn rpc_connection_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcConnectionFailed, msg)
    }

    /// RPC timeout
    pub fn rpc_timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcTimeout, msg)
    }

    /// RPC rate limited
    pub fn rpc_rate_limited() -> Self {
        Self::new(ErrorCode::RpcRateLimited, "Rate limited (HTTP 429)")
    }

    /// RPC error response
    pub fn rpc_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcError, msg)
    }

    /// Malformed RPC response
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcInvalidResponse, msg)
    }

    /// No endpoint answered the height query
    pub fn all_endpoints_unreachable(count: usize) -> Self {
        Self::new(
            ErrorCode::AllEndpointsUnreachable,
            format!("All {} endpoints are unreachable", count),
        )
    }

    /// Main endpoint did not answer
    pub fn main_unreachable(endpoint: &str) -> Self {
        Self::new(
            ErrorCode::MainUnreachable,
            format!("{} is probably down", endpoint),
        )
    }

    /// Main endpoint lags more than one block
    pub fn main_too_far_behind(endpoint: &str, height: u64, max_height: u64) -> Self {
        Self::new(
            ErrorCode::MainTooFarBehind,
            format!("{} is at block {}/{}", endpoint, height, max_height),
        )
    }

    /// Pending transaction feed failure
    pub fn feed_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::FeedError, msg)
    }

    /// Required environment variable not set
    pub fn missing_env(key: &str) -> Self {
        Self::new(
            ErrorCode::ConfigMissingEnv,
            format!("Missing environment variable: {}", key),
        )
    }

    /// Invalid configuration value
    pub fn invalid_config(key: &str, value: &str) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            format!("Invalid value for {}: {:?}", key, value),
        )
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL may carry an API key
        let err = err.without_url();
        if err.is_timeout() {
            Self::new(ErrorCode::RpcTimeout, "Request timeout")
        } else if err.is_connect() {
            Self::new(ErrorCode::RpcConnectionFailed, "Connection failed")
        } else if err.is_decode() {
            Self::with_source(ErrorCode::RpcInvalidResponse, "Failed to parse response", err)
        } else {
            Self::with_source(ErrorCode::RpcError, "Request failed", err)
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::RpcInvalidResponse, "JSON parse error", err)
    }
}

impl From<TransportError> for AppError {
    fn from(err: TransportError) -> Self {
        match err {
            RpcError::ErrorResp(payload) => Self::rpc_error(format!(
                "RPC error: {} (code: {})",
                payload.message, payload.code
            )),
            RpcError::NullResp => Self::invalid_response("No result in response"),
            err @ (RpcError::SerError(_) | RpcError::DeserError { .. }) => {
                Self::with_source(ErrorCode::RpcInvalidResponse, "Failed to parse response", err)
            }
            RpcError::Transport(kind) => Self::from_transport(kind),
            err => Self::with_source(ErrorCode::RpcError, "Request failed", err),
        }
    }
}

impl AppError {
    fn from_transport(kind: TransportErrorKind) -> Self {
        match kind {
            TransportErrorKind::HttpError(http) if http.is_rate_limit_err() => Self::rpc_rate_limited(),
            TransportErrorKind::HttpError(http) => {
                Self::rpc_error(format!("HTTP error: {}", http.status))
            }
            TransportErrorKind::Custom(inner) => match inner.downcast::<reqwest::Error>() {
                Ok(err) => Self::from(*err),
                Err(other) => Self::rpc_connection_failed(format!("Transport error: {}", other)),
            },
            TransportErrorKind::BackendGone => Self::rpc_connection_failed("Connection closed"),
            other => Self::rpc_error(other.to_string()),
        }
    }
}
