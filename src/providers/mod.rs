//! Providers Module - External Endpoints
//!
//! Endpoint trait plus the JSON-RPC (HTTP) and WebSocket implementations.

pub mod endpoint;
pub mod rpc;
pub mod subscription;
pub mod websocket;

pub use endpoint::*;
pub use rpc::RpcEndpoint;
pub use subscription::PendingTxSubscription;
