//! WebSocket Pending Transaction Feed
//!
//! Opens `eth_subscribe ["newPendingTransactions"]` through an alloy
//! pubsub provider on a dedicated connection and forwards every announced
//! hash through a `PendingTxSubscription`.
//!
//! - The subscription is awaited before returning, so a rejected
//!   subscription fails the caller instead of producing an empty feed.
//! - Reconnects are left to the alloy backend (`max_retries` attempts).
//!   Once it gives up the feed yields one `FEED_ERROR` item and ends.
//! - On release (explicit or by dropping the handle) the feed task sends
//!   `eth_unsubscribe` and drops the connection.

use alloy_primitives::B256;
use alloy_provider::transport::TransportError;
use alloy_provider::{Provider, ProviderBuilder, RootProvider, WsConnect};
use alloy_pubsub::Subscription;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::subscription::PendingTxSubscription;
use crate::models::{AppError, AppResult, ErrorCode, TxHash};
use crate::utils::constants::{
    BASE_RETRY_DELAY_MS, METHOD_SUBSCRIBE, METHOD_UNSUBSCRIBE, PENDING_FEED_BUFFER,
    SUBSCRIBE_ACK_TIMEOUT_SECS, SUBSCRIPTION_PENDING_TX, UNSUBSCRIBE_FLUSH_TIMEOUT_MS,
};

/// Connect and subscribe to pending transaction hashes
///
/// `label` is the masked URL used in logs and error messages.
pub async fn subscribe_pending_transactions(
    ws_url: &str,
    label: &str,
    max_retries: u32,
) -> AppResult<PendingTxSubscription> {
    let connect = WsConnect::new(ws_url)
        .with_max_retries(max_retries)
        .with_retry_interval(Duration::from_millis(BASE_RETRY_DELAY_MS));

    let provider = ProviderBuilder::new()
        .disable_recommended_fillers()
        .connect_ws(connect)
        .await
        .map_err(|e| feed_failure(&format!("WebSocket connection to {} failed", label), e))?;
    info!("🔌 WebSocket connected to {}", label);

    let subscription = tokio::time::timeout(
        Duration::from_secs(SUBSCRIBE_ACK_TIMEOUT_SECS),
        async { provider.subscribe_pending_transactions().await },
    )
    .await
    .map_err(|_| AppError::feed_error("Timed out waiting for subscription id"))?
    .map_err(|e| feed_failure("Subscription rejected", e))?;

    let local_id = *subscription.local_id();
    info!(
        "📡 {} {} on {} ({})",
        METHOD_SUBSCRIBE, SUBSCRIPTION_PENDING_TX, label, local_id
    );

    let (handle, hash_tx, release_rx) =
        PendingTxSubscription::channel(local_id.to_string(), PENDING_FEED_BUFFER);

    tokio::spawn(run_feed(provider, subscription, hash_tx, release_rx));

    Ok(handle)
}

/// Forward notifications until released or the backend gives up
async fn run_feed(
    provider: RootProvider,
    mut subscription: Subscription<B256>,
    hash_tx: mpsc::Sender<AppResult<TxHash>>,
    mut release_rx: oneshot::Receiver<()>,
) {
    let local_id = *subscription.local_id();

    loop {
        tokio::select! {
            // Ok = explicit release, Err = handle dropped; both end the feed
            _ = &mut release_rx => {
                unsubscribe(&provider, local_id).await;
                return;
            }
            item = subscription.recv() => match item {
                Ok(hash) => {
                    if hash_tx.send(Ok(hash)).await.is_err() {
                        debug!("📪 Receiver dropped, stopping feed {}", local_id);
                        unsubscribe(&provider, local_id).await;
                        return;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("⚠️ Feed {} lagged, {} hashes skipped", local_id, skipped);
                }
                Err(RecvError::Closed) => {
                    warn!("🔌 WebSocket closed by server ({})", local_id);
                    let _ = hash_tx
                        .send(Err(AppError::feed_error("Pending transaction feed closed by server")))
                        .await;
                    return;
                }
            }
        }
    }
}

/// Send `eth_unsubscribe`, then wait for one round trip so the request is
/// written before the provider (and its socket) is dropped.
async fn unsubscribe(provider: &RootProvider, local_id: B256) {
    if let Err(e) = provider.unsubscribe(local_id) {
        debug!("{} for {} not delivered: {}", METHOD_UNSUBSCRIBE, local_id, e);
        return;
    }
    let flush = Duration::from_millis(UNSUBSCRIBE_FLUSH_TIMEOUT_MS);
    let _ = tokio::time::timeout(flush, provider.get_block_number()).await;
    debug!("🔕 Unsubscribed {}", local_id);
}

fn feed_failure(context: &str, err: TransportError) -> AppError {
    let inner = AppError::from(err);
    AppError::with_source(
        ErrorCode::FeedError,
        format!("{}: {}", context, inner.message),
        inner,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use serde_json::{json, Value};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use tokio_tungstenite::{accept_async, tungstenite::Message};

    const SERVER_SUB_ID: &str = "0x9cef478923ff08bf67fde6c64013158d";
    const WAIT: Duration = Duration::from_secs(5);

    /// How the local node behaves once a subscription is requested
    enum Script {
        /// Ack, push the hashes, keep serving requests
        Serve(Vec<TxHash>),
        /// Ack, push the hashes, close the socket
        HangUp(Vec<TxHash>),
        /// Answer `eth_subscribe` with a JSON-RPC error
        Reject,
    }

    /// One-connection JSON-RPC node. Resolves to every request it received.
    async fn spawn_node(script: Script) -> (String, JoinHandle<Vec<Value>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());

        let node = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            // Reconnect attempts must be refused
            drop(listener);
            let mut ws = accept_async(stream).await.unwrap();
            let mut requests = Vec::new();

            while let Some(Ok(msg)) = ws.next().await {
                let Message::Text(text) = msg else { continue };
                let request: Value = serde_json::from_str(&text).unwrap();
                let id = request["id"].clone();
                let method = request["method"].as_str().unwrap_or_default().to_string();
                requests.push(request);

                let reply = match (method.as_str(), &script) {
                    ("eth_subscribe", Script::Reject) => json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": { "code": -32601, "message": "notifications not supported" }
                    }),
                    ("eth_subscribe", _) => json!({ "jsonrpc": "2.0", "id": id, "result": SERVER_SUB_ID }),
                    ("eth_unsubscribe", _) => json!({ "jsonrpc": "2.0", "id": id, "result": true }),
                    _ => json!({ "jsonrpc": "2.0", "id": id, "result": "0x1" }),
                };
                let _ = ws.send(Message::Text(reply.to_string())).await;

                if method != "eth_subscribe" {
                    continue;
                }
                let (hashes, hang_up) = match &script {
                    Script::Serve(hashes) => (hashes, false),
                    Script::HangUp(hashes) => (hashes, true),
                    Script::Reject => continue,
                };
                tokio::time::sleep(Duration::from_millis(50)).await;
                for hash in hashes {
                    let note = json!({
                        "jsonrpc": "2.0",
                        "method": "eth_subscription",
                        "params": { "subscription": SERVER_SUB_ID, "result": hash }
                    });
                    let _ = ws.send(Message::Text(note.to_string())).await;
                }
                if hang_up {
                    let _ = ws.close(None).await;
                    break;
                }
            }
            requests
        });

        (url, node)
    }

    async fn next(sub: &mut PendingTxSubscription) -> Option<AppResult<TxHash>> {
        tokio::time::timeout(WAIT, sub.next()).await.expect("feed stalled")
    }

    #[tokio::test]
    async fn test_forwards_hashes_and_unsubscribes_once() {
        let hashes = vec![TxHash::repeat_byte(1), TxHash::repeat_byte(2)];
        let (url, node) = spawn_node(Script::Serve(hashes.clone())).await;

        let mut sub = subscribe_pending_transactions(&url, &url, 0).await.unwrap();
        assert_eq!(next(&mut sub).await.unwrap().unwrap(), hashes[0]);
        assert_eq!(next(&mut sub).await.unwrap().unwrap(), hashes[1]);

        assert!(sub.unsubscribe());
        assert!(!sub.unsubscribe());

        // The node task only finishes once the client has dropped the connection
        let requests = tokio::time::timeout(WAIT, node).await.expect("connection left open").unwrap();

        let subscribes: Vec<_> = requests.iter().filter(|r| r["method"] == METHOD_SUBSCRIBE).collect();
        assert_eq!(subscribes.len(), 1);
        assert_eq!(subscribes[0]["params"], json!([SUBSCRIPTION_PENDING_TX]));

        let unsubscribes: Vec<_> = requests.iter().filter(|r| r["method"] == METHOD_UNSUBSCRIBE).collect();
        assert_eq!(unsubscribes.len(), 1);
        assert_eq!(unsubscribes[0]["params"], json!([SERVER_SUB_ID]));
    }

    #[tokio::test]
    async fn test_server_hang_up_yields_one_feed_error() {
        let (url, node) = spawn_node(Script::HangUp(vec![TxHash::repeat_byte(7)])).await;

        let mut sub = subscribe_pending_transactions(&url, &url, 0).await.unwrap();
        assert_eq!(next(&mut sub).await.unwrap().unwrap(), TxHash::repeat_byte(7));

        let err = next(&mut sub).await.unwrap().unwrap_err();
        assert_eq!(err.code, ErrorCode::FeedError);
        assert!(err.message.contains("closed"));
        assert!(next(&mut sub).await.is_none());

        let requests = node.await.unwrap();
        assert!(requests.iter().all(|r| r["method"] != METHOD_UNSUBSCRIBE));
    }

    #[tokio::test]
    async fn test_rejected_subscription_fails_caller() {
        let (url, _node) = spawn_node(Script::Reject).await;

        let err = subscribe_pending_transactions(&url, &url, 0).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::FeedError);
        assert!(err.message.contains("notifications not supported"), "{}", err.message);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn test_unreachable_node_is_feed_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = subscribe_pending_transactions(&url, "ws://node", 0).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::FeedError);
        assert!(err.message.starts_with("WebSocket connection to ws://node failed"));
    }
}
