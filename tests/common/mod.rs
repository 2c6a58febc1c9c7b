//! In-memory endpoint used by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use rpc_sentry::models::{
    Address, AppError, AppResult, BlockHeight, SyncReport, Transaction, TransactionResponse, TxHash,
};
use rpc_sentry::providers::{Endpoint, PendingTxSubscription};
use rpc_sentry::reporter::Reporter;

pub const TARGET: &str = "0xf02c1c8e6114b1dbe8937a39260b5b0a374432bb";
pub const SENDER: &str = "0xa7d9ddbe1f17865597fbd27ec712455208b6b76d";

pub fn target() -> Address {
    TARGET.parse().unwrap()
}

pub fn hash(n: u8) -> TxHash {
    TxHash::repeat_byte(n)
}

/// Pending transaction sent from `SENDER` to `TARGET`
pub fn tx(n: u8) -> Transaction {
    pending_tx(hash(n), SENDER, TARGET)
}

/// Pending legacy transaction as a node returns it from `eth_getTransactionByHash`
pub fn pending_tx(hash: TxHash, from: &str, to: &str) -> Transaction {
    serde_json::from_value(serde_json::json!({
        "blockHash": null,
        "blockNumber": null,
        "transactionIndex": null,
        "hash": hash,
        "type": "0x0",
        "nonce": "0x15",
        "input": "0x",
        "r": "0x3b08715b4403c792b8c7567edea634088bedcd7f60d9352b1f16c69830f3afd5",
        "s": "0x10b9afb67d2ec8b956f0e1dbc07eb79152904f3a7bf789fc869db56320adfe09",
        "chainId": "0x0",
        "v": "0x1c",
        "gas": "0xc350",
        "from": from,
        "to": to,
        "value": "0x0",
        "gasPrice": "0x4a817c800"
    }))
    .unwrap()
}

pub enum FeedItem {
    Hash(TxHash),
    Error(String),
}

enum Lookup {
    Found(Transaction),
    Missing,
    Error,
}

pub struct MockEndpoint {
    id: String,
    height: Option<BlockHeight>,
    height_delay: Duration,
    height_calls: AtomicUsize,
    lookups: HashMap<TxHash, (Duration, Lookup)>,
    lookups_active: AtomicUsize,
    lookups_peak: AtomicUsize,
    feed: Mutex<Vec<FeedItem>>,
    keep_feed_open: bool,
    subscribe_fails: bool,
    subscribe_calls: AtomicUsize,
    open_feeds: Mutex<Vec<mpsc::Sender<AppResult<TxHash>>>>,
    releases: Mutex<Vec<oneshot::Receiver<()>>>,
    released: AtomicUsize,
}

impl MockEndpoint {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            height: None,
            height_delay: Duration::ZERO,
            height_calls: AtomicUsize::new(0),
            lookups: HashMap::new(),
            lookups_active: AtomicUsize::new(0),
            lookups_peak: AtomicUsize::new(0),
            feed: Mutex::new(Vec::new()),
            keep_feed_open: false,
            subscribe_fails: false,
            subscribe_calls: AtomicUsize::new(0),
            open_feeds: Mutex::new(Vec::new()),
            releases: Mutex::new(Vec::new()),
            released: AtomicUsize::new(0),
        }
    }

    /// Endpoint answering `height`
    pub fn at(id: &str, height: BlockHeight) -> Self {
        Self::new(id).with_height(height)
    }

    /// Endpoint whose height query fails
    pub fn down(id: &str) -> Self {
        Self::new(id)
    }

    pub fn with_height(mut self, height: BlockHeight) -> Self {
        self.height = Some(height);
        self
    }

    /// Delay applied before the height query answers or fails
    pub fn with_height_delay(mut self, delay: Duration) -> Self {
        self.height_delay = delay;
        self
    }

    pub fn with_tx(mut self, tx: Transaction, delay: Duration) -> Self {
        self.lookups.insert(tx.tx_hash(), (delay, Lookup::Found(tx)));
        self
    }

    pub fn with_missing_tx(mut self, hash: TxHash, delay: Duration) -> Self {
        self.lookups.insert(hash, (delay, Lookup::Missing));
        self
    }

    pub fn with_lookup_error(mut self, hash: TxHash, delay: Duration) -> Self {
        self.lookups.insert(hash, (delay, Lookup::Error));
        self
    }

    /// Items pushed into the feed as soon as it is opened
    pub fn with_feed(mut self, items: Vec<FeedItem>) -> Self {
        self.feed = Mutex::new(items);
        self
    }

    /// Keep the feed alive after the queued items instead of ending it
    pub fn keep_feed_open(mut self) -> Self {
        self.keep_feed_open = true;
        self
    }

    pub fn failing_subscribe(mut self) -> Self {
        self.subscribe_fails = true;
        self
    }

    pub fn height_calls(&self) -> usize {
        self.height_calls.load(Ordering::SeqCst)
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    /// Highest number of lookups observed running at once
    pub fn lookups_peak(&self) -> usize {
        self.lookups_peak.load(Ordering::SeqCst)
    }

    /// Number of subscriptions released so far
    pub fn unsubscribes(&self) -> usize {
        let mut releases = self.releases.lock().unwrap();
        releases.retain_mut(|rx| match rx.try_recv() {
            Ok(()) => {
                self.released.fetch_add(1, Ordering::SeqCst);
                false
            }
            Err(oneshot::error::TryRecvError::Empty) => true,
            Err(oneshot::error::TryRecvError::Closed) => false,
        });
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Endpoint for MockEndpoint {
    fn id(&self) -> &str {
        &self.id
    }

    async fn block_height(&self) -> AppResult<BlockHeight> {
        self.height_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.height_delay).await;
        self.height
            .ok_or_else(|| AppError::rpc_timeout(format!("{} timed out", self.id)))
    }

    async fn get_transaction(&self, hash: TxHash) -> AppResult<Option<Transaction>> {
        let Some((delay, lookup)) = self.lookups.get(&hash) else {
            return Ok(None);
        };

        let active = self.lookups_active.fetch_add(1, Ordering::SeqCst) + 1;
        self.lookups_peak.fetch_max(active, Ordering::SeqCst);
        tokio::time::sleep(*delay).await;
        self.lookups_active.fetch_sub(1, Ordering::SeqCst);

        match lookup {
            Lookup::Found(tx) => Ok(Some(tx.clone())),
            Lookup::Missing => Ok(None),
            Lookup::Error => Err(AppError::rpc_error("lookup failed")),
        }
    }

    async fn subscribe_pending_transactions(&self) -> AppResult<PendingTxSubscription> {
        let n = self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.subscribe_fails {
            return Err(AppError::feed_error("subscription rejected"));
        }

        let (subscription, hash_tx, release_rx) =
            PendingTxSubscription::channel(format!("{}-sub-{}", self.id, n), 1024);
        for item in self.feed.lock().unwrap().drain(..) {
            let item = match item {
                FeedItem::Hash(hash) => Ok(hash),
                FeedItem::Error(msg) => Err(AppError::feed_error(msg)),
            };
            hash_tx.try_send(item).unwrap();
        }
        if self.keep_feed_open {
            self.open_feeds.lock().unwrap().push(hash_tx);
        }
        self.releases.lock().unwrap().push(release_rx);
        Ok(subscription)
    }
}

/// Keeps every report it receives
#[derive(Default)]
pub struct CollectingReporter {
    reports: Mutex<Vec<SyncReport>>,
}

impl CollectingReporter {
    pub fn reports(&self) -> Vec<SyncReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl Reporter for CollectingReporter {
    fn report(&self, report: &SyncReport) {
        self.reports.lock().unwrap().push(report.clone());
    }
}
