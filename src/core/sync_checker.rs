//! RPC sync checker
//!
//! Queries the block height of every distinct endpoint at once, keeps going
//! when some of them fail, classifies each one against the highest observed
//! block and decides whether the main endpoint is usable.

use chrono::Utc;
use futures_util::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::{
    AppError, AppResult, BlockHeight, EndpointStatus, SyncClassification, SyncReport, SyncVerdict,
};
use crate::providers::Endpoint;
use crate::reporter::{ConsoleReporter, Reporter};

/// Endpoint scheduled for one check
struct Target {
    endpoint: Arc<dyn Endpoint>,
    is_main: bool,
}

/// Height observed for one endpoint, keyed by its display label
#[derive(Debug)]
pub(crate) struct HeightSample {
    pub endpoint: String,
    pub is_main: bool,
    pub height: Option<BlockHeight>,
}

/// Multi-endpoint height comparison
pub struct SyncChecker<R: Reporter = ConsoleReporter> {
    reporter: R,
}

impl Default for SyncChecker<ConsoleReporter> {
    fn default() -> Self {
        Self::new(ConsoleReporter::default())
    }
}

impl<R: Reporter> SyncChecker<R> {
    pub fn new(reporter: R) -> Self {
        Self { reporter }
    }

    /// Run a check and turn a failing verdict into an error.
    ///
    /// The report is handed to the reporter before the verdict is applied,
    /// so a failing check still prints every endpoint.
    pub async fn check_sync(
        &self,
        main: &Arc<dyn Endpoint>,
        peers: &[Arc<dyn Endpoint>],
    ) -> AppResult<SyncReport> {
        let report = self.run_check(main, peers).await?;
        match report.verdict_error() {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }

    /// Query, classify and report. Only fails when no endpoint answered.
    pub async fn run_check(
        &self,
        main: &Arc<dyn Endpoint>,
        peers: &[Arc<dyn Endpoint>],
    ) -> AppResult<SyncReport> {
        let targets = plan_targets(main, peers);
        info!("🔍 Checking sync across {} endpoints", targets.len());

        let heights = fetch_heights(&targets).await;
        let samples: Vec<HeightSample> = targets
            .iter()
            .zip(heights)
            .map(|(t, height)| HeightSample {
                endpoint: t.endpoint.label().to_string(),
                is_main: t.is_main,
                height,
            })
            .collect();

        let report = build_report(main.label(), samples)?;
        if report.verdict.is_ok() {
            info!("✅ {} in sync at block {}", report.main_endpoint, report.max_height);
        } else {
            warn!("🚨 {} failed the sync check: {:?}", report.main_endpoint, report.verdict);
        }
        self.reporter.report(&report);
        Ok(report)
    }
}

/// Caller order, duplicates dropped, main appended last if missing
fn plan_targets(main: &Arc<dyn Endpoint>, peers: &[Arc<dyn Endpoint>]) -> Vec<Target> {
    let main_id = main.id();
    let mut seen = HashSet::new();
    let mut targets = Vec::with_capacity(peers.len() + 1);

    for peer in peers {
        if !seen.insert(peer.id().to_string()) {
            debug!("Skipping duplicate endpoint {}", peer.label());
            continue;
        }
        let is_main = peer.id() == main_id;
        let endpoint = if is_main { main.clone() } else { peer.clone() };
        targets.push(Target { endpoint, is_main });
    }

    if !seen.contains(main_id) {
        targets.push(Target {
            endpoint: main.clone(),
            is_main: true,
        });
    }

    targets
}

/// Fan out and wait for every query to settle. A failure only blanks its
/// own height.
async fn fetch_heights(targets: &[Target]) -> Vec<Option<BlockHeight>> {
    let queries = targets.iter().map(|target| async move {
        match target.endpoint.block_height().await {
            Ok(height) => {
                debug!("📦 {} at block {}", target.endpoint.label(), height);
                Some(height)
            }
            Err(e) => {
                warn!("⚠️ Height query failed on {}: {}", target.endpoint.label(), e);
                None
            }
        }
    });

    join_all(queries).await
}

/// Classify every sample against the max height and decide the verdict
pub(crate) fn build_report(main_label: &str, samples: Vec<HeightSample>) -> AppResult<SyncReport> {
    let max_height = samples
        .iter()
        .filter_map(|s| s.height)
        .max()
        .ok_or_else(|| AppError::all_endpoints_unreachable(samples.len()))?;

    let statuses: Vec<EndpointStatus> = samples
        .into_iter()
        .map(|s| EndpointStatus {
            classification: SyncClassification::classify(s.height, max_height),
            endpoint: s.endpoint,
            height: s.height,
            is_main: s.is_main,
        })
        .collect();

    let verdict = match statuses.iter().find(|s| s.is_main) {
        Some(main) => match (main.classification, main.height) {
            (SyncClassification::UpToDate, _) => SyncVerdict::Healthy,
            (SyncClassification::OneBehind, _) => SyncVerdict::Warning,
            (_, Some(height)) => SyncVerdict::MainTooFarBehind { height },
            (_, None) => SyncVerdict::MainUnreachable,
        },
        None => SyncVerdict::MainUnreachable,
    };

    Ok(SyncReport {
        max_height,
        main_endpoint: main_label.to_string(),
        statuses,
        verdict,
        checked_at: Utc::now(),
    })
}
