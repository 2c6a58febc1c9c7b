//! RPC Sentry - RPC sync checker and mempool transaction watcher
//!
//! ```bash
//! # Compare a main endpoint against its peers
//! rpc_sentry sync --main https://eth.example/v2/KEY --peer https://a.example --peer https://b.example
//!
//! # Wait for the next pending transaction to an address
//! rpc_sentry watch --to 0xF02c1c8e6114b1Dbe8937a39260b5b0a374432bB --timeout-secs 120
//! ```

use clap::{Parser, Subcommand};
use eyre::{eyre, Result};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rpc_sentry::core::SyncChecker;
use rpc_sentry::models::{AppError, AppResult, SentryConfig, SyncReport};
use rpc_sentry::providers::EndpointTarget;
use rpc_sentry::reporter::SilentReporter;
use rpc_sentry::utils::constants::{APP_NAME, APP_VERSION};
use rpc_sentry::models::{Address, TransactionResponse, TransactionTrait};
use rpc_sentry::{check_rpc_sync, predicate_fn, wait_for_tx, Transaction, WatchOptions};

#[derive(Parser, Debug)]
#[command(name = "rpc_sentry")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the main RPC endpoint keeps up with its peers
    Sync {
        /// Main RPC endpoint
        #[arg(long, env = "MAIN_RPC_URL")]
        main: Option<String>,

        /// Peer endpoint, repeatable
        #[arg(long = "peer", env = "PEER_RPC_URLS", value_delimiter = ',')]
        peers: Vec<String>,

        /// Print the report as JSON instead of colored lines
        #[arg(long)]
        json: bool,
    },

    /// Wait for the first pending transaction sent to an address
    Watch {
        /// Recipient address
        #[arg(long)]
        to: String,

        /// Optional sender address
        #[arg(long)]
        from: Option<String>,

        /// Watch mode (only "fast" is supported)
        #[arg(long, default_value = "fast")]
        mode: String,

        /// WebSocket or HTTP endpoint, defaults to ETH_WSS_URL
        #[arg(long)]
        endpoint: Option<String>,

        /// WebSocket URL for the feed when the endpoint serves it on another path
        #[arg(long)]
        ws_url: Option<String>,

        /// Give up after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // The HTTP transport's debug span carries the raw endpoint URL
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive("alloy_transport_http=info".parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let args = Args::parse();
    let mut config = SentryConfig::from_env()?;
    if args.no_color {
        config.color = false;
    }

    info!("🚀 {} v{}", APP_NAME, APP_VERSION);

    match args.command {
        Command::Sync { main, peers, json } => {
            let main = main
                .or_else(|| config.main_rpc_url.clone())
                .ok_or_else(|| AppError::missing_env("MAIN_RPC_URL"))?;
            let peers = if peers.is_empty() {
                config.peer_rpc_urls.clone()
            } else {
                peers
            };

            if json {
                let report = run_json_sync(&main, &peers, &config).await?;
                if let Some(err) = report.verdict_error() {
                    return Err(err.into());
                }
            } else {
                check_rpc_sync(main.as_str(), peers.iter(), &config).await?;
            }
        }
        Command::Watch {
            to,
            from,
            mode,
            endpoint,
            ws_url,
            timeout_secs,
        } => {
            let options = WatchOptions {
                endpoint: endpoint.map(EndpointTarget::Url),
                poll_interval: None,
                ws_url,
            };
            let tx = run_watch(&to, from, &mode, options, &config, timeout_secs).await?;
            println!("{}", serde_json::to_string_pretty(&tx)?);
        }
    }

    Ok(())
}

/// Sync check that prints the report as JSON even when the verdict fails
async fn run_json_sync(main: &str, peers: &[String], config: &SentryConfig) -> AppResult<SyncReport> {
    let main = EndpointTarget::from(main).into_endpoint(config)?;
    let peers = peers
        .iter()
        .map(|peer| EndpointTarget::from(peer).into_endpoint(config))
        .collect::<AppResult<Vec<_>>>()?;

    let report = SyncChecker::new(SilentReporter).run_check(&main, &peers).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report)
}

async fn run_watch(
    to: &str,
    from: Option<String>,
    mode: &str,
    options: WatchOptions,
    config: &SentryConfig,
    timeout_secs: Option<u64>,
) -> Result<Transaction> {
    let to = parse_address(to)?;
    let from = from.as_deref().map(parse_address).transpose()?;
    let predicate = predicate_fn(move |tx: &Transaction| {
        tx.to() == Some(to) && from.map_or(true, |from| tx.from() == from)
    });

    info!("👀 Waiting for a pending transaction ({} mode)", mode);
    let watch = wait_for_tx(&predicate, mode, options, config);

    let tx = match timeout_secs {
        // Dropping the watch future on timeout releases the subscription
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), watch)
            .await
            .map_err(|_| eyre!("No matching transaction within {}s", secs))??,
        None => watch.await?,
    };
    Ok(tx)
}

fn parse_address(raw: &str) -> AppResult<Address> {
    raw.trim()
        .parse()
        .map_err(|e| AppError::invalid_input(format!("Invalid address {}: {}", raw, e)))
}
