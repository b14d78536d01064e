//! ProofWatch CLI - watch signal collections and verify records from the
//! command line.

use anyhow::{bail, Context};
use clap::Parser;
use proofwatch_core::RecordKind;
use proofwatch_ledger::{DisabledAnchor, LedgerAnchor, MemoryAnchor};
use proofwatch_store::SignalStore;
use proofwatch_verify::{VerificationService, VerifyQuery};
use proofwatch_watcher::{CollectionWatcher, WatcherConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "proofwatch")]
#[command(about = "Tamper-evident integrity engine for time-series signal records")]
struct Cli {
    /// Store path
    #[arg(long, global = true, default_value = "data/proofwatch.db")]
    db: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Watch both collections, baselining new records and recording tampering
    Watch {
        /// Poll interval in seconds, used when the store has no change feed
        #[arg(long, default_value_t = 15)]
        poll_interval: u64,

        /// Anchor digests into the deterministic in-memory ledger instead
        /// of leaving them pending
        #[arg(long)]
        memory_ledger: bool,

        /// Anchoring account for the in-memory ledger
        #[arg(long, default_value = "rPROOFWATCH")]
        account: String,
    },
    /// Verify one record and print the report as JSON
    Verify {
        /// Record kind: coin or stock
        kind: String,

        /// Ticker symbol
        ticker: String,

        /// Nominal timestamp (RFC 3339, or timezone-less UTC+9 wall clock)
        date_added: String,

        /// Expected closing price
        #[arg(long)]
        close: Option<f64>,

        /// Also re-encode the record's current fields and compare
        #[arg(long)]
        live: bool,

        /// Also check the anchoring transaction on the ledger
        #[arg(long)]
        ledger: bool,
    },
    /// Show per-collection record and tamper counts
    Status,
}

fn parse_kind(raw: &str) -> anyhow::Result<RecordKind> {
    match raw {
        "coin" => Ok(RecordKind::Coin),
        "stock" => Ok(RecordKind::Stock),
        other => bail!("unknown record kind: {other} (expected coin or stock)"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            poll_interval,
            memory_ledger,
            account,
        } => watch(&cli.db, poll_interval, memory_ledger, &account).await,
        Commands::Verify {
            kind,
            ticker,
            date_added,
            close,
            live,
            ledger,
        } => {
            let store = SignalStore::open(&cli.db).context("opening store")?;
            let service = VerificationService::new(store, Arc::new(DisabledAnchor));
            let mut query = VerifyQuery::new(parse_kind(&kind)?, ticker, date_added)
                .with_compare_live(live)
                .with_check_ledger(ledger);
            if let Some(close) = close {
                query = query.with_close(close);
            }
            let report = service.verify(&query).await.context("verification failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Status => {
            let store = SignalStore::open(&cli.db).context("opening store")?;
            for kind in [RecordKind::Coin, RecordKind::Stock] {
                let collection = store.collection(kind);
                let records =
                    collection.recent_since(chrono::DateTime::UNIX_EPOCH, usize::MAX)?;
                let baselined = records.iter().filter(|r| r.proof.is_some()).count();
                let tampered = records
                    .iter()
                    .filter(|r| r.proof.as_ref().is_some_and(|p| p.tampered))
                    .count();
                println!(
                    "{kind}: {} records, {baselined} baselined, {tampered} tampered",
                    collection.len()
                );
            }
            Ok(())
        }
    }
}

async fn watch(
    db: &str,
    poll_interval: u64,
    memory_ledger: bool,
    account: &str,
) -> anyhow::Result<()> {
    let store = SignalStore::open(db).context("opening store")?;
    let anchor: Arc<dyn LedgerAnchor> = if memory_ledger {
        Arc::new(MemoryAnchor::validating(account))
    } else {
        Arc::new(DisabledAnchor)
    };
    let config = WatcherConfig::new().with_poll_interval(Duration::from_secs(poll_interval));

    let mut tasks = Vec::new();
    for kind in [RecordKind::Coin, RecordKind::Stock] {
        let watcher =
            CollectionWatcher::new(store.collection(kind), anchor.clone(), config.clone());
        tasks.push(tokio::spawn(async move {
            if let Err(err) = watcher.run().await {
                error!(%kind, %err, "watcher stopped");
            }
        }));
    }
    info!(db, "watching coin and stock collections");

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("shutting down");
    for task in tasks {
        task.abort();
    }
    store.flush().context("flushing store")?;
    Ok(())
}
