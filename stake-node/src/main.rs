use anyhow::{anyhow, bail, Context};
use clap::Parser;
use stake_jsonrpc::{ApiKeyManager, RpcImpl, RpcServer, SharedLedger};
use stake_ledger::{
    EventLog, FanOutSink, InMemoryVault, LedgerSnapshot, StakingLedger, SystemClock, TracingEventSink,
};
use stake_registry::MemoryRoleRegistry;
use stake_shared_types::{Address, Amount};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tokio::signal;
use tokio::sync::oneshot;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

mod config;
mod logging;

use config::NodeConfig;

/// Staking ledger node
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address the JSON-RPC server binds to
    #[arg(long)]
    rpc_addr: Option<SocketAddr>,

    /// Directory holding the ledger snapshot
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Principal granted the administrator capability on a fresh ledger
    #[arg(long)]
    admin: Option<Address>,

    /// Set logging level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Path to the log file (optional). If not provided, logs will only go to stdout.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Configuration file to use instead of the per-user default
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    fn apply_to(&self, cfg: &mut NodeConfig) {
        if let Some(rpc_addr) = self.rpc_addr {
            cfg.rpc_addr = rpc_addr;
        }
        if let Some(data_dir) = &self.data_dir {
            cfg.data_dir = data_dir.clone();
        }
        if let Some(admin) = self.admin {
            cfg.admin = admin;
        }
    }
}

/// Restores the ledger from the snapshot at `path`, or starts a fresh one. A fresh
/// start needs a configured admin.
fn open_ledger(cfg: &NodeConfig, path: &Path, events: &EventLog) -> anyhow::Result<StakingLedger> {
    let sink = FanOutSink::new().with(events.clone()).with(TracingEventSink);
    let clock = Arc::new(SystemClock::new());

    match LedgerSnapshot::load_from_file(path).with_context(|| format!("Failed to read snapshot {}", path.display()))? {
        Some(snapshot) => {
            let holdings = Amount::try_from(snapshot.total_holdings())
                .map_err(|_| anyhow!("snapshot holdings exceed the vault's capacity"))?;
            info!(
                "Restoring ledger from snapshot taken at {} ({} accounts)",
                snapshot.taken_at,
                snapshot.accounts.len()
            );
            let ledger = StakingLedger::restore(
                snapshot,
                MemoryRoleRegistry::new(),
                Box::new(InMemoryVault::with_balance(holdings)),
                clock,
                Box::new(sink),
            )?;
            if !ledger.is_admin(&cfg.admin) {
                warn!("Configured admin {} is not an administrator in the restored ledger", cfg.admin);
            }
            Ok(ledger)
        }
        None => {
            if cfg.admin.is_zero() {
                bail!("No admin configured; pass --admin or set `admin` in the configuration before the first start");
            }
            info!("No snapshot at {}, starting a fresh ledger", path.display());
            Ok(StakingLedger::new(
                cfg.ledger,
                cfg.admin,
                MemoryRoleRegistry::new(),
                Box::new(InMemoryVault::new()),
                clock,
                Box::new(sink),
            ))
        }
    }
}

fn save_snapshot(ledger: &SharedLedger, path: &Path) -> anyhow::Result<()> {
    let snapshot = ledger.lock().map_err(|_| anyhow!("ledger lock poisoned"))?.snapshot();
    snapshot.save_to_file(path).with_context(|| format!("Failed to write snapshot {}", path.display()))?;
    info!("Snapshot with {} accounts written to {}", snapshot.accounts.len(), path.display());
    Ok(())
}

/// Waits for `shutdown`, writing a snapshot every `interval` in the meantime. A failed
/// periodic write is logged and tried again at the next tick.
async fn run_until_shutdown<F>(
    shutdown: F,
    ledger: &SharedLedger,
    path: &Path,
    interval: Option<Duration>,
) -> anyhow::Result<()>
where
    F: Future<Output = io::Result<()>>,
{
    tokio::pin!(shutdown);
    let period = match interval {
        Some(period) => period,
        None => return shutdown.await.context("Failed to listen for ctrl-c event"),
    };

    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            result = &mut shutdown => return result.context("Failed to listen for ctrl-c event"),
            _ = ticker.tick() => {
                if let Err(e) = save_snapshot(ledger, path) {
                    error!("Periodic snapshot failed: {:?}", e);
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _log_guard = logging::init(&args.log_level, args.log_file.as_deref())?;

    let config_path = args.config.as_deref();
    info!("Configuration file path: {:?}", config::file_path(config_path)?);
    let mut cfg: NodeConfig = match config::load(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:?}. Using default.", e);
            NodeConfig::default()
        }
    };
    args.apply_to(&mut cfg);
    info!(
        "Loaded configuration: rpc {} ({} threads), data dir {}, {} API keys",
        cfg.rpc_addr,
        cfg.rpc_threads,
        cfg.data_dir.display(),
        cfg.api_keys.len()
    );

    let snapshot_path = cfg.snapshot_path();
    let events = EventLog::with_capacity(cfg.event_log_capacity);
    let ledger: SharedLedger = Arc::new(Mutex::new(open_ledger(&cfg, &snapshot_path, &events)?));

    let api_keys = ApiKeyManager::from_keys(cfg.api_keys.clone().into_iter().collect());
    let rpc_server = RpcServer::new(RpcImpl::new(ledger.clone(), events), api_keys).threads(cfg.rpc_threads);
    let rpc_addr = cfg.rpc_addr;

    // The HTTP transport runs its own event loop, so it lives on a plain thread.
    let (handle_tx, handle_rx) = oneshot::channel();
    let rpc_thread = thread::Builder::new().name("rpc".into()).spawn(move || {
        match rpc_server.start(&rpc_addr) {
            Ok(server) => {
                let _ = handle_tx.send(Ok(server.close_handle()));
                server.wait();
            }
            Err(e) => {
                let _ = handle_tx.send(Err(e));
            }
        }
    })?;
    let close_handle = handle_rx
        .await
        .context("RPC thread exited during startup")?
        .with_context(|| format!("Failed to start RPC server on {}", rpc_addr))?;

    info!("Node is running, RPC on {}. Press Ctrl+C to shut down gracefully.", rpc_addr);
    run_until_shutdown(signal::ctrl_c(), &ledger, &snapshot_path, cfg.snapshot_interval()).await?;
    info!("Ctrl+C received, shutting down.");

    close_handle.close();
    tokio::task::spawn_blocking(move || rpc_thread.join())
        .await?
        .map_err(|_| anyhow!("RPC thread panicked"))?;
    info!("RPC server shut down.");

    save_snapshot(&ledger, &snapshot_path)?;

    // Store the effective configuration
    if let Err(e) = config::store(config_path, &cfg) {
        error!("Failed to store configuration: {:?}", e);
    }
    Ok(())
}
