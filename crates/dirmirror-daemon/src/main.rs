//! dirmirror Daemon - One-way directory mirroring service
//!
//! This binary runs as a long-lived user service and:
//! - Mirrors one local directory into a remote folder every `poll_interval`
//! - Records each synchronized file in a SQLite ledger
//! - Shuts down gracefully on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! Startup validates the configuration and checks every dependency (local
//! directory, ledger, credentials, remote listing) before the first cycle.
//! Any failure there is fatal. Afterwards the [`CycleScheduler`] runs until
//! a `CancellationToken` is triggered by a signal; a cycle in progress is
//! always allowed to finish.

mod logging;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use dirmirror_core::config::Config;
use dirmirror_core::domain::LedgerChangeSet;
use dirmirror_core::ports::{ILedgerStore, IRemoteConnector};
use dirmirror_ledger::{LedgerDatabase, SqliteLedgerStore};
use dirmirror_remote::DiskRemoteConnector;
use dirmirror_sync::engine::{CycleResult, SyncEngine};
use dirmirror_sync::filesystem::LocalDirectoryObserver;
use dirmirror_sync::scheduler::CycleScheduler;

#[derive(Debug, Parser)]
#[command(name = "dirmirrord", version, about = "Mirror a local directory into cloud storage")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, env = "DIRMIRROR_CONFIG")]
    config: Option<PathBuf>,

    /// Run a single sync cycle and exit
    #[arg(long)]
    once: bool,
}

// ============================================================================
// Configuration
// ============================================================================

/// Loads the configuration and applies environment overrides
///
/// An explicitly requested file must exist. Without one, a missing default
/// file means built-in defaults.
fn load_config(explicit: Option<&PathBuf>) -> Result<(Config, PathBuf)> {
    let (path, mut config) = match explicit {
        Some(path) => {
            let config = Config::load(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            (path.clone(), config)
        }
        None => {
            let path = Config::default_path();
            let config = if path.exists() {
                Config::load(&path).with_context(|| {
                    format!("Failed to load configuration from {}", path.display())
                })?
            } else {
                Config::default()
            };
            (path, config)
        }
    };

    config.apply_env_overrides();
    config.expand_paths();
    Ok((config, path))
}

/// Fails with every validation problem listed
fn ensure_valid(config: &Config) -> Result<()> {
    let errors = config.validate();
    if errors.is_empty() {
        return Ok(());
    }

    for e in &errors {
        error!(field = %e.field, "{}", e.message);
    }
    let summary: Vec<String> = errors.iter().map(ToString::to_string).collect();
    bail!("Invalid configuration: {}", summary.join("; "))
}

// ============================================================================
// DaemonService
// ============================================================================

/// Owns the validated configuration and the shutdown token
struct DaemonService {
    config: Config,
    shutdown: CancellationToken,
}

impl DaemonService {
    fn new(config: Config, shutdown: CancellationToken) -> Self {
        Self { config, shutdown }
    }

    /// Checks every dependency and wires the engine
    async fn build_engine(&self) -> Result<SyncEngine> {
        let local = LocalDirectoryObserver::new(&self.config.sync.local_dir);
        local.ensure_exists().await.with_context(|| {
            format!(
                "Watched directory {} is not usable",
                self.config.sync.local_dir.display()
            )
        })?;

        let db = LedgerDatabase::open(&self.config.ledger.path)
            .await
            .with_context(|| {
                format!("Failed to open ledger {}", self.config.ledger.path.display())
            })?;
        let ledger = SqliteLedgerStore::new(db.pool().clone());
        let tracked = ledger.len().await.context("Failed to read ledger")?;

        let remote = DiskRemoteConnector::from_config(&self.config.remote)
            .context("Failed to create remote connector")?;
        let remote_count = remote
            .list()
            .await
            .context("Remote listing failed at startup")?
            .len();

        info!(
            local_dir = %self.config.sync.local_dir.display(),
            remote_root = %remote.root(),
            ledger = %self.config.ledger.path.display(),
            tracked,
            remote_files = remote_count,
            "Startup checks passed"
        );

        Ok(SyncEngine::new(Arc::new(remote), Arc::new(local), Arc::new(ledger))
            .with_max_concurrent_actions(self.config.sync.max_concurrent_actions))
    }

    async fn run(&self, once: bool) -> Result<()> {
        let engine = self.build_engine().await?;
        let scheduler = CycleScheduler::new(
            engine,
            Duration::from_secs(self.config.sync.poll_interval),
            self.shutdown.clone(),
        );

        if once {
            let result = scheduler.run_once(LedgerChangeSet::new()).await;
            return check_single_cycle(&result);
        }

        scheduler.run().await;
        Ok(())
    }
}

/// Exit status for `--once`: an error if anything was left undone
fn check_single_cycle(result: &CycleResult) -> Result<()> {
    if let Some(reason) = &result.aborted {
        bail!("Sync cycle aborted: {reason}");
    }
    if result.failed() > 0 {
        bail!("Sync cycle finished with {} failed actions", result.failed());
    }
    if !result.carry_over.is_empty() {
        bail!("Ledger changes could not be persisted");
    }
    Ok(())
}

// ============================================================================
// Graceful shutdown signal handler
// ============================================================================

/// Resolves on the first SIGTERM or SIGINT
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }
}

/// Cancels `token` once `signal` resolves
async fn cancel_on<F>(signal: F, token: CancellationToken)
where
    F: Future<Output = ()>,
{
    signal.await;
    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, config_path) = load_config(cli.config.as_ref())?;
    logging::init(&config.logging)?;

    info!(config_path = %config_path.display(), "dirmirror daemon starting (dirmirrord)");
    ensure_valid(&config)?;

    let shutdown_token = CancellationToken::new();
    tokio::spawn(cancel_on(shutdown_signal(), shutdown_token.clone()));

    let service = DaemonService::new(config, shutdown_token);
    let result = service.run(cli.once).await;

    match &result {
        Ok(()) => info!("dirmirror daemon shut down gracefully"),
        Err(e) => {
            let reason = format!("{e:#}");
            error!(error = %reason, "dirmirror daemon exiting with error");
        }
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
