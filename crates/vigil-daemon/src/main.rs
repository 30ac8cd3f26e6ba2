//! Vigil Daemon - Service health watcher
//!
//! The daemon:
//! - Checks every active service through the health gateway
//! - Reports availability flips and property changes after each check
//! - Sends a full status report at the configured times of day

use clap::{Parser, ValueEnum};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vigil_daemon::config::StorageConfig;
use vigil_daemon::notify::sink_from_config;
use vigil_daemon::storage::seed_services;
use vigil_daemon::{
    DaemonConfig, DaemonError, DaemonResult, InMemoryStorage, Orchestrator, PostgresStorage,
    Scheduler, ServiceStorage,
};
use vigil_health::{GatewayClient, TickMode};

/// Vigil Daemon CLI
#[derive(Parser)]
#[command(name = "vigild")]
#[command(about = "Vigil Daemon - Service health watcher", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "VIGIL_CONFIG")]
    config: Option<String>,

    /// Log level (overrides the configuration file)
    #[arg(long, env = "VIGIL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "VIGIL_LOG_JSON")]
    json: bool,

    /// Run a single cycle of the given kind and exit
    #[arg(long, value_enum)]
    once: Option<CycleKind>,
}

#[derive(Clone, Copy, ValueEnum)]
enum CycleKind {
    /// Report only changes
    Changes,
    /// Report every service
    Full,
}

impl From<CycleKind> for TickMode {
    fn from(kind: CycleKind) -> Self {
        match kind {
            CycleKind::Changes => TickMode::ChangeDriven,
            CycleKind::Full => TickMode::Periodic,
        }
    }
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = DaemonConfig::load(cli.config.as_deref())?;

    // Initialize tracing
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    if cli.json || config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    config.validate()?;

    let storage: Arc<dyn ServiceStorage> = match &config.storage {
        StorageConfig::Memory => Arc::new(InMemoryStorage::new()),
        StorageConfig::Postgres {
            url,
            max_connections,
            connect_timeout_secs,
        } => Arc::new(PostgresStorage::new(url, *max_connections, *connect_timeout_secs).await?),
    };

    let registered = seed_services(storage.as_ref(), &config.services).await?;
    if registered > 0 {
        tracing::info!(registered, "Registered configured services");
    }

    let fetcher = GatewayClient::new(config.gateway.client_config())
        .map_err(|e| DaemonError::Config(format!("Invalid gateway configuration: {}", e)))?;
    let sink = sink_from_config(&config.notify)?;

    let orchestrator = Arc::new(Orchestrator::new(
        storage,
        Arc::new(fetcher),
        sink,
        config.report.host.clone(),
    ));

    if let Some(kind) = cli.once {
        let summary = orchestrator.run_cycle(kind.into()).await?;
        tracing::info!(?summary, "Single cycle complete");
        return Ok(());
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        gateway = %config.gateway.base_url,
        host = %config.report.host,
        "Vigil daemon starting"
    );

    let scheduler = Scheduler::new(&config.scheduler, orchestrator)?;
    scheduler.start().await;

    shutdown_signal().await?;

    tracing::info!("Vigil daemon shutting down");
    scheduler.stop().await
}

/// Graceful shutdown signal handler
async fn shutdown_signal() -> DaemonResult<()> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                tracing::info!("Received Ctrl+C, initiating graceful shutdown");
            }
            _ = terminate.recv() => {
                tracing::info!("Received terminate signal, initiating graceful shutdown");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!("Received Ctrl+C, initiating graceful shutdown");
    }

    Ok(())
}
