//! Maestro orchestrator daemon.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! maestro
//!
//! # Run with custom configuration and spec files
//! maestro --config /etc/maestro.json --specs /etc/workers.json
//!
//! # Run with environment variable overrides
//! MAESTRO_STOP_TIMEOUT=10 maestro
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use maestro_core::config::ManagerConfig;
use maestro_orchestrator::{JsonFileSource, LifecycleScheduler, Orchestrator, TradingCalendar};

/// Maestro strategy-worker orchestrator
#[derive(Parser, Debug)]
#[command(name = "maestro")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "maestro.json", env = "MAESTRO_CONFIG")]
    config: PathBuf,

    /// Path to the desired worker spec file
    #[arg(short, long, default_value = "workers.json", env = "MAESTRO_SPECS")]
    specs: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = load_config(&args)?;
    if args.validate {
        println!("Configuration is valid");
        return Ok(());
    }

    let orchestrator = Arc::new(Orchestrator::with_defaults(config.clone()));
    let source = Arc::new(JsonFileSource::new(&args.specs));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = LifecycleScheduler::new(
        Arc::clone(&orchestrator),
        Arc::new(TradingCalendar::default()),
        config.scheduler.clone(),
    );
    let scheduler_task = {
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move { scheduler.run(shutdown_rx).await })
    };

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            shutdown_tx.send_replace(true);
        }
    });

    info!(specs = %args.specs.display(), "maestro starting");
    orchestrator.run(source, shutdown_rx).await;
    let _ = scheduler_task.await;
    info!("maestro stopped");
    Ok(())
}

/// Loads configuration from file and applies overrides.
fn load_config(args: &Args) -> anyhow::Result<ManagerConfig> {
    let mut config = if args.config.exists() {
        ManagerConfig::from_file(&args.config)
            .with_context(|| format!("loading configuration from {}", args.config.display()))?
    } else {
        eprintln!(
            "Configuration file not found: {}, using defaults",
            args.config.display()
        );
        ManagerConfig::default()
    };
    config.apply_env_overrides();
    config.validate().context("invalid configuration")?;
    Ok(config)
}
