//! battlogd - battery sampler daemon
//!
//! `battlogd run` samples periodically until interrupted; `battlogd sample`
//! appends a single row, for use from a systemd timer or cron.

use anyhow::{bail, Context, Result};
use battlog_common::config::BattlogConfig;
use battlog_common::lock::PidLock;
use battlog_common::BattlogError;
use battlogd::{Sampler, LOCK_FILE, PROCESS_NAME};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "battlogd")]
#[command(about = "battlog sampler - logs battery charge and AC state to CSV", long_about = None)]
#[command(version)]
struct Cli {
    /// Extra config file layered over the system and user files
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample periodically until interrupted (default)
    Run,

    /// Append one sample and exit
    Sample,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = BattlogConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    let sampler = Sampler::from_config(config.clone()).context("Failed to prepare log file")?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Sample => {
            let reading = sampler.sample_once().context("Sample failed")?;
            info!(
                "Logged battery {}% (ac {})",
                reading.battery_percent, reading.ac_connected
            );
            Ok(())
        }
        Commands::Run => run(&config, sampler).await,
    }
}

async fn run(config: &BattlogConfig, sampler: Sampler) -> Result<()> {
    let lock_path = config.log_dir().join(LOCK_FILE);
    let Some(_lock) = PidLock::acquire(&lock_path, PROCESS_NAME)
        .with_context(|| format!("Failed to take lock {}", lock_path.display()))?
    else {
        let pid = PidLock::holder(&lock_path).unwrap_or(0);
        bail!(BattlogError::LockHeld {
            path: lock_path,
            pid
        });
    };

    info!("battlogd v{} starting", env!("CARGO_PKG_VERSION"));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutting down gracefully"),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
        let _ = shutdown_tx.send(true);
    });

    sampler.run(shutdown_rx).await;
    Ok(())
}
