//! battlogctl - battery log viewer
//!
//! `battlogctl` (or `battlogctl tui`) opens the interactive chart; the other
//! subcommands print and exit.

use anyhow::{Context, Result};
use battlog_common::config::{state_dir, BattlogConfig};
use battlog_common::csv_log::CsvLog;
use battlog_common::power::PowerSupplyReader;
use battlogctl::{commands, tui};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "battlogctl")]
#[command(about = "battlog viewer - battery history, rate and screen-on time", long_about = None)]
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
    /// Interactive chart and status (default)
    Tui,

    /// Print the battery status summary
    Status {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Trim the log to the configured number of lines
    Trim,

    /// Show data, state and config file locations
    Paths,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Tui);
    init_logging(matches!(command, Commands::Tui))?;

    let config = BattlogConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    let explicit = cli.config.as_deref();
    let mut stdout = std::io::stdout();

    match command {
        Commands::Tui => {
            let context = commands::status_context(&config, explicit)?;
            let log = CsvLog::new(context.log_path.clone());
            tui::run(config, log, context).await
        }
        Commands::Status { json } => {
            let mut context = commands::status_context(&config, explicit)?;
            context.live_reading = commands::live_reading(&PowerSupplyReader::default());
            commands::status(&config, context, json, Local::now(), &mut stdout)
        }
        Commands::Trim => commands::trim(&config, &mut stdout),
        Commands::Paths => commands::paths(&config, explicit, &mut stdout),
    }
}

/// The TUI owns the terminal, so it logs to a file; everything else to stderr
fn init_logging(to_file: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if to_file {
        let dir = state_dir();
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join("battlogctl.log");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}
