//! One-shot maintenance commands
//!
//! # Usage
//!
//! ```bash
//! # Run a deletion pass now
//! EMAIL=me@gmail.com PASSWORD=app-password sweep-once run
//!
//! # Truncate the activity log
//! sweep-once clear-log
//!
//! # Print the current status and log
//! sweep-once status
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use sweep_rs::dashboard::DashboardView;
use sweep_rs::mailbox::ImapConnector;
use sweep_rs::{Config, Credentials, Sweeper};

#[derive(Parser)]
#[command(name = "sweep-once")]
#[command(about = "Run sweep-rs tasks once", long_about = None)]
struct Cli {
    /// Config file (defaults to $SWEEP_CONFIG or ./sweep.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Delete old messages from the configured senders
    Run {
        /// Override the cutoff in days
        #[arg(long)]
        cutoff_days: Option<u32>,
    },
    /// Truncate the activity log
    ClearLog,
    /// Print connection status and the activity log
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    if let Commands::Run {
        cutoff_days: Some(days),
    } = cli.command
    {
        config.policy.cutoff_days = days;
    }
    config.validate()?;

    sweep_rs::init_tracing(&format!("sweep_rs={}", config.logging.level));

    match cli.command {
        Commands::Run { .. } => {

            let connector = Arc::new(ImapConnector::new(&config.imap));
            let sweeper = Sweeper::new(&config, connector, Credentials::from_env());

            let report = sweeper.run_pass().await?;
            println!("Deleted: {}", report.deleted);
            println!("Expunged: {}", report.expunged);
            println!("Skipped (no usable date): {}", report.skipped_undated);
            for error in &report.errors {
                println!("Error: {}", error);
            }
            if !report.is_clean() {
                std::process::exit(1);
            }
        }
        Commands::ClearLog => {
            let paths = config.paths();
            sweep_rs::activity::ActivityLog::new(paths.log_file())
                .clear()
                .await?;
            println!("Cleared {}", paths.log_file().display());
        }
        Commands::Status => {
            let view = DashboardView::load(&config.paths()).await;
            let state = if view.status.connected {
                "connected"
            } else {
                "disconnected"
            };
            println!("Status: {} (last update: {})", state, view.status.timestamp);
            if view.status.corrupted {
                println!("Warning: status file could not be parsed");
            }
            println!();
            for line in &view.logs {
                println!("{}", line);
            }
        }
    }

    Ok(())
}
