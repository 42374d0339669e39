//! sweep-rs: scheduler daemon
//!
//! Runs the deletion pass daily and clears the activity log weekly until
//! interrupted (Ctrl-C or SIGTERM).

use chrono::Utc;
use std::sync::Arc;
use sweep_rs::mailbox::ImapConnector;
use sweep_rs::scheduler::Scheduler;
use sweep_rs::sweeper::{ClearLogJob, DeletionPassJob};
use sweep_rs::{Config, Credentials, Sweeper};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    sweep_rs::init_tracing(&format!("sweep_rs={}", config.logging.level));
    info!("Starting sweep-rs v{}", env!("CARGO_PKG_VERSION"));

    let paths = config.paths();
    info!("Configuration loaded");
    info!("  IMAP server: {}:{} ({})", config.imap.host, config.imap.port, config.imap.mailbox);
    info!("  Senders file: {}", paths.senders_file().display());
    info!("  Status file: {}", paths.status_file().display());
    info!("  Log file: {}", paths.log_file().display());
    info!("  Cutoff: {} days", config.policy.cutoff_days);

    let credentials = Credentials::from_env();
    if credentials.validate().is_err() {
        warn!("EMAIL or PASSWORD is not set; deletion passes will be skipped");
    }

    let connector = Arc::new(ImapConnector::new(&config.imap));
    let sweeper = Arc::new(Sweeper::new(&config, connector, credentials));

    let now = Utc::now();
    let mut scheduler = Scheduler::new();
    if config.schedule.run_on_start {
        scheduler.every_starting_now(
            config.schedule.pass_interval(),
            DeletionPassJob::new(Arc::clone(&sweeper)),
            now,
        )?;
    } else {
        scheduler.every(
            config.schedule.pass_interval(),
            DeletionPassJob::new(Arc::clone(&sweeper)),
            now,
        )?;
    }
    scheduler.every(
        config.schedule.clear_interval(),
        ClearLogJob::new(Arc::clone(&sweeper)),
        now,
    )?;

    scheduler.run(config.schedule.tick(), shutdown_signal()).await;

    info!("sweep-rs stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
