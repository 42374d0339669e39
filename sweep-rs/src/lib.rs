//! sweep-rs: scheduled mailbox cleanup
//!
//! Connects to a single IMAP mailbox, deletes messages older than a cutoff
//! (5 days by default) from a configured list of senders, and records what it
//! did in a plain-text activity log and a JSON status file. A separate
//! read-only web page shows both.
//!
//! # Features
//!
//! - Daily deletion pass and weekly log truncation on a polling scheduler
//! - Server-side `FROM` search, header-only fetch, flag-and-expunge deletion
//! - Messages with missing or unparsable dates are never deleted
//! - Best-effort log/status writes that never abort a pass
//! - Dashboard (`GET /`, `GET /api/status`, `GET /health`)
//!
//! # Example Configuration
//!
//! ```toml
//! [paths]
//! base_dir = "/srv/sweep"          # config/senders.json, config/status.json, log.txt
//!
//! [imap]
//! host = "imap.gmail.com"
//! port = 993
//! mailbox = "INBOX"
//!
//! [policy]
//! cutoff_days = 5
//!
//! [schedule]
//! tick_seconds = 10
//! pass_interval_hours = 24
//! clear_interval_hours = 168
//!
//! [dashboard]
//! listen_addr = "0.0.0.0:5000"
//! ```
//!
//! Credentials are read from the `EMAIL` and `PASSWORD` environment variables.

pub mod activity;
pub mod config;
pub mod dashboard;
pub mod date;
pub mod error;
pub mod mailbox;
pub mod scheduler;
pub mod senders;
pub mod sweeper;

pub use config::{Config, Credentials, PathResolver};
pub use error::{Result, SweepError};
pub use sweeper::{PassReport, Sweeper};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber; `RUST_LOG` wins over `default_filter`
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
