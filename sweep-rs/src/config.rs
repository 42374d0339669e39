//! Configuration for sweep-rs
//!
//! Settings come from an optional TOML file; every section has defaults so a
//! partial file (or none at all) is valid. Mailbox credentials are never read
//! from the file, only from the `EMAIL` and `PASSWORD` environment variables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SweepError};

/// Environment variable pointing at a config file
pub const CONFIG_ENV: &str = "SWEEP_CONFIG";

/// Environment variable overriding `paths.base_dir`
pub const BASE_DIR_ENV: &str = "SWEEP_BASE_DIR";

/// Largest accepted `policy.cutoff_days` (about a century)
pub const MAX_CUTOFF_DAYS: u32 = 36_500;

const DEFAULT_CONFIG_FILE: &str = "sweep.toml";

/// Main configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub imap: ImapConfig,
    pub policy: PolicyConfig,
    pub schedule: ScheduleConfig,
    pub dashboard: DashboardConfig,
    pub logging: LoggingConfig,
}

/// File locations
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory everything else is derived from
    pub base_dir: PathBuf,
    /// Explicit sender list location (default: `<base>/config/senders.json`)
    pub senders_file: Option<PathBuf>,
    /// Explicit status file location (default: `<base>/config/status.json`)
    pub status_file: Option<PathBuf>,
    /// Explicit log file location (default: `<base>/log.txt`)
    pub log_file: Option<PathBuf>,
}

/// IMAP server settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    /// Mailbox to sweep
    pub mailbox: String,
    /// TCP connect timeout in seconds
    pub connect_timeout_seconds: u64,
}

/// Deletion policy settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Messages older than this many days are deleted
    pub cutoff_days: u32,
}

/// Scheduler settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Polling interval
    pub tick_seconds: u64,
    /// Interval between deletion passes
    pub pass_interval_hours: u64,
    /// Interval between log clears
    pub clear_interval_hours: u64,
    /// Run a deletion pass immediately at startup
    pub run_on_start: bool,
}

/// Dashboard HTTP server settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub listen_addr: String,
}

/// Diagnostic logging settings (`RUST_LOG` takes precedence)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            senders_file: None,
            status_file: None,
            log_file: None,
        }
    }
}

impl Default for ImapConfig {
    fn default() -> Self {
        Self {
            host: "imap.gmail.com".to_string(),
            port: 993,
            mailbox: "INBOX".to_string(),
            connect_timeout_seconds: 30,
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self { cutoff_days: 5 }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 10,
            pass_interval_hours: 24,
            clear_interval_hours: 24 * 7,
            run_on_start: false,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:5000".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl PolicyConfig {
    pub fn cutoff(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.cutoff_days))
    }
}

impl ScheduleConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_seconds)
    }

    pub fn pass_interval(&self) -> Duration {
        Duration::from_secs(self.pass_interval_hours * 3600)
    }

    pub fn clear_interval(&self) -> Duration {
        Duration::from_secs(self.clear_interval_hours * 3600)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SweepError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| SweepError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from `$SWEEP_CONFIG`, else `./sweep.toml` if present, else defaults,
    /// then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        if let Some(base_dir) = std::env::var_os(BASE_DIR_ENV) {
            config.paths.base_dir = PathBuf::from(base_dir);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.imap.host.trim().is_empty() {
            return Err(SweepError::Config("imap.host must not be empty".to_string()));
        }
        if self.imap.mailbox.trim().is_empty() {
            return Err(SweepError::Config("imap.mailbox must not be empty".to_string()));
        }
        if self.imap.connect_timeout_seconds == 0 {
            return Err(SweepError::Config(
                "imap.connect_timeout_seconds must be at least 1".to_string(),
            ));
        }
        if self.policy.cutoff_days > MAX_CUTOFF_DAYS {
            return Err(SweepError::Config(format!(
                "policy.cutoff_days must be at most {}",
                MAX_CUTOFF_DAYS
            )));
        }
        if self.schedule.tick_seconds == 0 {
            return Err(SweepError::Config("schedule.tick_seconds must be at least 1".to_string()));
        }
        if self.schedule.pass_interval_hours == 0 || self.schedule.clear_interval_hours == 0 {
            return Err(SweepError::Config("schedule intervals must be at least 1 hour".to_string()));
        }
        Ok(())
    }

    pub fn paths(&self) -> PathResolver {
        PathResolver::new(&self.paths)
    }
}

/// Resolved file locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    base_dir: PathBuf,
    senders_file: PathBuf,
    status_file: PathBuf,
    log_file: PathBuf,
}

impl PathResolver {
    pub fn new(paths: &PathsConfig) -> Self {
        let base_dir = paths.base_dir.clone();
        let config_dir = base_dir.join("config");

        Self {
            senders_file: paths
                .senders_file
                .clone()
                .unwrap_or_else(|| config_dir.join("senders.json")),
            status_file: paths
                .status_file
                .clone()
                .unwrap_or_else(|| config_dir.join("status.json")),
            log_file: paths.log_file.clone().unwrap_or_else(|| base_dir.join("log.txt")),
            base_dir,
        }
    }

    /// All paths derived from `base_dir` with no overrides
    pub fn from_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self::new(&PathsConfig {
            base_dir: base_dir.into(),
            ..PathsConfig::default()
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn senders_file(&self) -> &Path {
        &self.senders_file
    }

    pub fn status_file(&self) -> &Path {
        &self.status_file
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }
}

/// Mailbox login credentials
#[derive(Clone, Default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Read `EMAIL` and `PASSWORD`; absent variables become empty strings and
    /// are rejected later by [`Credentials::validate`]
    pub fn from_env() -> Self {
        Self {
            email: std::env::var("EMAIL").unwrap_or_default(),
            password: std::env::var("PASSWORD").unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(SweepError::Config(
                "Missing EMAIL or PASSWORD environment variables".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
