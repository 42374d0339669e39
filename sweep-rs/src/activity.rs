//! Activity log and connection status files
//!
//! Both files are shared with the dashboard process without any locking.
//! Writers here are best-effort: they return a `Result` the caller is free to
//! ignore, and readers treat a missing or half-written file as "no data".

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::error::Result;

/// Current time as an ISO-8601 UTC string
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Append-only, human-readable log of sweep activity
#[derive(Debug, Clone)]
pub struct ActivityLog {
    path: PathBuf,
}

impl ActivityLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `"<timestamp> - <message>"` to the log file
    pub async fn append(&self, message: &str) -> Result<()> {
        info!("{}", message);

        let line = format!("{} - {}\n", now_iso(), message);
        ensure_parent(&self.path).await?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Append, reporting a failure to the tracing output only
    pub async fn record(&self, message: &str) {
        if let Err(e) = self.append(message).await {
            warn!("Failed to write log file {}: {}", self.path.display(), e);
        }
    }

    /// Truncate the log, leaving a single marker line
    pub async fn clear(&self) -> Result<()> {
        ensure_parent(&self.path).await?;
        let marker = format!("Cleared the log file at {}\n", now_iso());
        fs::write(&self.path, marker).await?;
        info!("Cleared log file {}", self.path.display());
        Ok(())
    }

    /// Read all lines; a missing or unreadable file yields no lines
    pub async fn read_lines(&self) -> Vec<String> {
        match fs::read(&self.path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes)
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Last known connection status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub connected: bool,
    pub timestamp: String,
}

/// Outcome of reading the status file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusRead {
    Missing,
    Corrupt,
    Present(StatusRecord),
}

/// Single-record status file, always fully overwritten
#[derive(Debug, Clone)]
pub struct StatusStore {
    path: PathBuf,
}

impl StatusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the status record with `connected` and the current time
    pub async fn write(&self, connected: bool) -> Result<()> {
        let record = StatusRecord {
            connected,
            timestamp: now_iso(),
        };
        let payload = serde_json::to_vec(&record)?;

        ensure_parent(&self.path).await?;

        // Write to a sibling file first so readers never see a partial record
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, payload).await?;
        fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    /// Write, reporting a failure to the tracing output only
    pub async fn update(&self, connected: bool) {
        if let Err(e) = self.write(connected).await {
            warn!("update_status failed for {}: {}", self.path.display(), e);
        }
    }

    pub async fn read(&self) -> StatusRead {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(_) => return StatusRead::Missing,
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return StatusRead::Missing;
        }
        match serde_json::from_slice::<StatusRecord>(&bytes) {
            Ok(record) => StatusRead::Present(record),
            Err(_) => StatusRead::Corrupt,
        }
    }
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_append_prefixes_timestamp() {
        let dir = TempDir::new().unwrap();
        let log = ActivityLog::new(dir.path().join("log.txt"));

        log.append("Connected to Gmail").await.unwrap();
        log.append("Delete scan completed! Removed 0 old emails.").await.unwrap();

        let lines = log.read_lines().await;
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" - Connected to Gmail"));

        let (ts, _) = lines[0].split_once(" - ").unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[tokio::test]
    async fn test_append_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let log = ActivityLog::new(dir.path().join("nested/deeper/log.txt"));
        log.append("hello").await.unwrap();
        assert_eq!(log.read_lines().await.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_leaves_single_marker() {
        let dir = TempDir::new().unwrap();
        let log = ActivityLog::new(dir.path().join("log.txt"));
        for i in 0..5 {
            log.append(&format!("line {}", i)).await.unwrap();
        }

        log.clear().await.unwrap();

        let lines = log.read_lines().await;
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Cleared the log file at "));
    }

    #[tokio::test]
    async fn test_clear_creates_missing_file() {
        let dir = TempDir::new().unwrap();
        let log = ActivityLog::new(dir.path().join("log.txt"));
        log.clear().await.unwrap();
        assert_eq!(log.read_lines().await.len(), 1);
    }

    #[tokio::test]
    async fn test_read_lines_missing_file() {
        let dir = TempDir::new().unwrap();
        let log = ActivityLog::new(dir.path().join("absent.txt"));
        assert!(log.read_lines().await.is_empty());
    }

    #[tokio::test]
    async fn test_read_lines_tolerates_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.txt");
        std::fs::write(&path, b"ok line\n\xff\xfe broken\n").unwrap();

        let lines = ActivityLog::new(&path).read_lines().await;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "ok line");
    }

    #[tokio::test]
    async fn test_append_error_is_returned() {
        let dir = TempDir::new().unwrap();
        // A directory cannot be opened for appending
        let log = ActivityLog::new(dir.path());
        assert!(log.append("nope").await.is_err());
        // and the best-effort variant swallows it
        log.record("nope").await;
    }

    #[tokio::test]
    async fn test_status_roundtrip_and_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = StatusStore::new(dir.path().join("config/status.json"));

        store.write(true).await.unwrap();
        store.write(false).await.unwrap();

        match store.read().await {
            StatusRead::Present(record) => {
                assert!(!record.connected);
                assert!(chrono::DateTime::parse_from_rfc3339(&record.timestamp).is_ok());
            }
            other => panic!("unexpected status: {:?}", other),
        }
        assert!(!dir.path().join("config/status.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_status_missing_and_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("status.json");
        let store = StatusStore::new(&path);
        assert_eq!(store.read().await, StatusRead::Missing);

        std::fs::write(&path, "{\"connected\": tr").unwrap();
        assert_eq!(store.read().await, StatusRead::Corrupt);

        std::fs::write(&path, "").unwrap();
        assert_eq!(store.read().await, StatusRead::Missing);
    }
}
