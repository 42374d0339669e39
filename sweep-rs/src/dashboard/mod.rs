//! Read-only status dashboard
//!
//! Builds a display-ready view from the log and status files. Nothing here
//! ever fails: a missing log shows a placeholder line, and a missing or
//! corrupt status file shows "never connected".

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::activity::{ActivityLog, StatusRead, StatusStore};
use crate::config::PathResolver;

pub mod server;

pub use server::{router, DashboardServer};

/// Shown when the log is missing or empty
pub const NO_LOGS: &str = "No logs yet.";

/// Shown when no status was ever recorded
pub const NEVER: &str = "Never";

/// Connection status as displayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusView {
    pub connected: bool,
    pub timestamp: String,
    /// The status file exists but could not be parsed
    pub corrupted: bool,
}

impl Default for StatusView {
    fn default() -> Self {
        Self {
            connected: false,
            timestamp: NEVER.to_string(),
            corrupted: false,
        }
    }
}

impl From<StatusRead> for StatusView {
    fn from(read: StatusRead) -> Self {
        match read {
            StatusRead::Missing => Self::default(),
            StatusRead::Corrupt => Self {
                corrupted: true,
                ..Self::default()
            },
            StatusRead::Present(record) => Self {
                connected: record.connected,
                timestamp: format_timestamp(&record.timestamp),
                corrupted: false,
            },
        }
    }
}

/// Everything the dashboard page shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardView {
    /// Log lines in stored order (oldest first)
    pub logs: Vec<String>,
    pub status: StatusView,
}

impl DashboardView {
    pub async fn load(paths: &PathResolver) -> Self {
        let logs = ActivityLog::new(paths.log_file()).read_lines().await;
        let status = StatusStore::new(paths.status_file()).read().await;
        Self::from_parts(logs, status)
    }

    pub fn from_parts(logs: Vec<String>, status: StatusRead) -> Self {
        let logs = if logs.is_empty() {
            vec![NO_LOGS.to_string()]
        } else {
            logs
        };

        Self {
            logs,
            status: status.into(),
        }
    }

    /// Log lines newest first
    pub fn logs_newest_first(&self) -> impl Iterator<Item = &str> {
        self.logs.iter().rev().map(String::as_str)
    }
}

/// `2025-10-15T07:00:01.5+00:00` → `2025-10-15 07:00:01 UTC`; unparsable
/// values are shown as they are
pub fn format_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(dt) => dt
            .with_timezone(&Utc)
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::StatusRecord;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp("2025-10-15T07:00:01.123456+00:00"),
            "2025-10-15 07:00:01 UTC"
        );
        assert_eq!(
            format_timestamp("2025-10-15T09:00:01+02:00"),
            "2025-10-15 07:00:01 UTC"
        );
        assert_eq!(format_timestamp("last tuesday"), "last tuesday");
    }

    #[test]
    fn test_empty_log_placeholder() {
        let view = DashboardView::from_parts(Vec::new(), StatusRead::Missing);
        assert_eq!(view.logs, vec![NO_LOGS]);
        assert_eq!(view.status, StatusView::default());
    }

    #[test]
    fn test_corrupt_status_uses_default() {
        let view = DashboardView::from_parts(Vec::new(), StatusRead::Corrupt);
        assert!(!view.status.connected);
        assert_eq!(view.status.timestamp, NEVER);
        assert!(view.status.corrupted);
    }

    #[test]
    fn test_present_status_is_formatted() {
        let view = DashboardView::from_parts(
            vec!["a".to_string(), "b".to_string()],
            StatusRead::Present(StatusRecord {
                connected: true,
                timestamp: "2025-10-15T07:00:01+00:00".to_string(),
            }),
        );
        assert!(view.status.connected);
        assert_eq!(view.status.timestamp, "2025-10-15 07:00:01 UTC");
        assert_eq!(view.logs_newest_first().collect::<Vec<_>>(), vec!["b", "a"]);
    }
}
