//! Aging deletion policy
//!
//! One pass: load the sender list, open a mailbox session, search each sender
//! fragment, flag every matched message whose Date is older than the cutoff,
//! expunge, and close the session. Messages without a usable Date header are
//! never deleted.
//!
//! # Flow
//! ```text
//! senders.json ─► SenderList ─► login ─► for each fragment:
//!                                          SEARCH FROM ─► FETCH headers ─► date < cutoff? ─► STORE \Deleted
//!                                        ─► EXPUNGE ─► LOGOUT ─► status.json
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::activity::{ActivityLog, StatusStore};
use crate::config::{Config, Credentials};
use crate::date::parse_date_header;
use crate::error::{Result, SweepError};
use crate::mailbox::{open_session, Connector, MailboxSession};
use crate::scheduler::Job;
use crate::senders::{fragment_matches, SenderList};

/// Outcome of one deletion pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Messages flagged for deletion
    pub deleted: usize,
    /// Messages the server reported as expunged
    pub expunged: usize,
    /// Matched messages skipped for a missing or unparsable Date
    pub skipped_undated: usize,
    /// Failures that cut the pass short
    pub errors: Vec<String>,
}

impl PassReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs deletion passes against one mailbox
pub struct Sweeper {
    connector: Arc<dyn Connector>,
    credentials: Credentials,
    senders_file: PathBuf,
    log: ActivityLog,
    status: StatusStore,
    cutoff: Duration,
}

impl Sweeper {
    pub fn new(config: &Config, connector: Arc<dyn Connector>, credentials: Credentials) -> Self {
        let paths = config.paths();
        Self {
            connector,
            credentials,
            senders_file: paths.senders_file().to_path_buf(),
            log: ActivityLog::new(paths.log_file()),
            status: StatusStore::new(paths.status_file()),
            cutoff: config.policy.cutoff(),
        }
    }

    pub fn with_cutoff(mut self, cutoff: Duration) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn cutoff(&self) -> Duration {
        self.cutoff
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    pub fn status(&self) -> &StatusStore {
        &self.status
    }

    /// Reload the sender list and run a pass with the configured cutoff
    pub async fn run_pass(&self) -> Result<PassReport> {
        self.log.record("=== Delete old emails scan started ===").await;

        let file_name = self
            .senders_file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.senders_file.display().to_string());

        let senders = match SenderList::load_optional(&self.senders_file).await {
            Ok(Some(senders)) => senders,
            Ok(None) => {
                self.log.record(&format!("{} not found", file_name)).await;
                return Ok(PassReport::default());
            }
            Err(e) => {
                self.log
                    .record(&format!("Failed to read {}: {}", file_name, e))
                    .await;
                return Err(e);
            }
        };

        self.delete_old_emails(&senders).await
    }

    /// Delete messages from `senders` older than now minus the cutoff
    pub async fn delete_old_emails(&self, senders: &SenderList) -> Result<PassReport> {
        self.delete_old_emails_at(senders, Utc::now()).await
    }

    /// Same as [`Sweeper::delete_old_emails`] with an explicit current time
    pub async fn delete_old_emails_at(
        &self,
        senders: &SenderList,
        now: DateTime<Utc>,
    ) -> Result<PassReport> {
        if senders.is_empty() {
            self.log.record("No senders configured for deletion").await;
            return Ok(PassReport::default());
        }

        let Some(cutoff) = now.checked_sub_signed(self.cutoff) else {
            let msg = format!("Cutoff of {} days is out of range", self.cutoff.num_days());
            self.log.record(&msg).await;
            return Err(SweepError::Config(msg));
        };

        let mut session = self.login().await?;
        let mut report = PassReport::default();

        let outcome = self
            .flag_old_messages(session.as_mut(), senders, cutoff, &mut report)
            .await;
        if let Err(e) = &outcome {
            error!("Deletion pass failed: {}", e);
            self.log.record(&format!("ERROR during deletion: {}", e)).await;
            report.errors.push(e.to_string());
        }

        // Expunge even after a failure so already-flagged messages are removed
        match session.expunge().await {
            Ok(expunged) => {
                report.expunged = expunged;
                if outcome.is_ok() {
                    self.log
                        .record(&format!(
                            "Delete scan completed! Removed {} old emails.",
                            report.deleted
                        ))
                        .await;
                }
            }
            Err(e) => {
                error!("Expunge failed: {}", e);
                self.log.record(&format!("ERROR during expunge: {}", e)).await;
                report.errors.push(e.to_string());
            }
        }

        if let Err(e) = session.close().await {
            warn!("Failed to close mailbox session: {}", e);
        }

        // The session was established, so the status reports connected even
        // when the pass itself failed part-way.
        self.status.update(true).await;

        Ok(report)
    }

    /// Truncate the activity log
    pub async fn clear_log(&self) -> Result<()> {
        self.log.clear().await
    }

    async fn login(&self) -> Result<Box<dyn MailboxSession>> {
        match open_session(self.connector.as_ref(), &self.credentials).await {
            Ok(session) => {
                self.status.update(true).await;
                self.log
                    .record(&format!("Connected to {}", self.connector.server()))
                    .await;
                Ok(session)
            }
            Err(e) => {
                match &e {
                    SweepError::Config(msg) => self.log.record(msg).await,
                    other => self.log.record(&format!("Failed to connect: {}", other)).await,
                }
                self.status.update(false).await;
                Err(e)
            }
        }
    }

    async fn flag_old_messages(
        &self,
        session: &mut dyn MailboxSession,
        senders: &SenderList,
        cutoff: DateTime<Utc>,
        report: &mut PassReport,
    ) -> Result<()> {
        let mut flagged = HashSet::new();

        for fragment in senders.iter() {
            let ids = session
                .search_by_sender(fragment)
                .await
                .map_err(|e| with_sender(fragment, e))?;
            debug!("{} message(s) match sender '{}'", ids.len(), fragment);

            for id in ids {
                if flagged.contains(&id) {
                    continue;
                }

                let Some(headers) = session
                    .fetch_headers(id)
                    .await
                    .map_err(|e| with_sender(fragment, e))?
                else {
                    continue;
                };

                // The server's FROM search may be looser than a substring match
                if let Some(from) = headers.from.as_deref() {
                    if !fragment_matches(fragment, from) {
                        debug!("uid {}: From '{}' does not contain '{}'", id, from, fragment);
                        continue;
                    }
                } else {
                    continue;
                }

                let Some(date) = headers.date.as_deref().and_then(parse_date_header) else {
                    debug!("uid {}: missing or unparsable Date header, skipped", id);
                    report.skipped_undated += 1;
                    continue;
                };

                if date < cutoff {
                    session
                        .flag_deleted(id)
                        .await
                        .map_err(|e| with_sender(fragment, e))?;
                    flagged.insert(id);
                    report.deleted += 1;
                    self.log
                        .record(&format!("Deleted: {} - {}", fragment, date.to_rfc3339()))
                        .await;
                }
            }
        }

        Ok(())
    }
}

fn with_sender(fragment: &str, e: SweepError) -> SweepError {
    match e {
        SweepError::Imap(msg) => SweepError::Imap(format!("sender '{}': {}", fragment, msg)),
        other => other,
    }
}

/// Scheduled deletion pass; failures are logged, never propagated
pub struct DeletionPassJob {
    sweeper: Arc<Sweeper>,
}

impl DeletionPassJob {
    pub fn new(sweeper: Arc<Sweeper>) -> Self {
        Self { sweeper }
    }
}

#[async_trait]
impl Job for DeletionPassJob {
    fn name(&self) -> &str {
        "delete-old-emails"
    }

    async fn run(&self) {
        match self.sweeper.run_pass().await {
            Ok(report) if report.is_clean() => {
                debug!("Deletion pass finished: {} deleted", report.deleted)
            }
            Ok(report) => warn!(
                "Deletion pass finished with errors: {} deleted, {:?}",
                report.deleted, report.errors
            ),
            Err(e) => warn!("Deletion pass aborted: {}", e),
        }
    }
}

/// Scheduled log truncation
pub struct ClearLogJob {
    sweeper: Arc<Sweeper>,
}

impl ClearLogJob {
    pub fn new(sweeper: Arc<Sweeper>) -> Self {
        Self { sweeper }
    }
}

#[async_trait]
impl Job for ClearLogJob {
    fn name(&self) -> &str {
        "clear-log"
    }

    async fn run(&self) {
        if let Err(e) = self.sweeper.clear_log().await {
            warn!("Failed to clear log file: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathsConfig;
    use crate::mailbox::MemoryConnector;
    use tempfile::TempDir;

    fn sweeper(dir: &TempDir, connector: &MemoryConnector) -> Sweeper {
        let mut config = Config::default();
        config.paths = PathsConfig {
            base_dir: dir.path().to_path_buf(),
            ..PathsConfig::default()
        };
        Sweeper::new(
            &config,
            Arc::new(connector.clone()),
            Credentials::new("me@example.com", "secret"),
        )
    }

    fn days_ago(days: i64) -> String {
        (Utc::now() - Duration::days(days)).to_rfc2822()
    }

    #[tokio::test]
    async fn test_flags_only_old_matching_messages() {
        let dir = TempDir::new().unwrap();
        let connector = MemoryConnector::new();
        let old = connector.add_message("newsletter@example.com", Some(&days_ago(10)));
        let recent = connector.add_message("newsletter@example.com", Some(&days_ago(2)));
        let other = connector.add_message("friend@example.com", Some(&days_ago(30)));

        let senders = SenderList::new(["newsletter@example.com"]);
        let report = sweeper(&dir, &connector).delete_old_emails(&senders).await.unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(report.expunged, 1);
        assert!(!connector.contains(old));
        assert!(connector.contains(recent));
        assert!(connector.contains(other));
    }

    #[tokio::test]
    async fn test_message_matched_twice_is_counted_once() {
        let dir = TempDir::new().unwrap();
        let connector = MemoryConnector::new();
        connector.add_message("Promo <deals@shop.example.com>", Some(&days_ago(9)));

        let senders = SenderList::new(["deals@", "shop.example.com"]);
        let report = sweeper(&dir, &connector).delete_old_emails(&senders).await.unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(connector.stats().flags, 1);
    }

    #[test]
    fn test_with_sender_only_wraps_imap_errors() {
        let e = with_sender("x@example.com", SweepError::Imap("NO".to_string()));
        assert_eq!(e.to_string(), "IMAP error: sender 'x@example.com': NO");

        let e = with_sender("x@example.com", SweepError::Parse("bad".to_string()));
        assert!(matches!(e, SweepError::Parse(_)));
    }

    #[tokio::test]
    async fn test_out_of_range_cutoff_is_rejected_before_connecting() {
        let dir = TempDir::new().unwrap();
        let connector = MemoryConnector::new();
        let uid = connector.add_message("newsletter@example.com", Some(&days_ago(30)));

        let mut config = Config::default();
        config.paths = PathsConfig {
            base_dir: dir.path().to_path_buf(),
            ..PathsConfig::default()
        };
        config.policy.cutoff_days = 4_000_000_000;
        let sweeper = Sweeper::new(
            &config,
            Arc::new(connector.clone()),
            Credentials::new("me@example.com", "secret"),
        );

        let senders = SenderList::new(["newsletter@example.com"]);
        let result = sweeper.delete_old_emails(&senders).await;

        assert!(matches!(result, Err(SweepError::Config(_))));
        assert_eq!(connector.stats().connects, 0);
        assert!(connector.contains(uid));
    }

    #[tokio::test]
    async fn test_cutoff_is_strict() {
        let dir = TempDir::new().unwrap();
        let connector = MemoryConnector::new();
        let now = Utc::now();
        let exactly = (now - Duration::days(5)).to_rfc3339();
        let uid = connector.add_message("newsletter@example.com", Some(&exactly));

        let senders = SenderList::new(["newsletter@example.com"]);
        let report = sweeper(&dir, &connector)
            .delete_old_emails_at(&senders, now)
            .await
            .unwrap();

        assert_eq!(report.deleted, 0);
        assert!(connector.contains(uid));
    }
}
