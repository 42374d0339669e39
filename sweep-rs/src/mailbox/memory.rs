//! In-memory mailbox for testing
//!
//! Behaves like an IMAP mailbox as far as the deletion pass can tell: search
//! is a case-insensitive substring match on From, `\Deleted` messages stay
//! visible until expunged, and every call is counted so tests can assert on
//! what the pass did (or did not) do.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Connector, MailboxSession, MessageHeaders, MessageId};
use crate::config::Credentials;
use crate::error::{Result, SweepError};
use crate::senders::fragment_matches;

/// Call counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub connects: usize,
    pub searches: usize,
    pub fetches: usize,
    pub flags: usize,
    pub expunges: usize,
    pub closes: usize,
}

#[derive(Debug, Clone)]
struct StoredMessage {
    uid: MessageId,
    from: String,
    date: Option<String>,
    deleted: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    messages: Vec<StoredMessage>,
    next_uid: MessageId,
    stats: MemoryStats,
    connect_error: Option<String>,
    search_error: Option<String>,
}

/// Connector handing out sessions over a shared in-memory mailbox
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        lock(&self.state)
    }

    /// Add a message, returning its uid
    pub fn add_message(&self, from: &str, date: Option<&str>) -> MessageId {
        let mut state = self.state();
        state.next_uid += 1;
        let uid = state.next_uid;
        state.messages.push(StoredMessage {
            uid,
            from: from.to_string(),
            date: date.map(str::to_string),
            deleted: false,
        });
        uid
    }

    /// Make every `open` fail with a connection error
    pub fn fail_connect(&self, reason: &str) {
        self.state().connect_error = Some(reason.to_string());
    }

    /// Make searches for `fragment` fail with an IMAP error
    pub fn fail_search(&self, fragment: &str) {
        self.state().search_error = Some(fragment.to_string());
    }

    /// Uids still present in the mailbox
    pub fn uids(&self) -> Vec<MessageId> {
        self.state().messages.iter().map(|m| m.uid).collect()
    }

    pub fn contains(&self, uid: MessageId) -> bool {
        self.state().messages.iter().any(|m| m.uid == uid)
    }

    pub fn stats(&self) -> MemoryStats {
        self.state().stats.clone()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn open(&self, _credentials: &Credentials) -> Result<Box<dyn MailboxSession>> {
        let mut state = self.state();
        state.stats.connects += 1;
        if let Some(reason) = &state.connect_error {
            return Err(SweepError::Connection(reason.clone()));
        }

        Ok(Box::new(MemorySession {
            state: Arc::clone(&self.state),
            closed: false,
        }))
    }

    fn server(&self) -> &str {
        "memory"
    }
}

/// Session over a [`MemoryConnector`]'s mailbox
pub struct MemorySession {
    state: Arc<Mutex<MemoryState>>,
    closed: bool,
}

impl MemorySession {
    fn state(&self) -> Result<MutexGuard<'_, MemoryState>> {
        if self.closed {
            return Err(SweepError::Imap("session already closed".to_string()));
        }
        Ok(lock(&self.state))
    }
}

#[async_trait]
impl MailboxSession for MemorySession {
    async fn search_by_sender(&mut self, fragment: &str) -> Result<Vec<MessageId>> {
        let mut state = self.state()?;
        state.stats.searches += 1;

        if state.search_error.as_deref() == Some(fragment) {
            return Err(SweepError::Imap(format!("SEARCH FROM \"{}\" failed", fragment)));
        }

        Ok(state
            .messages
            .iter()
            .filter(|m| fragment_matches(fragment, &m.from))
            .map(|m| m.uid)
            .collect())
    }

    async fn fetch_headers(&mut self, id: MessageId) -> Result<Option<MessageHeaders>> {
        let mut state = self.state()?;
        state.stats.fetches += 1;

        Ok(state.messages.iter().find(|m| m.uid == id).map(|m| MessageHeaders {
            from: Some(m.from.clone()),
            date: m.date.clone(),
        }))
    }

    async fn flag_deleted(&mut self, id: MessageId) -> Result<()> {
        let mut state = self.state()?;
        state.stats.flags += 1;

        match state.messages.iter_mut().find(|m| m.uid == id) {
            Some(message) => {
                message.deleted = true;
                Ok(())
            }
            None => Err(SweepError::Imap(format!("no message with uid {}", id))),
        }
    }

    async fn expunge(&mut self) -> Result<usize> {
        let mut state = self.state()?;
        state.stats.expunges += 1;

        let before = state.messages.len();
        state.messages.retain(|m| !m.deleted);
        Ok(before - state.messages.len())
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            lock(&self.state).stats.closes += 1;
            self.closed = true;
        }
        Ok(())
    }
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    // A panicking test thread must not hide the mailbox from later assertions
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials::new("me@example.com", "secret")
    }

    #[tokio::test]
    async fn test_search_flag_expunge() {
        let connector = MemoryConnector::new();
        let a = connector.add_message("News <news@example.com>", Some("Tue, 1 Jul 2003 10:52:37 +0000"));
        let b = connector.add_message("friend@example.org", None);

        let mut session = connector.open(&creds()).await.unwrap();
        assert_eq!(session.search_by_sender("NEWS@example.com").await.unwrap(), vec![a]);

        session.flag_deleted(a).await.unwrap();
        // still visible until expunged
        assert_eq!(session.search_by_sender("news@").await.unwrap(), vec![a]);
        assert_eq!(session.expunge().await.unwrap(), 1);
        assert!(session.search_by_sender("news@").await.unwrap().is_empty());

        session.close().await.unwrap();
        session.close().await.unwrap();

        assert_eq!(connector.uids(), vec![b]);
        assert_eq!(connector.stats().closes, 1);
    }

    #[tokio::test]
    async fn test_closed_session_rejects_calls() {
        let connector = MemoryConnector::new();
        let mut session = connector.open(&creds()).await.unwrap();
        session.close().await.unwrap();
        assert!(session.search_by_sender("x").await.is_err());
    }

    #[tokio::test]
    async fn test_open_session_checks_credentials_before_connecting() {
        let connector = MemoryConnector::new();
        let result = crate::mailbox::open_session(&connector, &Credentials::default()).await;
        assert!(matches!(result, Err(SweepError::Config(_))));
        assert_eq!(connector.stats().connects, 0);
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let connector = MemoryConnector::new();
        connector.fail_connect("auth rejected");
        let result = connector.open(&creds()).await;
        assert!(matches!(result, Err(SweepError::Connection(_))));
    }
}
