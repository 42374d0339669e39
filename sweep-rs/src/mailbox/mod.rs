//! Mailbox session abstraction
//!
//! A [`Connector`] opens an authenticated [`MailboxSession`] with the target
//! mailbox already selected. The deletion pass owns the session for its whole
//! duration and must call [`MailboxSession::close`] on every exit path.

use async_trait::async_trait;

use crate::config::Credentials;
use crate::error::Result;

pub mod imap;
pub mod memory;

pub use self::imap::ImapConnector;
pub use self::memory::{MemoryConnector, MemoryStats};

/// Server-assigned message identifier (IMAP UID)
pub type MessageId = u32;

/// Headers needed to decide whether a message is deleted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageHeaders {
    /// From header as displayed, e.g. `News <news@example.com>`
    pub from: Option<String>,
    /// Date header value, absent if the message has none
    pub date: Option<String>,
}

/// A live, authenticated mailbox session
#[async_trait]
pub trait MailboxSession: Send {
    /// Ids of messages whose From header contains `fragment`
    async fn search_by_sender(&mut self, fragment: &str) -> Result<Vec<MessageId>>;

    /// From/Date headers of a message, `None` if the server returned nothing
    async fn fetch_headers(&mut self, id: MessageId) -> Result<Option<MessageHeaders>>;

    /// Mark a message `\Deleted`
    async fn flag_deleted(&mut self, id: MessageId) -> Result<()>;

    /// Permanently remove flagged messages, returning how many were removed
    async fn expunge(&mut self) -> Result<usize>;

    /// Log out; calling it again is a no-op
    async fn close(&mut self) -> Result<()>;
}

/// Opens mailbox sessions
#[async_trait]
pub trait Connector: Send + Sync {
    /// Authenticate and select the mailbox; credentials are checked by [`open_session`]
    async fn open(&self, credentials: &Credentials) -> Result<Box<dyn MailboxSession>>;

    /// Server name used in log lines
    fn server(&self) -> &str;
}

/// Validate credentials, then open a session
///
/// Missing credentials fail with `SweepError::Config` before any network I/O.
pub async fn open_session(
    connector: &dyn Connector,
    credentials: &Credentials,
) -> Result<Box<dyn MailboxSession>> {
    credentials.validate()?;
    connector.open(credentials).await
}
