//! IMAP over TLS, backed by `async-imap`

use async_imap::types::Fetch;
use async_trait::async_trait;
use futures::TryStreamExt;
use mail_parser::{HeaderName, MessageParser};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, info, warn};

use super::{Connector, MailboxSession, MessageHeaders, MessageId};
use crate::config::{Credentials, ImapConfig};
use crate::error::{Result, SweepError};

type TlsImapSession = async_imap::Session<TlsStream<TcpStream>>;

/// Connects to an IMAP server on an implicit-TLS port
pub struct ImapConnector {
    host: String,
    port: u16,
    mailbox: String,
    connect_timeout: Duration,
    tls: TlsConnector,
}

impl ImapConnector {
    pub fn new(config: &ImapConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            mailbox: config.mailbox.clone(),
            connect_timeout: Duration::from_secs(config.connect_timeout_seconds),
            tls: tls_connector(),
        }
    }

    async fn connect_tls(&self) -> Result<TlsStream<TcpStream>> {
        let addr = format!("{}:{}", self.host, self.port);

        let tcp = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| SweepError::Connection(format!("Timed out connecting to {}", addr)))?
            .map_err(|e| SweepError::Connection(format!("Failed to connect to {}: {}", addr, e)))?;

        let server_name = rustls::ServerName::try_from(self.host.as_str())
            .map_err(|e| SweepError::Connection(format!("Invalid server name '{}': {}", self.host, e)))?;

        self.tls
            .connect(server_name, tcp)
            .await
            .map_err(|e| SweepError::Connection(format!("TLS handshake with {} failed: {}", addr, e)))
    }
}

fn tls_connector() -> TlsConnector {
    let mut roots = rustls::RootCertStore::empty();
    roots.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| {
        rustls::OwnedTrustAnchor::from_subject_spki_name_constraints(
            ta.subject,
            ta.spki,
            ta.name_constraints,
        )
    }));

    let config = rustls::ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

#[async_trait]
impl Connector for ImapConnector {
    async fn open(&self, credentials: &Credentials) -> Result<Box<dyn MailboxSession>> {
        let stream = self.connect_tls().await?;
        let client = async_imap::Client::new(stream);

        let mut session = client
            .login(&credentials.email, &credentials.password)
            .await
            .map_err(|(e, _)| SweepError::Connection(format!("Login failed: {}", e)))?;

        if let Err(e) = session.select(&self.mailbox).await {
            let _ = session.logout().await;
            return Err(SweepError::Connection(format!(
                "Failed to select {}: {}",
                self.mailbox, e
            )));
        }

        info!("Logged in to {} as {}, selected {}", self.host, credentials.email, self.mailbox);
        Ok(Box::new(ImapSession {
            session: Some(session),
        }))
    }

    fn server(&self) -> &str {
        &self.host
    }
}

/// Authenticated IMAP session with a selected mailbox
pub struct ImapSession {
    session: Option<TlsImapSession>,
}

impl ImapSession {
    fn session(&mut self) -> Result<&mut TlsImapSession> {
        self.session
            .as_mut()
            .ok_or_else(|| SweepError::Imap("session already closed".to_string()))
    }
}

#[async_trait]
impl MailboxSession for ImapSession {
    async fn search_by_sender(&mut self, fragment: &str) -> Result<Vec<MessageId>> {
        let query = format!("FROM {}", quote(fragment));
        debug!("UID SEARCH {}", query);

        let uids = self.session()?.uid_search(&query).await?;
        let mut ids: Vec<MessageId> = uids.into_iter().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn fetch_headers(&mut self, id: MessageId) -> Result<Option<MessageHeaders>> {
        let messages: Vec<Fetch> = self
            .session()?
            .uid_fetch(id.to_string(), "BODY.PEEK[HEADER]")
            .await?
            .try_collect()
            .await?;

        let header = header_for(messages.iter().map(|m| (m.uid, m.header())), id);
        Ok(header.map(parse_headers))
    }

    async fn flag_deleted(&mut self, id: MessageId) -> Result<()> {
        let _: Vec<Fetch> = self
            .session()?
            .uid_store(id.to_string(), "+FLAGS.SILENT (\\Deleted)")
            .await?
            .try_collect()
            .await?;
        Ok(())
    }

    async fn expunge(&mut self) -> Result<usize> {
        let removed: Vec<u32> = self.session()?.expunge().await?.try_collect().await?;
        Ok(removed.len())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.logout().await {
                warn!("IMAP logout failed: {}", e);
                return Err(e.into());
            }
            debug!("IMAP session logged out");
        }
        Ok(())
    }
}

/// Quote a search argument as an IMAP quoted string
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// Header block of the FETCH response for `id`; responses for other UIDs
/// (unsolicited updates) are ignored
fn header_for<'a>(
    responses: impl IntoIterator<Item = (Option<u32>, Option<&'a [u8]>)>,
    id: MessageId,
) -> Option<&'a [u8]> {
    responses
        .into_iter()
        .find(|(uid, _)| *uid == Some(id))
        .and_then(|(_, header)| header)
}

/// Join a folded header value onto one line
fn unfold(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract From/Date from a raw header block
fn parse_headers(raw: &[u8]) -> MessageHeaders {
    let Some(parsed) = MessageParser::default().parse(raw) else {
        return MessageHeaders::default();
    };

    let from = parsed.from().and_then(|f| f.first()).map(|a| {
        match (a.name(), a.address()) {
            (Some(name), Some(address)) => format!("{} <{}>", name, address),
            (None, Some(address)) => address.to_string(),
            (Some(name), None) => name.to_string(),
            (None, None) => String::new(),
        }
    });

    // Raw text only; interpretation belongs to `parse_date_header`
    let date = parsed
        .header_raw(HeaderName::Date)
        .map(unfold)
        .filter(|d| !d.is_empty());

    MessageHeaders { from, date }
}
