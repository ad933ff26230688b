//! Mailbox scanning.
//!
//! A [`MailTransport`] opens an authenticated [`MailConnection`] with the
//! folder already selected. [`MailboxScanner`] then searches for messages
//! mentioning "unsubscribe", fetches each one, decodes its HTML parts and
//! folds every extracted link into a [`ServiceGrouper`].
//!
//! Connection, authentication and search failures end the scan. A message
//! that cannot be fetched or parsed, or a part that cannot be decoded, is
//! recorded in the [`ScanReport`] and skipped. The connection is always
//! logged out, on the error paths too, by [`SessionGuard`].
//!
//! Everything here is blocking; the facade runs it on a blocking thread.

pub mod imap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::{Result, UnsubscriberError};
use crate::extract::extract_unsubscribe_links;
use crate::message::decode_html_parts;
use crate::services::{Grouping, ServiceGrouper};

pub use self::imap::ImapTransport;

/// Server-side search predicate for candidate messages.
pub const UNSUBSCRIBE_QUERY: &str = "BODY \"unsubscribe\"";

/// Message sequence number as returned by the server.
pub type MessageId = u32;

/// Mailbox login.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    address: String,
    password: String,
}

impl Credentials {
    pub fn new(address: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            password: password.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("address", &self.address)
            .field("password", &"***")
            .finish()
    }
}

/// An authenticated session with a folder selected.
pub trait MailConnection {
    /// Ids of messages matching `query`, in any order.
    fn search(&mut self, query: &str) -> Result<Vec<MessageId>>;

    /// Full RFC 5322 bytes of one message.
    fn fetch(&mut self, id: MessageId) -> Result<Vec<u8>>;

    fn logout(&mut self) -> Result<()>;
}

/// Capability to open a [`MailConnection`].
pub trait MailTransport {
    type Connection: MailConnection;

    fn connect(&self, credentials: &Credentials) -> Result<Self::Connection>;

    /// Human-readable target (host:port/folder) for diagnostics.
    fn describe(&self) -> String;
}

/// Logs the connection out when dropped unless [`SessionGuard::close`] ran.
pub struct SessionGuard<C: MailConnection> {
    conn: C,
    closed: bool,
}

impl<C: MailConnection> SessionGuard<C> {
    pub fn new(conn: C) -> Self {
        Self {
            conn,
            closed: false,
        }
    }

    pub fn connection(&mut self) -> &mut C {
        &mut self.conn
    }

    /// Explicit best-effort logout.
    pub fn close(mut self) {
        self.logout_once();
    }

    fn logout_once(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        match self.conn.logout() {
            Ok(()) => debug!("Logged out of mailbox"),
            Err(e) => debug!("Logout failed (ignored): {}", e),
        }
    }
}

impl<C: MailConnection> Drop for SessionGuard<C> {
    fn drop(&mut self) {
        self.logout_once();
    }
}

/// Step of the scan a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStage {
    Fetch,
    Parse,
    Decode,
}

/// A message or part that was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanFailure {
    pub message_id: MessageId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part: Option<usize>,
    pub stage: ScanStage,
    pub reason: String,
}

/// Everything a scan produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub messages_matched: usize,
    pub messages_processed: usize,
    pub html_parts: usize,
    pub links_extracted: usize,
    pub grouping: Grouping,
    pub failures: Vec<ScanFailure>,
}

/// Drives a scan over one transport.
pub struct MailboxScanner<T: MailTransport> {
    transport: T,
}

impl<T: MailTransport> MailboxScanner<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn scan(&self, credentials: &Credentials) -> Result<ScanReport> {
        info!("Connecting to {}", self.transport.describe());
        let conn = self.transport.connect(credentials)?;
        let mut guard = SessionGuard::new(conn);

        let mut ids = guard.connection().search(UNSUBSCRIBE_QUERY)?;
        ids.sort_unstable();
        ids.dedup();
        info!("Found {} messages mentioning unsubscribe", ids.len());

        let mut report = ScanReport {
            messages_matched: ids.len(),
            ..ScanReport::default()
        };
        let mut grouper = ServiceGrouper::new();
        let total = ids.len();

        for (position, id) in ids.into_iter().enumerate() {
            debug!("Processing message {}/{} (id {})", position + 1, total, id);
            scan_message(guard.connection(), id, &mut grouper, &mut report);
        }

        guard.close();

        report.grouping = grouper.finish();
        if !report.failures.is_empty() {
            warn!("{} message(s) or part(s) were skipped", report.failures.len());
        }
        Ok(report)
    }
}

fn scan_message<C: MailConnection>(
    conn: &mut C,
    id: MessageId,
    grouper: &mut ServiceGrouper,
    report: &mut ScanReport,
) {
    let raw = match conn.fetch(id) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Skipping message {}: {}", id, e);
            report.failures.push(ScanFailure {
                message_id: id,
                part: None,
                stage: ScanStage::Fetch,
                reason: e.to_string(),
            });
            return;
        }
    };

    let decoded = match decode_html_parts(id, &raw) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("Skipping message {}: {}", id, e);
            report.failures.push(ScanFailure {
                message_id: id,
                part: None,
                stage: ScanStage::Parse,
                reason: e.to_string(),
            });
            return;
        }
    };
    report.messages_processed += 1;

    for failure in decoded.failures {
        let err = UnsubscriberError::part_decode(id, failure.index, failure.reason);
        warn!("Skipping part: {}", err);
        report.failures.push(ScanFailure {
            message_id: id,
            part: Some(failure.index),
            stage: ScanStage::Decode,
            reason: err.to_string(),
        });
    }

    for part in &decoded.html_parts {
        report.html_parts += 1;
        let links = extract_unsubscribe_links(&part.html);
        report.links_extracted += links.len();
        for link in &links {
            grouper.observe(link);
        }
    }
}
