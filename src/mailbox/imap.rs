//! IMAP over implicit TLS (port 993 by default).

use std::net::TcpStream;
use std::time::Duration;

use native_tls::{TlsConnector, TlsStream};
use tracing::{debug, trace};

use super::{Credentials, MailConnection, MailTransport, MessageId};
use crate::errors::{Result, UnsubscriberError};

/// Server response text that marks an account needing an app password.
const APP_PASSWORD_MARKER: &str = "application-specific password required";

/// Opens TLS IMAP sessions against one server and folder.
#[derive(Debug, Clone)]
pub struct ImapTransport {
    host: String,
    port: u16,
    folder: String,
    timeout: Duration,
}

impl ImapTransport {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        folder: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            folder: folder.into(),
            timeout,
        }
    }

    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn open_client(&self) -> Result<::imap::Client<TlsStream<TcpStream>>> {
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .map_err(|e| UnsubscriberError::transport("connect", self.target(), e))?;
        let _ = stream.set_read_timeout(Some(self.timeout));
        let _ = stream.set_write_timeout(Some(self.timeout));

        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| UnsubscriberError::transport("tls setup", self.target(), e.to_string()))?;
        let tls_stream = tls
            .connect(&self.host, stream)
            .map_err(|e| UnsubscriberError::transport("tls handshake", self.target(), e.to_string()))?;

        let mut client = ::imap::Client::new(tls_stream);
        client
            .read_greeting()
            .map_err(|e| UnsubscriberError::transport("greeting", self.target(), e.to_string()))?;
        Ok(client)
    }
}

impl MailTransport for ImapTransport {
    type Connection = ImapConnection;

    fn connect(&self, credentials: &Credentials) -> Result<ImapConnection> {
        let client = self.open_client()?;
        trace!("Connected to {}, logging in", self.target());

        let mut session = client
            .login(credentials.address(), credentials.password())
            .map_err(|(e, _client)| login_error(credentials.address(), &e.to_string()))?;

        if let Err(e) = session.select(&self.folder) {
            let _ = session.logout();
            return Err(UnsubscriberError::transport(
                "select",
                format!("{}/{}", self.target(), self.folder),
                e.to_string(),
            ));
        }
        debug!("Selected folder {}", self.folder);

        Ok(ImapConnection {
            session,
            target: self.target(),
        })
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.target(), self.folder)
    }
}

/// Map a rejected LOGIN to an authentication error, flagging the
/// app-password case.
pub fn login_error(account: &str, reason: &str) -> UnsubscriberError {
    let app_password_required = reason.to_lowercase().contains(APP_PASSWORD_MARKER);
    UnsubscriberError::authentication(account, reason.trim(), app_password_required)
}

/// Logged-in session with the folder selected.
pub struct ImapConnection {
    session: ::imap::Session<TlsStream<TcpStream>>,
    target: String,
}

impl MailConnection for ImapConnection {
    fn search(&mut self, query: &str) -> Result<Vec<MessageId>> {
        let ids = self
            .session
            .search(query)
            .map_err(|e| UnsubscriberError::transport("search", &self.target, e.to_string()))?;
        Ok(ids.into_iter().collect())
    }

    fn fetch(&mut self, id: MessageId) -> Result<Vec<u8>> {
        let fetches = self
            .session
            .fetch(id.to_string(), "RFC822")
            .map_err(|e| UnsubscriberError::transport("fetch", id.to_string(), e.to_string()))?;
        fetches
            .iter()
            .find_map(|f| f.body())
            .map(<[u8]>::to_vec)
            .ok_or_else(|| {
                UnsubscriberError::transport("fetch", id.to_string(), "server returned no body")
            })
    }

    fn logout(&mut self) -> Result<()> {
        self.session
            .logout()
            .map_err(|e| UnsubscriberError::transport("logout", &self.target, e.to_string()))
    }
}
