//! Unified error handling.
//!
//! A `thiserror`-based model with:
//!   * Typed variants for each failure domain of a run
//!   * A categorization layer (`ErrorCategory`) used by the summary output
//!   * Helper constructors
//!   * `From` conversions for common lower-level errors
//!
//! Only configuration, authentication and mailbox connection failures end a
//! run. Everything else (a single message, a single part, a single link, a
//! single report file) is caught where it happens and recorded as an outcome.
//!
//! Usage:
//!   use unsubscriber::errors::{Result, UnsubscriberError};
//!
//!   fn do_something() -> Result<()> {
//!       Err(UnsubscriberError::Configuration { message: "EMAIL is not set".into() })
//!   }
//!
//! NOTE: Variants that wrap external errors retain sources to preserve backtraces
//!       (when RUST_BACKTRACE=1).

use std::io;

use thiserror::Error;

/// High-level classification for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Auth,
    Transport,
    Parse,
    Io,
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCategory::Config => "config",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Transport => "transport",
            ErrorCategory::Parse => "parse",
            ErrorCategory::Io => "io",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Primary application error type.
#[derive(Error, Debug)]
pub enum UnsubscriberError {
    // ----------------------------- Configuration ----------------------------
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // ---------------------------- Authentication ----------------------------
    #[error("{}", auth_message(.account, .reason, .app_password_required))]
    Authentication {
        account: String,
        reason: String,
        app_password_required: bool,
    },

    // ------------------------------ Transport -------------------------------
    #[error("Mailbox {operation} failed for '{target}': {source}")]
    MailTransport {
        operation: String,
        target: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // ---------------------------- Parsing -----------------------------------
    #[error("Failed to parse message {message_id}: {reason}")]
    MessageParse { message_id: u32, reason: String },

    #[error("Failed to decode part {part} of message {message_id}: {reason}")]
    PartDecode {
        message_id: u32,
        part: usize,
        reason: String,
    },

    // ----------------------------- I/O / FS ---------------------------------
    #[error("I/O error during {operation} on {path}: {source}")]
    Io {
        path: String,
        operation: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write table {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    // ---------------------------- Internal ----------------------------------
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

fn auth_message(account: &str, reason: &str, app_password_required: &bool) -> String {
    if *app_password_required {
        format!("Mailbox for {account} requires an application-specific password: {reason}")
    } else {
        format!("Authentication failed for {account}: {reason}")
    }
}

impl UnsubscriberError {
    /// Categorize the error for structured output.
    pub fn category(&self) -> ErrorCategory {
        use UnsubscriberError::*;
        match self {
            Configuration { .. } => ErrorCategory::Config,
            Authentication { .. } => ErrorCategory::Auth,
            MailTransport { .. } => ErrorCategory::Transport,
            MessageParse { .. } | PartDecode { .. } => ErrorCategory::Parse,
            Io { .. } | Csv { .. } => ErrorCategory::Io,
            Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Whether this error ends the run rather than a single unit of work.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Config | ErrorCategory::Auth | ErrorCategory::Transport
        )
    }

    // ---------------------------- Constructors -----------------------------

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn authentication(
        account: impl Into<String>,
        reason: impl Into<String>,
        app_password_required: bool,
    ) -> Self {
        Self::Authentication {
            account: account.into(),
            reason: reason.into(),
            app_password_required,
        }
    }

    pub fn transport(
        operation: impl Into<String>,
        target: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::MailTransport {
            operation: operation.into(),
            target: target.into(),
            source: source.into(),
        }
    }

    pub fn message_parse(message_id: u32, reason: impl Into<String>) -> Self {
        Self::MessageParse {
            message_id,
            reason: reason.into(),
        }
    }

    pub fn part_decode(message_id: u32, part: usize, reason: impl Into<String>) -> Self {
        Self::PartDecode {
            message_id,
            part,
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<String>, operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<String>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal_with(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Public result alias.
pub type Result<T> = std::result::Result<T, UnsubscriberError>;

/// Map standard IO errors into `Io` variant (generic context).
impl From<io::Error> for UnsubscriberError {
    fn from(e: io::Error) -> Self {
        UnsubscriberError::Io {
            path: "<unknown>".into(),
            operation: "unspecified".into(),
            source: e,
        }
    }
}

impl From<crate::config::ConfigError> for UnsubscriberError {
    fn from(e: crate::config::ConfigError) -> Self {
        UnsubscriberError::Configuration {
            message: e.to_string(),
        }
    }
}

/// Extension trait for enriching IO results with path + operation context.
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<String>, operation: impl Into<String>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::result::Result<T, io::Error> {
    fn with_path(self, path: impl Into<String>, operation: impl Into<String>) -> Result<T> {
        self.map_err(|e| UnsubscriberError::io(path.into(), operation.into(), e))
    }
}
