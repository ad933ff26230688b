use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Output format for the final run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable console summary
    #[default]
    Text,
    /// Pretty-printed JSON document
    Json,
    /// YAML document
    Yaml,
}

/// Command-line interface definition.
/// Every option may also be supplied through the environment (or a `.env`
/// file); a flag given on the command line wins.
///
/// Verbosity levels:
/// 0 - silent (only final output)
/// 1 - errors and progress (default)
/// 2 - warnings + per-message detail
/// 5 - trace/debug
#[derive(Parser, Debug, Clone, Default)]
#[command(
    author,
    version,
    about = "Find unsubscribe links in an IMAP mailbox, group them by sending service and visit one link per service"
)]
pub struct Cli {
    /// Mailbox address used as the IMAP login (env: EMAIL)
    #[arg(long, value_name = "ADDRESS")]
    pub email: Option<String>,

    /// Application-specific password for the mailbox (env: PASSWORD)
    #[arg(long, value_name = "SECRET")]
    pub password: Option<String>,

    /// IMAP server host (env: IMAP_HOST) [default: imap.gmail.com]
    #[arg(long, value_name = "HOST")]
    pub imap_host: Option<String>,

    /// IMAP TLS port (env: IMAP_PORT) [default: 993]
    #[arg(long, value_name = "PORT")]
    pub imap_port: Option<u16>,

    /// Mailbox folder to search (env: IMAP_MAILBOX) [default: INBOX]
    #[arg(long, value_name = "FOLDER")]
    pub mailbox: Option<String>,

    /// Per-visit timeout in seconds (env: UNSUBSCRIBER_TIMEOUT_SECS) [default: 10]
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Pause between visits in milliseconds (env: UNSUBSCRIBER_DELAY_MS) [default: 1000]
    #[arg(long = "delay-ms", value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Directory receiving the report files (env: UNSUBSCRIBER_OUTPUT_DIR) [default: .]
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Collect and save links without visiting any of them (env: UNSUBSCRIBER_NO_VISIT)
    #[arg(long = "no-visit", default_value_t = false)]
    pub no_visit: bool,

    /// Output format for the final summary
    #[arg(long, value_enum, env = "UNSUBSCRIBER_FORMAT", default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Disable colored output (also honored: NO_COLOR)
    #[arg(long = "no-color", default_value_t = false)]
    pub no_color: bool,

    /// Verbosity level (0,1,2,5)
    #[arg(long, env = "UNSUBSCRIBER_VERBOSE", default_value_t = 1)]
    pub verbose: u8,
}

impl Cli {
    /// Parse CLI arguments from process args.
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Convenience: are we in very verbose/debug mode?
    pub fn is_trace(&self) -> bool {
        self.verbose >= 5
    }

    /// Are warning-level messages enabled?
    pub fn warn_enabled(&self) -> bool {
        self.verbose >= 2
    }

    /// Are error-level messages enabled?
    pub fn error_enabled(&self) -> bool {
        self.verbose >= 1
    }

    /// JSON or YAML requested; console decorations are suppressed.
    pub fn is_structured_output(&self) -> bool {
        matches!(self.format, OutputFormat::Json | OutputFormat::Yaml)
    }
}
