//! Configuration management for unsubscriber.
//!
//! Values come from environment variables (optionally seeded from a `.env`
//! file by the binary) and may be overridden by command-line flags. The
//! mailbox address and app password are required; everything else has a
//! default.
//!
//! Recognized variables:
//!   - `EMAIL`, `PASSWORD` (required)
//!   - `IMAP_HOST`, `IMAP_PORT`, `IMAP_MAILBOX`
//!   - `UNSUBSCRIBER_TIMEOUT_SECS`, `UNSUBSCRIBER_DELAY_MS`
//!   - `UNSUBSCRIBER_OUTPUT_DIR`, `UNSUBSCRIBER_NO_VISIT`

use std::path::PathBuf;
use std::time::Duration;

use crate::mailbox::Credentials;

pub const EMAIL_VAR: &str = "EMAIL";
pub const PASSWORD_VAR: &str = "PASSWORD";

/// Where to generate an app password for the default (Gmail) server.
pub const APP_PASSWORD_URL: &str = "https://myaccount.google.com/apppasswords";

/// Main configuration structure for unsubscriber.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Mailbox account and server settings
    pub mailbox: MailboxConfig,

    /// Unsubscribe visit settings
    pub visit: VisitConfig,

    /// Report output settings
    pub output: OutputConfig,
}

/// Mailbox-related configuration options
#[derive(Clone)]
pub struct MailboxConfig {
    /// Mailbox address used as the IMAP login
    pub address: Option<String>,

    /// Application-specific password
    pub password: Option<String>,

    /// IMAP server host
    pub host: String,

    /// IMAP TLS port
    pub port: u16,

    /// Folder searched for unsubscribe messages
    pub folder: String,

    /// Socket read/write timeout for the IMAP session
    pub io_timeout: Duration,
}

/// Visit configuration
#[derive(Debug, Clone)]
pub struct VisitConfig {
    /// Whether representative links are visited at all
    pub enabled: bool,

    /// Per-request timeout
    pub timeout: Duration,

    /// Pause between consecutive visits
    pub delay: Duration,
}

/// Report output configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Directory receiving the link list and the service table
    pub directory: PathBuf,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            address: None,
            password: None,
            host: "imap.gmail.com".to_string(),
            port: 993,
            folder: "INBOX".to_string(),
            io_timeout: Duration::from_secs(30),
        }
    }
}

impl std::fmt::Debug for MailboxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailboxConfig")
            .field("address", &self.address)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("folder", &self.folder)
            .field("io_timeout", &self.io_timeout)
            .finish()
    }
}

impl Default for VisitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: Duration::from_secs(10),
            delay: Duration::from_secs(1),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup (environment, map, ...)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // Account
        config.mailbox.address = non_empty(EMAIL_VAR).map(|v| v.trim().to_string());
        config.mailbox.password = non_empty(PASSWORD_VAR);

        // Server
        if let Some(host) = non_empty("IMAP_HOST") {
            config.mailbox.host = host.trim().to_string();
        }
        if let Some(port) = non_empty("IMAP_PORT")
            && let Ok(p) = port.trim().parse::<u16>()
        {
            config.mailbox.port = p;
        }
        if let Some(folder) = non_empty("IMAP_MAILBOX") {
            config.mailbox.folder = folder;
        }

        // Visits
        if let Some(timeout) = non_empty("UNSUBSCRIBER_TIMEOUT_SECS")
            && let Ok(secs) = timeout.trim().parse::<u64>()
        {
            config.visit.timeout = Duration::from_secs(secs);
        }
        if let Some(delay) = non_empty("UNSUBSCRIBER_DELAY_MS")
            && let Ok(ms) = delay.trim().parse::<u64>()
        {
            config.visit.delay = Duration::from_millis(ms);
        }
        if let Some(no_visit) = non_empty("UNSUBSCRIBER_NO_VISIT") {
            config.visit.enabled = !is_truthy(&no_visit);
        }

        // Output
        if let Some(dir) = non_empty("UNSUBSCRIBER_OUTPUT_DIR") {
            config.output.directory = PathBuf::from(dir);
        }

        config
    }

    /// Merge with CLI arguments, giving CLI precedence
    pub fn merge_with_cli(&mut self, cli: &crate::cli::Cli) {
        if let Some(ref email) = cli.email {
            self.mailbox.address = Some(email.clone());
        }
        if let Some(ref password) = cli.password {
            self.mailbox.password = Some(password.clone());
        }
        if let Some(ref host) = cli.imap_host {
            self.mailbox.host = host.clone();
        }
        if let Some(port) = cli.imap_port {
            self.mailbox.port = port;
        }
        if let Some(ref folder) = cli.mailbox {
            self.mailbox.folder = folder.clone();
        }
        if let Some(secs) = cli.timeout {
            self.visit.timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = cli.delay_ms {
            self.visit.delay = Duration::from_millis(ms);
        }
        if cli.no_visit {
            self.visit.enabled = false;
        }
        if let Some(ref dir) = cli.output_dir {
            self.output.directory = dir.clone();
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mailbox.address.is_none() {
            return Err(ConfigError::MissingRequired {
                field: EMAIL_VAR.to_string(),
            });
        }

        if self.mailbox.password.is_none() {
            return Err(ConfigError::MissingRequired {
                field: PASSWORD_VAR.to_string(),
            });
        }

        if self.mailbox.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "IMAP_HOST".to_string(),
                value: String::new(),
                reason: "IMAP host must not be empty".to_string(),
            });
        }

        if self.mailbox.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "IMAP_PORT".to_string(),
                value: "0".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        if self.visit.timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "UNSUBSCRIBER_TIMEOUT_SECS".to_string(),
                value: "0".to_string(),
                reason: "Timeout must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Build the credentials handed to the mail transport.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        match (&self.mailbox.address, &self.mailbox.password) {
            (Some(address), Some(password)) => Ok(Credentials::new(address, password)),
            (None, _) => Err(ConfigError::MissingRequired {
                field: EMAIL_VAR.to_string(),
            }),
            (_, None) => Err(ConfigError::MissingRequired {
                field: PASSWORD_VAR.to_string(),
            }),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    let v = value.trim();
    v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("1") || v.eq_ignore_ascii_case("yes")
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
    /// Invalid configuration value
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Missing required configuration
    MissingRequired { field: String },
}

impl ConfigError {
    /// Operator guidance printed along with the error.
    pub fn guidance(&self) -> Vec<String> {
        match self {
            ConfigError::MissingRequired { .. } => vec![
                "Set the required values in the environment or a .env file:".to_string(),
                format!("  {EMAIL_VAR}=your.email@gmail.com"),
                format!("  {PASSWORD_VAR}=your-app-password"),
                "Gmail requires an app password, not your regular password.".to_string(),
                format!("Get an app password at: {APP_PASSWORD_URL}"),
            ],
            ConfigError::InvalidValue { .. } => vec![],
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue {
                field,
                value,
                reason,
            } => {
                write!(f, "Invalid value '{}' for '{}': {}", value, field, reason)
            }
            ConfigError::MissingRequired { field } => {
                write!(f, "{} is not set", field)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::env;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.mailbox.host, "imap.gmail.com");
        assert_eq!(config.mailbox.port, 993);
        assert_eq!(config.mailbox.folder, "INBOX");
        assert_eq!(config.visit.timeout, Duration::from_secs(10));
        assert_eq!(config.visit.delay, Duration::from_secs(1));
        assert!(config.visit.enabled);
    }

    #[test]
    fn test_missing_email_reported_first() {
        let config = Config::from_lookup(lookup_from(&[]));
        match config.validate() {
            Err(ConfigError::MissingRequired { field }) => assert_eq!(field, "EMAIL"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_missing_password() {
        let config = Config::from_lookup(lookup_from(&[("EMAIL", "me@example.com")]));
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "PASSWORD is not set");
        assert!(err.guidance().iter().any(|l| l.contains(APP_PASSWORD_URL)));
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let config = Config::from_lookup(lookup_from(&[("EMAIL", "  "), ("PASSWORD", "x")]));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired { .. })
        ));
    }

    #[test]
    fn test_lookup_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("EMAIL", "me@example.com"),
            ("PASSWORD", "app-pass"),
            ("IMAP_HOST", "imap.example.com"),
            ("IMAP_PORT", "1993"),
            ("UNSUBSCRIBER_TIMEOUT_SECS", "3"),
            ("UNSUBSCRIBER_DELAY_MS", "250"),
            ("UNSUBSCRIBER_NO_VISIT", "yes"),
            ("UNSUBSCRIBER_OUTPUT_DIR", "/tmp/reports"),
        ]));
        assert!(config.validate().is_ok());
        assert_eq!(config.mailbox.host, "imap.example.com");
        assert_eq!(config.mailbox.port, 1993);
        assert_eq!(config.visit.timeout, Duration::from_secs(3));
        assert_eq!(config.visit.delay, Duration::from_millis(250));
        assert!(!config.visit.enabled);
        assert_eq!(config.output.directory, PathBuf::from("/tmp/reports"));

        let creds = config.credentials().unwrap();
        assert_eq!(creds.address(), "me@example.com");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::from_lookup(lookup_from(&[
            ("EMAIL", "me@example.com"),
            ("PASSWORD", "app-pass"),
        ]));
        assert!(config.validate().is_ok());

        config.visit.timeout = Duration::from_secs(0);
        assert!(config.validate().is_err());

        config.visit.timeout = Duration::from_secs(10);
        config.mailbox.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = Config::from_lookup(lookup_from(&[("PASSWORD", "hunter2")]));
        let dbg = format!("{:?}", config);
        assert!(!dbg.contains("hunter2"));
    }

    #[test]
    #[serial]
    fn test_env_loading() {
        unsafe {
            env::set_var("EMAIL", "env@example.com");
            env::set_var("PASSWORD", "env-pass");
            env::set_var("IMAP_MAILBOX", "Newsletters");
        }

        let config = Config::from_env();
        assert_eq!(config.mailbox.address.as_deref(), Some("env@example.com"));
        assert_eq!(config.mailbox.folder, "Newsletters");

        // Clean up
        unsafe {
            env::remove_var("EMAIL");
            env::remove_var("PASSWORD");
            env::remove_var("IMAP_MAILBOX");
        }
    }
}
