//! Application orchestration layer.
//!
//! `App::run` is what the binary calls after argument parsing:
//!   1. Config load (environment) + CLI merge + validation
//!   2. Pipeline execution through the `Unsubscriber` façade
//!   3. Rendering: styled console summary, JSON or YAML
//!
//! Exit codes: 1 for missing or invalid configuration, 0 otherwise. A
//! mailbox that cannot be reached or logged into is reported as a diagnostic
//! and still exits 0.

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::errors::{Result, UnsubscriberError};
use crate::facade::{RunOptions, Unsubscriber};
use crate::mailbox::MailTransport;
use crate::styled_output::StyledFormatter;
use crate::summary::RunSummary;
use crate::visit::ReqwestProbe;

/// Application façade.
pub struct App;

impl App {
    /// Execute the end-to-end unsubscribe workflow.
    ///
    /// Returns: intended process exit code (0 = success, 1 = configuration error).
    pub async fn run(cli: &Cli) -> Result<i32> {
        let Some(config) = Self::load_config(cli) else {
            return Ok(1);
        };

        // validated above
        let credentials = config.credentials()?;
        let transport = Unsubscriber::transport_for(&config);
        let target = transport.describe();
        let opts = RunOptions::from_config(&config);
        let probe = ReqwestProbe::new().map_err(|e| {
            UnsubscriberError::internal_with("failed to build HTTP client", e)
        })?;

        if !cli.is_structured_output() && cli.error_enabled() {
            eprintln!(
                "Scanning {} as {} for unsubscribe links...",
                target,
                credentials.address()
            );
        }

        let summary = match Unsubscriber::run(transport, credentials, &probe, &opts).await {
            Ok(summary) => summary,
            Err(e) if e.is_fatal() => {
                if cli.error_enabled() {
                    eprintln!("Error: {e}");
                }
                RunSummary::mailbox_unavailable(target, &e)
            }
            Err(e) => return Err(e),
        };

        if cli.warn_enabled() && cli.is_structured_output() {
            for warning in &summary.warnings {
                eprintln!("Warning: {warning}");
            }
        }

        Self::render(cli, &summary)?;
        Ok(0)
    }

    /// Load, merge and validate configuration; print guidance on failure.
    fn load_config(cli: &Cli) -> Option<Config> {
        let mut config = Config::from_env();
        config.merge_with_cli(cli);
        if let Err(e) = config.validate() {
            if cli.error_enabled() {
                eprintln!("Configuration error: {e}");
                for line in e.guidance() {
                    eprintln!("{line}");
                }
            }
            return None;
        }
        if cli.is_trace() {
            eprintln!("Effective configuration: {config:?}");
        }
        Some(config)
    }

    fn render(cli: &Cli, summary: &RunSummary) -> Result<()> {
        let rendered = match cli.format {
            OutputFormat::Json => Some(summary.to_json()),
            OutputFormat::Yaml => Some(summary.to_yaml()),
            OutputFormat::Text => None,
        };

        match rendered {
            Some(Ok(doc)) => println!("{doc}"),
            Some(Err(e)) => {
                return Err(UnsubscriberError::internal(format!(
                    "failed to serialize summary: {e}"
                )));
            }
            None => StyledFormatter::for_cli(cli.no_color)
                .print_summary(summary)
                .map_err(|e| UnsubscriberError::io("<stdout>", "write", e))?,
        }
        Ok(())
    }
}
