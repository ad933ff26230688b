//! High-level façade providing the library entry point.
//!
//! Runs scan, grouping, visiting and report writing strictly in order and
//! returns a [`RunSummary`]. Nothing is printed here; diagnostics go through
//! `tracing` and rendering is left to the caller.
//!
//! The mailbox session is blocking and runs on tokio's blocking pool. Visits
//! are awaited one at a time on the calling task.

use std::path::PathBuf;

use tracing::info;

use crate::config::Config;
use crate::errors::{Result, UnsubscriberError};
use crate::mailbox::{Credentials, ImapTransport, MailTransport, MailboxScanner};
use crate::report::ReportWriter;
use crate::summary::RunSummary;
use crate::visit::{HttpProbe, VisitOptions, Visitor};

/// Library entry point for a complete run.
pub struct Unsubscriber;

impl Unsubscriber {
    /// Run the whole pipeline against an arbitrary transport and probe.
    ///
    /// Only mailbox-level failures (connect, login, select, search) are
    /// returned as errors; everything after the scan is recorded in the
    /// summary.
    pub async fn run<T, P>(
        transport: T,
        credentials: Credentials,
        probe: &P,
        opts: &RunOptions,
    ) -> Result<RunSummary>
    where
        T: MailTransport + Send + 'static,
        P: HttpProbe + ?Sized,
    {
        let target = transport.describe();

        let scan = tokio::task::spawn_blocking(move || {
            MailboxScanner::new(transport).scan(&credentials)
        })
        .await
        .map_err(|e| UnsubscriberError::internal_with("mailbox scan task failed", e))??;

        let services = &scan.grouping.services;

        let visits = match opts.visit {
            Some(visit_opts) if !services.is_empty() => {
                Some(Visitor::new(probe, visit_opts).visit_all(services).await)
            }
            Some(_) => None,
            None => {
                info!("Visiting disabled, saving links only");
                None
            }
        };

        let artifacts = ReportWriter::new(&opts.output_dir).save(services);

        Ok(RunSummary::from_run(target, scan, visits, artifacts))
    }

    /// Build the IMAP transport described by a configuration.
    pub fn transport_for(config: &Config) -> ImapTransport {
        ImapTransport::new(
            config.mailbox.host.clone(),
            config.mailbox.port,
            config.mailbox.folder.clone(),
            config.mailbox.io_timeout,
        )
    }
}

/// Options for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// `None` skips visiting entirely.
    pub visit: Option<VisitOptions>,
    /// Directory receiving the report files.
    pub output_dir: PathBuf,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            visit: Some(VisitOptions::default()),
            output_dir: PathBuf::from("."),
        }
    }
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        let visit = config.visit.enabled.then_some(VisitOptions {
            timeout: config.visit.timeout,
            delay: config.visit.delay,
        });
        Self {
            visit,
            output_dir: config.output.directory.clone(),
        }
    }

    /// Collect and save only.
    pub fn without_visits(mut self) -> Self {
        self.visit = None;
        self
    }
}
