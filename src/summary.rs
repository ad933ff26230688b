//! Run summary for JSON and YAML output.
//!
//! A [`RunSummary`] captures everything a run produced: scan statistics, the
//! grouped services, visit outcomes, report artifacts and every per-unit
//! failure. The console formatter in `styled_output` renders the same
//! structure for humans.

use anyhow::Result;
use serde::Serialize;

use crate::errors::UnsubscriberError;
use crate::mailbox::{ScanFailure, ScanReport};
use crate::report::SaveOutcome;
use crate::services::{GroupingFailure, ServiceEntry};
use crate::visit::{VisitRecord, VisitReport};

/// Root structure for structured output
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RunSummary {
    /// Tool version and metadata
    pub metadata: SummaryMetadata,

    /// How the run ended
    pub outcome: RunOutcome,

    /// Counters from the mailbox scan
    pub scan: ScanStatistics,

    /// One entry per sending service, ordered by domain
    pub services: Vec<ServiceEntry>,

    /// Visit outcomes; absent when visiting was disabled or never reached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visits: Option<Vec<VisitRecord>>,

    /// Report files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<SaveOutcome>,

    /// Messages or parts that were skipped
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scan_failures: Vec<ScanFailure>,

    /// Links whose domain could not be determined
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub grouping_failures: Vec<GroupingFailure>,

    pub totals: Totals,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SummaryMetadata {
    pub tool_name: String,
    pub version: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    /// host:port/folder that was scanned
    pub mailbox: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Links were found and processed
    Completed,
    /// The scan succeeded but produced no services
    NothingFound,
    /// Connecting, logging in or searching failed
    MailboxUnavailable {
        category: String,
        reason: String,
        app_password_required: bool,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStatistics {
    pub messages_matched: usize,
    pub messages_processed: usize,
    pub html_parts: usize,
    pub links_extracted: usize,
    pub distinct_links: usize,
    pub duplicate_links: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub services_found: usize,
    pub links_visited: usize,
    pub successes: usize,
    pub failures: usize,
}

impl RunSummary {
    /// Empty summary for the given mailbox target
    pub fn new(mailbox: impl Into<String>) -> Self {
        Self {
            metadata: SummaryMetadata {
                tool_name: "unsubscriber".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                generated_at: chrono::Utc::now(),
                mailbox: mailbox.into(),
            },
            outcome: RunOutcome::NothingFound,
            scan: ScanStatistics::default(),
            services: Vec::new(),
            visits: None,
            artifacts: None,
            scan_failures: Vec::new(),
            grouping_failures: Vec::new(),
            totals: Totals::default(),
            warnings: Vec::new(),
        }
    }

    /// Summary of a run that completed the scan.
    pub fn from_run(
        mailbox: impl Into<String>,
        scan: ScanReport,
        visits: Option<VisitReport>,
        artifacts: SaveOutcome,
    ) -> Self {
        let mut summary = Self::new(mailbox);
        let grouping = scan.grouping;

        summary.scan = ScanStatistics {
            messages_matched: scan.messages_matched,
            messages_processed: scan.messages_processed,
            html_parts: scan.html_parts,
            links_extracted: scan.links_extracted,
            distinct_links: grouping.distinct_links,
            duplicate_links: grouping.duplicate_links,
        };
        summary.services = grouping.services.entries().cloned().collect();
        summary.scan_failures = scan.failures;
        summary.grouping_failures = grouping.failures;
        summary.outcome = if summary.services.is_empty() {
            RunOutcome::NothingFound
        } else {
            RunOutcome::Completed
        };

        summary.totals.services_found = summary.services.len();
        match visits {
            Some(report) => {
                summary.totals.links_visited = report.records.len();
                summary.totals.successes = report.success_count();
                summary.totals.failures = report.failure_count();
                summary.visits = Some(report.records);
            }
            None if !summary.services.is_empty() => {
                summary
                    .warnings
                    .push("Visiting was disabled; links were saved but not opened".to_string());
            }
            None => {}
        }

        for artifact in artifacts.artifacts() {
            if !artifact.is_written() {
                summary.warnings.push(format!(
                    "Report file {} could not be written",
                    artifact.path().display()
                ));
            }
        }
        if !summary.scan_failures.is_empty() {
            summary.warnings.push(format!(
                "{} message(s) or part(s) were skipped",
                summary.scan_failures.len()
            ));
        }
        summary.artifacts = Some(artifacts);
        summary
    }

    /// Summary of a run that could not use the mailbox.
    pub fn mailbox_unavailable(mailbox: impl Into<String>, error: &UnsubscriberError) -> Self {
        let mut summary = Self::new(mailbox);
        let app_password_required = matches!(
            error,
            UnsubscriberError::Authentication {
                app_password_required: true,
                ..
            }
        );
        summary.outcome = RunOutcome::MailboxUnavailable {
            category: error.category().to_string(),
            reason: error.to_string(),
            app_password_required,
        };
        summary
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
