//! Styled console output for unsubscriber using anstyle.
//!
//! Renders a [`RunSummary`] for humans: scan counters, one block per service
//! with its visit outcome, the report files and anything that was skipped.

use anstyle::{AnsiColor, Color, Style};
use std::fmt::Write;
use std::io::{self, IsTerminal, Write as IoWrite};

use crate::config::APP_PASSWORD_URL;
use crate::report::{ArtifactStatus, SaveOutcome};
use crate::services::ServiceEntry;
use crate::summary::{RunOutcome, RunSummary};
use crate::visit::{VisitOutcome, VisitRecord};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Style definitions for different UI elements
pub struct Styles {
    pub header: Style,
    pub subheader: Style,
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    pub info: Style,
    pub muted: Style,
    pub bold: Style,
    pub url: Style,
    pub company: Style,
}

impl Default for Styles {
    fn default() -> Self {
        Self {
            header: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Blue))),
            subheader: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
            success: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
            warning: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
            error: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
            info: Style::new().fg_color(Some(Color::Ansi(AnsiColor::Blue))),
            muted: Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))),
            bold: Style::new().bold(),
            url: Style::new()
                .fg_color(Some(Color::Ansi(AnsiColor::Blue)))
                .underline(),
            company: Style::new()
                .italic()
                .fg_color(Some(Color::Ansi(AnsiColor::BrightBlue))),
        }
    }
}

/// Styled output formatter for run summaries
pub struct StyledFormatter {
    styles: Styles,
    use_colors: bool,
}

impl StyledFormatter {
    /// Create a new styled formatter
    pub fn new() -> Self {
        Self {
            styles: Styles::default(),
            use_colors: Self::should_use_colors(),
        }
    }

    /// Create a formatter without colors (for non-interactive use)
    pub fn without_colors() -> Self {
        Self {
            styles: Styles::default(),
            use_colors: false,
        }
    }

    /// Colors unless disabled by flag, `NO_COLOR` or a non-terminal stdout
    pub fn for_cli(no_color: bool) -> Self {
        if no_color {
            Self::without_colors()
        } else {
            Self::new()
        }
    }

    /// Determine if colors should be used based on environment
    pub fn should_use_colors() -> bool {
        io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
    }

    /// Apply style to text if colors are enabled
    fn styled(&self, text: &str, style: &Style) -> String {
        if self.use_colors {
            format!("{}{}{}", style.render(), text, style.render_reset())
        } else {
            text.to_string()
        }
    }

    /// Format a complete run summary
    pub fn format_summary(&self, summary: &RunSummary) -> Result<String, std::fmt::Error> {
        let mut output = String::new();

        self.write_header(&mut output, summary)?;

        match &summary.outcome {
            RunOutcome::MailboxUnavailable {
                reason,
                app_password_required,
                ..
            } => {
                self.write_mailbox_unavailable(&mut output, reason, *app_password_required)?;
            }
            RunOutcome::NothingFound => {
                writeln!(output)?;
                writeln!(
                    output,
                    "  {} {}",
                    self.styled("⚠️", &self.styles.warning),
                    self.styled("No unsubscribe links found", &self.styles.warning)
                )?;
            }
            RunOutcome::Completed => {
                self.write_services(&mut output, summary)?;
                if let Some(ref artifacts) = summary.artifacts {
                    self.write_artifacts(&mut output, artifacts)?;
                }
            }
        }

        self.write_footer(&mut output, summary)?;
        Ok(output)
    }

    /// Write the main header with mailbox and scan counters
    fn write_header(&self, output: &mut String, summary: &RunSummary) -> Result<(), std::fmt::Error> {
        writeln!(output)?;
        writeln!(output, "{}", self.styled(RULE, &self.styles.muted))?;
        writeln!(
            output,
            "  {}",
            self.styled("📭 Unsubscribe Report", &self.styles.header)
        )?;
        writeln!(
            output,
            "  {} Mailbox: {}",
            self.styled("📧", &self.styles.info),
            self.styled(&summary.metadata.mailbox, &self.styles.bold)
        )?;

        if !matches!(summary.outcome, RunOutcome::MailboxUnavailable { .. }) {
            let scan = &summary.scan;
            writeln!(
                output,
                "  {} Messages: {} matched, {} processed",
                self.styled("🔎", &self.styles.info),
                scan.messages_matched,
                scan.messages_processed
            )?;
            writeln!(
                output,
                "  {} Links: {} extracted, {} distinct, {} services",
                self.styled("🔗", &self.styles.info),
                scan.links_extracted,
                scan.distinct_links,
                summary.totals.services_found
            )?;
        }

        writeln!(output, "{}", self.styled(RULE, &self.styles.muted))?;
        Ok(())
    }

    fn write_mailbox_unavailable(
        &self,
        output: &mut String,
        reason: &str,
        app_password_required: bool,
    ) -> Result<(), std::fmt::Error> {
        writeln!(output)?;
        writeln!(
            output,
            "  {} {}",
            self.styled("❌", &self.styles.error),
            self.styled("Could not read the mailbox", &self.styles.error)
        )?;
        writeln!(
            output,
            "     {} {}",
            self.styled("└─", &self.styles.muted),
            reason
        )?;
        if app_password_required {
            writeln!(output)?;
            writeln!(
                output,
                "  {} Use an app password instead of your regular password:",
                self.styled("💡", &self.styles.info)
            )?;
            writeln!(
                output,
                "     {}",
                self.styled(APP_PASSWORD_URL, &self.styles.url)
            )?;
        }
        Ok(())
    }

    /// Write one block per service with its visit outcome
    fn write_services(&self, output: &mut String, summary: &RunSummary) -> Result<(), std::fmt::Error> {
        writeln!(output)?;
        writeln!(
            output,
            "  {}",
            self.styled("📮 Services", &self.styles.subheader)
        )?;
        writeln!(output)?;

        let visits = summary.visits.as_deref().unwrap_or(&[]);
        for (i, entry) in summary.services.iter().enumerate() {
            let visit = visits.iter().find(|v| v.domain == entry.domain);
            self.write_service(output, i + 1, entry, visit)?;
            if i + 1 < summary.services.len() {
                writeln!(output)?;
            }
        }
        Ok(())
    }

    fn write_service(
        &self,
        output: &mut String,
        number: usize,
        entry: &ServiceEntry,
        visit: Option<&VisitRecord>,
    ) -> Result<(), std::fmt::Error> {
        writeln!(
            output,
            "    {} {} {}",
            self.styled(&format!("{}.", number), &self.styles.muted),
            self.styled(&entry.display_name, &self.styles.company),
            self.styled(&format!("({})", entry.domain), &self.styles.muted)
        )?;
        writeln!(
            output,
            "       {} Link: {}",
            self.styled("├─", &self.styles.muted),
            self.styled(&entry.representative_url, &self.styles.url)
        )?;

        let branch = if visit.is_some() { "├─" } else { "└─" };
        writeln!(
            output,
            "       {} Seen in {} link(s)",
            self.styled(branch, &self.styles.muted),
            entry.occurrence_count
        )?;

        if let Some(record) = visit {
            writeln!(
                output,
                "       {} Visit: {}",
                self.styled("└─", &self.styles.muted),
                self.format_outcome(&record.outcome)
            )?;
        }
        Ok(())
    }

    /// Short styled description of a visit outcome
    pub fn format_outcome(&self, outcome: &VisitOutcome) -> String {
        match outcome {
            VisitOutcome::Success => self.styled("✓ unsubscribed", &self.styles.success),
            other => self.styled(&format!("✗ {}", other), &self.styles.warning),
        }
    }

    fn write_artifacts(&self, output: &mut String, artifacts: &SaveOutcome) -> Result<(), std::fmt::Error> {
        let list = artifacts.artifacts();
        if list.is_empty() {
            return Ok(());
        }
        writeln!(output)?;
        writeln!(
            output,
            "  {}",
            self.styled("💾 Reports", &self.styles.subheader)
        )?;
        for artifact in list {
            match artifact {
                ArtifactStatus::Written { path, rows } => writeln!(
                    output,
                    "    {} {} ({} rows)",
                    self.styled("✓", &self.styles.success),
                    path.display(),
                    rows
                )?,
                ArtifactStatus::Failed { path, reason } => writeln!(
                    output,
                    "    {} {}: {}",
                    self.styled("✗", &self.styles.error),
                    path.display(),
                    reason
                )?,
            }
        }
        Ok(())
    }

    /// Write the footer with totals and skipped items
    fn write_footer(&self, output: &mut String, summary: &RunSummary) -> Result<(), std::fmt::Error> {
        writeln!(output)?;
        writeln!(output, "{}", self.styled(RULE, &self.styles.muted))?;

        // printed for every outcome, zeros included
        let totals = &summary.totals;
        let mut line = format!(
            "{} service(s) found. Visited {} link(s): {} succeeded, {} failed",
            totals.services_found, totals.links_visited, totals.successes, totals.failures
        );
        if summary.visits.is_none() && totals.services_found > 0 {
            line.push_str(" (visiting disabled)");
        }
        let style = if totals.failures == 0 && totals.services_found > 0 {
            &self.styles.success
        } else {
            &self.styles.warning
        };
        writeln!(output, "  {}", self.styled(&line, style))?;

        for failure in &summary.scan_failures {
            let location = match failure.part {
                Some(part) => format!("message {} part {}", failure.message_id, part),
                None => format!("message {}", failure.message_id),
            };
            writeln!(
                output,
                "  {} Skipped {}: {}",
                self.styled("•", &self.styles.muted),
                location,
                self.styled(&failure.reason, &self.styles.muted)
            )?;
        }
        for failure in &summary.grouping_failures {
            writeln!(
                output,
                "  {} No domain for {}: {}",
                self.styled("•", &self.styles.muted),
                failure.link,
                self.styled(&failure.reason, &self.styles.muted)
            )?;
        }
        for warning in &summary.warnings {
            writeln!(
                output,
                "  {} {}",
                self.styled("⚠️", &self.styles.warning),
                warning
            )?;
        }
        Ok(())
    }

    /// Print a formatted summary to stdout
    pub fn print_summary(&self, summary: &RunSummary) -> io::Result<()> {
        let formatted = self
            .format_summary(summary)
            .map_err(|e| io::Error::other(format!("{}", e)))?;
        print!("{}", formatted);
        io::stdout().flush()?;
        Ok(())
    }
}

impl Default for StyledFormatter {
    fn default() -> Self {
        Self::new()
    }
}
