//! Report artifacts written after grouping.
//!
//! - `unsubscribe_links.txt`: one representative URL per line, no trailing
//!   newline.
//! - `unsubscribe_services.csv`: `;`-delimited, UTF-8 with a byte order mark
//!   so spreadsheet tools keep non-ASCII company names intact.
//!
//! The two files are written independently; a failure on one is logged and
//! reported without preventing the other.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::errors::{IoResultExt, Result, UnsubscriberError};
use crate::services::{ServiceEntry, ServiceMap};

pub const LINKS_FILE: &str = "unsubscribe_links.txt";
pub const SERVICES_FILE: &str = "unsubscribe_services.csv";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const DELIMITER: u8 = b';';

/// One row of the services table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRow {
    pub company: String,
    pub domain: String,
    pub url: String,
    pub emails_found: usize,
}

impl From<&ServiceEntry> for ServiceRow {
    fn from(entry: &ServiceEntry) -> Self {
        Self {
            company: entry.display_name.clone(),
            domain: entry.domain.clone(),
            url: entry.representative_url.clone(),
            emails_found: entry.occurrence_count,
        }
    }
}

/// Result of writing one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactStatus {
    Written { path: PathBuf, rows: usize },
    Failed { path: PathBuf, reason: String },
}

impl ArtifactStatus {
    pub fn is_written(&self) -> bool {
        matches!(self, ArtifactStatus::Written { .. })
    }

    pub fn path(&self) -> &Path {
        match self {
            ArtifactStatus::Written { path, .. } | ArtifactStatus::Failed { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SaveOutcome {
    NothingToSave,
    Saved {
        links: ArtifactStatus,
        services: ArtifactStatus,
    },
}

impl SaveOutcome {
    pub fn artifacts(&self) -> Vec<&ArtifactStatus> {
        match self {
            SaveOutcome::NothingToSave => Vec::new(),
            SaveOutcome::Saved { links, services } => vec![links, services],
        }
    }
}

/// Writes the link list and the services table into one directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn links_path(&self) -> PathBuf {
        self.dir.join(LINKS_FILE)
    }

    pub fn services_path(&self) -> PathBuf {
        self.dir.join(SERVICES_FILE)
    }

    pub fn save(&self, services: &ServiceMap) -> SaveOutcome {
        if services.is_empty() {
            info!("No unsubscribe links found, nothing to save");
            return SaveOutcome::NothingToSave;
        }

        let links: Vec<&str> = services
            .entries()
            .map(|e| e.representative_url.as_str())
            .collect();
        let rows: Vec<ServiceRow> = services.entries().map(ServiceRow::from).collect();

        let links_path = self.links_path();
        let links = status_for(links_path.clone(), write_lines(&links_path, &links));

        let services_path = self.services_path();
        let services = status_for(services_path.clone(), write_table(&services_path, &rows));

        SaveOutcome::Saved { links, services }
    }
}

fn status_for(path: PathBuf, result: Result<usize>) -> ArtifactStatus {
    match result {
        Ok(rows) => {
            info!("Saved {} row(s) to {}", rows, path.display());
            ArtifactStatus::Written { path, rows }
        }
        Err(e) => {
            error!("Could not write {}: {}", path.display(), e);
            ArtifactStatus::Failed {
                path,
                reason: e.to_string(),
            }
        }
    }
}

/// Write `lines` joined by `\n`, without a trailing newline.
pub fn write_lines(path: &Path, lines: &[&str]) -> Result<usize> {
    let display = path.display().to_string();
    fs::write(path, lines.join("\n")).with_path(&display, "write")?;
    Ok(lines.len())
}

/// Write the services table with BOM, header and `;` delimiter.
pub fn write_table(path: &Path, rows: &[ServiceRow]) -> Result<usize> {
    let display = path.display().to_string();
    let file = File::create(path).with_path(&display, "create")?;
    let mut out = BufWriter::new(file);
    out.write_all(UTF8_BOM).with_path(&display, "write")?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_writer(out);
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| UnsubscriberError::csv(&display, e))?;
    }
    writer.flush().with_path(&display, "flush")?;
    Ok(rows.len())
}

/// Read a services table written by [`write_table`].
pub fn read_table(path: &Path) -> Result<Vec<ServiceRow>> {
    let display = path.display().to_string();
    let bytes = fs::read(path).with_path(&display, "read")?;
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .from_reader(body);
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<ServiceRow>, _>>()
        .map_err(|e| UnsubscriberError::csv(&display, e))
}
