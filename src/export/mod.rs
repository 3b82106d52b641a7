//! File exports: per-source CSV tables and the composite PDF report

pub mod csv;
pub mod pdf;
pub mod report;

pub use report::{Report, ReportBuilder, Section};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::pipeline::Snapshot;

/// Errors that can occur while writing exports
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    /// PDF rendering failed
    #[error("PDF error: {0}")]
    Pdf(String),
}

/// Replaces everything except ASCII alphanumerics, `-` and `_` with `_`
pub fn sanitize_topic(topic: &str) -> String {
    topic
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `<source>_<topic>.<ext>` with a filesystem-safe topic
pub fn file_name(source: &str, topic: &str, ext: &str) -> String {
    format!("{}_{}.{}", source, sanitize_topic(topic), ext)
}

/// What [`export_all`] managed to write
#[derive(Debug, Default)]
pub struct ExportOutcome {
    pub written: Vec<PathBuf>,
    /// One message per file that could not be written
    pub errors: Vec<String>,
}

impl ExportOutcome {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Writes every offered CSV and the PDF report into `dir`
///
/// A file that fails is recorded in the outcome and the rest are still
/// written. Only failing to create `dir` is an error.
pub fn export_all(
    dir: &Path,
    snapshot: &Snapshot,
    summary: Option<&str>,
) -> Result<ExportOutcome, ExportError> {
    fs::create_dir_all(dir)?;
    let mut outcome = ExportOutcome::default();

    for source in csv::csv_sources(snapshot) {
        let path = dir.join(file_name(source.slug(), &snapshot.topic, "csv"));
        match csv::write_source(&path, snapshot, source) {
            Ok(rows) => {
                info!(%source, path = %path.display(), rows, "csv exported");
                outcome.written.push(path);
            }
            Err(e) => {
                warn!(%source, path = %path.display(), error = %e, "csv export failed");
                outcome.errors.push(format!("{}: {}", source, e));
            }
        }
    }

    let report = ReportBuilder::from_snapshot(snapshot, summary).build();
    let path = dir.join(file_name("report", &snapshot.topic, "pdf"));
    match pdf::render(&report).and_then(|bytes| fs::write(&path, bytes).map_err(ExportError::from)) {
        Ok(()) => {
            info!(path = %path.display(), sections = report.sections.len(), "report exported");
            outcome.written.push(path);
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "report export failed");
            outcome.errors.push(format!("report: {}", e));
        }
    }

    Ok(outcome)
}
