//! End-to-end exports: read, format, then write to a spreadsheet or CSV files.

pub mod retry;
pub mod state;

use std::path::PathBuf;

use tracing::{info, warn};

use crate::cloud_adapters::{CsvSink, TabularStore};
use crate::core::format::RecordFormatter;
use crate::core::{Category, SplitMode};
use crate::source::{ExportConfig, HealthDataSource, SourceError};
use crate::sync::{SyncReport, SyncWriter};

pub use retry::RetryPolicy;
pub use state::{ExportKind, ExportLock, ExportState};

/// Errors that end an export.
#[derive(Debug)]
pub enum ExportError {
    /// Health data could not be read.
    Source(SourceError),
    /// Some categories failed; the report covers every category.
    Sheets(SyncReport),
    /// Some CSV files could not be produced.
    Csv(CsvReport),
}

impl ExportError {
    /// Whether rerunning the export may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExportError::Source(SourceError::Io(_)) => true,
            ExportError::Source(_) => false,
            ExportError::Sheets(report) => report.has_retryable_failures(),
            ExportError::Csv(_) => false,
        }
    }
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Source(e) => write!(f, "{e}"),
            ExportError::Sheets(report) => {
                let failed: Vec<String> = report
                    .failures()
                    .map(|(c, e)| format!("{c}: {e}"))
                    .collect();
                write!(f, "sheets export failed for {}", failed.join("; "))
            }
            ExportError::Csv(report) => {
                let failed: Vec<String> = report
                    .failures
                    .iter()
                    .map(|(c, e)| format!("{c}: {e}"))
                    .collect();
                write!(f, "CSV export failed for {}", failed.join("; "))
            }
        }
    }
}

impl std::error::Error for ExportError {}

impl From<SourceError> for ExportError {
    fn from(e: SourceError) -> Self {
        ExportError::Source(e)
    }
}

/// Files written by a CSV export and the categories that failed.
#[derive(Debug, Default)]
pub struct CsvReport {
    pub files: Vec<PathBuf>,
    pub failures: Vec<(Category, String)>,
}

/// Export the selected metrics into the writer's spreadsheet.
pub fn export_to_sheets<D, S>(
    source: &D,
    formatter: &RecordFormatter,
    writer: &mut SyncWriter<S>,
    config: &ExportConfig,
) -> Result<SyncReport, ExportError>
where
    D: HealthDataSource + ?Sized,
    S: TabularStore,
{
    let records = source.read_by_day(config)?;
    let formatted = formatter.format_selected(&records, &config.categories(), SplitMode::None);
    let report = writer.export(formatted);
    let totals = report.totals();
    info!(
        spreadsheet_id = writer.spreadsheet_id(),
        categories = report.categories.len(),
        appended = totals.appended,
        merged = totals.merged,
        "Sheets export finished"
    );
    if report.is_success() {
        Ok(report)
    } else {
        Err(ExportError::Sheets(report))
    }
}

/// Export the selected metrics as one CSV file per category and group.
///
/// Splitting only applies to all-time reads; windowed exports always
/// produce one file per category.
pub fn export_to_csv<D, K>(
    source: &D,
    formatter: &RecordFormatter,
    sink: &mut K,
    config: &ExportConfig,
    split: SplitMode,
) -> Result<CsvReport, ExportError>
where
    D: HealthDataSource + ?Sized,
    K: CsvSink + ?Sized,
{
    let records = source.read_by_day(config)?;
    let split = if config.days_back.is_none() {
        split
    } else {
        SplitMode::None
    };
    let mut report = CsvReport::default();
    for (category, result) in formatter.format_selected(&records, &config.categories(), split) {
        let formatted = match result {
            Ok(formatted) => formatted,
            Err(e) => {
                warn!(category = %category, error = %e, "Skipping category");
                report.failures.push((category, e.to_string()));
                continue;
            }
        };
        for group in &formatted.groups {
            let name = formatted.file_name(group);
            match sink.write_file(&name, &formatted.header, &group.rows) {
                Ok(path) => report.files.push(path),
                Err(e) => {
                    warn!(category = %category, file = %name, error = %e, "CSV write failed");
                    report.failures.push((category, e.to_string()));
                    break;
                }
            }
        }
    }
    info!(files = report.files.len(), "CSV export finished");
    if report.failures.is_empty() {
        Ok(report)
    } else {
        Err(ExportError::Csv(report))
    }
}
