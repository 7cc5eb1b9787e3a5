//! Writes formatted rows into a [`TabularStore`] without duplicating
//! logical records.
//!
//! Each category is synced independently: the sheet header is read (or
//! written on first use), the keys already present are looked up in one
//! request, new rows are appended in one batch and, for Vitals, rows whose
//! key already exists are merged field by field.

pub mod dedup;
pub mod merge;

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::cloud_adapters::range::{HEADER_ROW, column_span, row_span};
use crate::cloud_adapters::{SpreadsheetError, TabularStore};
use crate::core::format::{CategoryResult, FormattedCategory, Header, Row};
use crate::core::{Category, RecordError};

use dedup::{KeyStrategy, WritePolicy, existing_keys};
use merge::merge_row;

/// Errors that abort the sync of one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The store rejected a request.
    Store(SpreadsheetError),
    /// The category's input could not be formatted.
    Record(RecordError),
    /// The sheet's header lacks columns needed to key or place rows.
    HeaderMismatch { sheet: String, missing: Vec<String> },
}

impl SyncError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Store(e) if e.is_retryable())
    }
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::Store(e) => write!(f, "{e}"),
            SyncError::Record(e) => write!(f, "{e}"),
            SyncError::HeaderMismatch { sheet, missing } => write!(
                f,
                "sheet '{sheet}' header is missing column(s): {}",
                missing.join(", ")
            ),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<SpreadsheetError> for SyncError {
    fn from(e: SpreadsheetError) -> Self {
        SyncError::Store(e)
    }
}

impl From<RecordError> for SyncError {
    fn from(e: RecordError) -> Self {
        SyncError::Record(e)
    }
}

/// Row counts for one synced sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetOutcome {
    pub sheet: String,
    /// The header row was written because the sheet had none.
    pub header_written: bool,
    pub appended: usize,
    pub merged: usize,
    /// Existing rows whose merge produced no change.
    pub unchanged: usize,
    /// Rows dropped because their key already existed or repeated in this run.
    pub skipped: usize,
}

impl SheetOutcome {
    fn new(sheet: &str) -> Self {
        Self {
            sheet: sheet.to_string(),
            ..Self::default()
        }
    }

    /// Number of candidate rows considered.
    pub fn total(&self) -> usize {
        self.appended + self.merged + self.unchanged + self.skipped
    }
}

/// Result of syncing a set of categories.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub categories: Vec<(Category, Result<SheetOutcome, SyncError>)>,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, category: Category, result: Result<SheetOutcome, SyncError>) {
        self.categories.push((category, result));
    }

    pub fn outcome(&self, category: Category) -> Option<&Result<SheetOutcome, SyncError>> {
        self.categories
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, r)| r)
    }

    pub fn failures(&self) -> impl Iterator<Item = (Category, &SyncError)> {
        self.categories
            .iter()
            .filter_map(|(c, r)| r.as_ref().err().map(|e| (*c, e)))
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Whether a rerun could fix at least one failed category.
    pub fn has_retryable_failures(&self) -> bool {
        self.failures().any(|(_, e)| e.is_retryable())
    }

    /// Counts summed over every successful category.
    pub fn totals(&self) -> SheetOutcome {
        let mut totals = SheetOutcome::default();
        for outcome in self.categories.iter().filter_map(|(_, r)| r.as_ref().ok()) {
            totals.header_written |= outcome.header_written;
            totals.appended += outcome.appended;
            totals.merged += outcome.merged;
            totals.unchanged += outcome.unchanged;
            totals.skipped += outcome.skipped;
        }
        totals
    }
}

/// Column names of `header` that hold a value in at least one row.
fn written_columns<'a>(header: &'a Header, rows: &[Row]) -> impl Iterator<Item = &'a String> {
    let used: Vec<bool> = (0..header.len())
        .map(|i| rows.iter().any(|r| r.get(i).is_some_and(|c| !c.is_empty())))
        .collect();
    header
        .columns()
        .iter()
        .zip(used)
        .filter_map(|(name, used)| used.then_some(name))
}

/// Reorder `row`, aligned with `from`, into the column order of `to`.
fn project(row: &[String], from: &Header, to: &Header) -> Row {
    to.columns()
        .iter()
        .map(|name| {
            from.position(name)
                .and_then(|i| row.get(i))
                .cloned()
                .unwrap_or_default()
        })
        .collect()
}

/// Deduplicating writer bound to one spreadsheet.
pub struct SyncWriter<S> {
    store: S,
    spreadsheet_id: String,
}

impl<S: TabularStore> SyncWriter<S> {
    pub fn new(store: S, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            store,
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Create every sheet in `names` that does not exist yet, in one request.
    ///
    /// Returns the titles that were created.
    pub fn ensure_sheets(&mut self, names: &[String]) -> Result<Vec<String>, SpreadsheetError> {
        let existing: HashSet<String> = self
            .store
            .list_sheets(&self.spreadsheet_id)?
            .into_iter()
            .collect();
        let mut missing: Vec<String> = Vec::new();
        for name in names {
            if !existing.contains(name) && !missing.contains(name) {
                missing.push(name.clone());
            }
        }
        if !missing.is_empty() {
            info!(spreadsheet_id = %self.spreadsheet_id, sheets = ?missing, "Creating missing sheets");
            self.store.create_sheets(&self.spreadsheet_id, &missing)?;
        }
        Ok(missing)
    }

    /// Merge `rows`, aligned with `header`, into `sheet`.
    pub fn write_sheet(
        &mut self,
        sheet: &str,
        category: Category,
        header: &Header,
        rows: Vec<Row>,
    ) -> Result<SheetOutcome, SyncError> {
        let mut outcome = SheetOutcome::new(sheet);
        let id = self.spreadsheet_id.clone();
        let strategy = KeyStrategy::for_category(category);
        let policy = WritePolicy::for_category(category);

        let found = self
            .store
            .get_range(&id, sheet, HEADER_ROW)?
            .into_iter()
            .next()
            .filter(|r| r.iter().any(|c| !c.is_empty()));

        let mut batch: Vec<Row> = Vec::new();
        let target = match found {
            Some(columns) => Header::new(columns),
            None => {
                debug!(sheet, "Sheet has no header yet");
                outcome.header_written = true;
                batch.push(header.to_row());
                header.clone()
            }
        };

        let missing_keys: Vec<String> = strategy
            .columns()
            .into_iter()
            .filter(|name| target.position(name).is_none())
            .map(str::to_string)
            .collect();
        let mut missing_fields: Vec<String> = Vec::new();
        for name in written_columns(header, &rows) {
            if target.position(name).is_none() && !missing_fields.contains(name) {
                missing_fields.push(name.clone());
            }
        }
        let grow = missing_keys.is_empty() && category.is_dynamic() && !missing_fields.is_empty();
        let target = if grow {
            let mut columns = target.columns().to_vec();
            columns.extend(missing_fields);
            info!(sheet, columns = columns.len(), "Extending sheet header");
            self.store
                .update_range(&id, sheet, HEADER_ROW, vec![columns.clone()])?;
            Header::new(columns)
        } else {
            let mut missing = missing_keys;
            missing.extend(missing_fields);
            if !missing.is_empty() {
                return Err(SyncError::HeaderMismatch {
                    sheet: sheet.to_string(),
                    missing,
                });
            }
            target
        };
        let key = strategy.resolve(&target).map_err(|missing| SyncError::HeaderMismatch {
            sheet: sheet.to_string(),
            missing,
        })?;

        let existing = if outcome.header_written {
            Default::default()
        } else {
            let column_rows = self.store.get_range(&id, sheet, &column_span(key.span()))?;
            existing_keys(&column_rows, &key)
        };
        debug!(sheet, existing = existing.len(), "Loaded existing keys");

        let width = target.len();
        let mut seen: HashSet<String> = HashSet::new();
        for row in rows {
            let row = project(&row, header, &target);
            let Some(k) = key.key_of(&row) else {
                outcome.skipped += 1;
                continue;
            };
            if !seen.insert(k.clone()) {
                outcome.skipped += 1;
                continue;
            }
            match (existing.get(&k), policy) {
                (None, _) => batch.push(row),
                (Some(_), WritePolicy::Skip) => outcome.skipped += 1,
                (Some(&row_number), WritePolicy::Merge) => {
                    let range = row_span(row_number, width);
                    let mut current = self
                        .store
                        .get_range(&id, sheet, &range)?
                        .into_iter()
                        .next()
                        .unwrap_or_default();
                    current.resize(width, String::new());
                    let merged = merge_row(&current, &row);
                    if merged == current {
                        outcome.unchanged += 1;
                    } else {
                        debug!(sheet, row = row_number, "Updating merged row");
                        self.store.update_range(&id, sheet, &range, vec![merged])?;
                        outcome.merged += 1;
                    }
                }
            }
        }

        let header_rows = usize::from(outcome.header_written);
        outcome.appended = batch.len() - header_rows;
        if !batch.is_empty() {
            self.store
                .append_rows(&id, sheet, &column_span(width), batch)?;
        }
        info!(
            sheet,
            appended = outcome.appended,
            merged = outcome.merged,
            unchanged = outcome.unchanged,
            skipped = outcome.skipped,
            header_written = outcome.header_written,
            "Synced sheet"
        );
        Ok(outcome)
    }

    /// Sync one formatted category into its sheet.
    pub fn write_category(&mut self, formatted: &FormattedCategory) -> Result<SheetOutcome, SyncError> {
        self.write_sheet(
            formatted.category.sheet_name(),
            formatted.category,
            &formatted.header,
            formatted.rows().cloned().collect(),
        )
    }

    /// Sync every formatted category, isolating failures per category.
    pub fn export(&mut self, formatted: Vec<CategoryResult>) -> SyncReport {
        let mut report = SyncReport::new();
        let names: Vec<String> = formatted
            .iter()
            .filter(|(_, r)| r.is_ok())
            .map(|(c, _)| c.sheet_name().to_string())
            .collect();
        let bootstrap = if names.is_empty() {
            Ok(Vec::new())
        } else {
            self.ensure_sheets(&names)
        };

        for (category, result) in formatted {
            let outcome = match (result, &bootstrap) {
                (Err(e), _) => Err(SyncError::Record(e)),
                (Ok(_), Err(e)) => Err(SyncError::Store(e.clone())),
                (Ok(fc), Ok(_)) => self.write_category(&fc),
            };
            if let Err(e) = &outcome {
                warn!(category = %category, error = %e, "Category sync failed");
            }
            report.record(category, outcome);
        }
        report
    }
}
