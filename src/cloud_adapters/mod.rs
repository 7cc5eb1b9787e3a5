//! Adapters for spreadsheet services and flat files.

pub mod auth;
pub mod file;
pub mod google_sheets4;
pub mod memory;
pub mod range;

pub use file::{CsvDirectorySink, CsvSink};
pub use google_sheets4::GoogleSheets4Adapter;
pub use memory::MemoryStore;

use crate::core::format::Row;

/// Represents errors that can occur when interacting with a spreadsheet
/// service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpreadsheetError {
    /// The spreadsheet itself does not exist.
    SpreadsheetNotFound(String),
    /// The requested sheet (tab) does not exist.
    SheetNotFound(String),
    /// A range could not be interpreted.
    InvalidRange(String),
    /// Credentials were missing or rejected.
    Unauthorized(String),
    /// A temporary failure such as a network error or rate limit.
    Transient(String),
    /// A failure that will not go away by retrying.
    Permanent(String),
}

impl SpreadsheetError {
    /// Returns `true` if the operation may succeed when retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SpreadsheetError::Transient(_))
    }
}

impl std::fmt::Display for SpreadsheetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpreadsheetError::SpreadsheetNotFound(id) => write!(f, "spreadsheet {id} not found"),
            SpreadsheetError::SheetNotFound(name) => write!(f, "sheet '{name}' not found"),
            SpreadsheetError::InvalidRange(range) => write!(f, "invalid range '{range}'"),
            SpreadsheetError::Unauthorized(msg) => write!(f, "unauthorized: {msg}"),
            SpreadsheetError::Transient(msg) => write!(f, "transient error: {msg}"),
            SpreadsheetError::Permanent(msg) => write!(f, "permanent error: {msg}"),
        }
    }
}

impl std::error::Error for SpreadsheetError {}

/// Abstraction over a remote store of named sheets addressed by A1 ranges.
///
/// Ranges are given without the sheet prefix (`A:U`, `1:1`, `A5:U5`); the
/// store qualifies them with `sheet`.
pub trait TabularStore {
    /// Titles of all sheets in the spreadsheet.
    fn list_sheets(&self, spreadsheet_id: &str) -> Result<Vec<String>, SpreadsheetError>;
    /// Creates the given sheets in one request.
    fn create_sheets(
        &mut self,
        spreadsheet_id: &str,
        titles: &[String],
    ) -> Result<(), SpreadsheetError>;
    /// Reads the cell values of `range`; trailing empty rows and cells are omitted.
    fn get_range(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        range: &str,
    ) -> Result<Vec<Row>, SpreadsheetError>;
    /// Appends rows after the last row of the table found in `range`.
    fn append_rows(
        &mut self,
        spreadsheet_id: &str,
        sheet: &str,
        range: &str,
        rows: Vec<Row>,
    ) -> Result<(), SpreadsheetError>;
    /// Overwrites the cells of `range` starting at its top-left corner.
    fn update_range(
        &mut self,
        spreadsheet_id: &str,
        sheet: &str,
        range: &str,
        rows: Vec<Row>,
    ) -> Result<(), SpreadsheetError>;
}

impl<T: TabularStore + ?Sized> TabularStore for &mut T {
    fn list_sheets(&self, spreadsheet_id: &str) -> Result<Vec<String>, SpreadsheetError> {
        (**self).list_sheets(spreadsheet_id)
    }

    fn create_sheets(
        &mut self,
        spreadsheet_id: &str,
        titles: &[String],
    ) -> Result<(), SpreadsheetError> {
        (**self).create_sheets(spreadsheet_id, titles)
    }

    fn get_range(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        range: &str,
    ) -> Result<Vec<Row>, SpreadsheetError> {
        (**self).get_range(spreadsheet_id, sheet, range)
    }

    fn append_rows(
        &mut self,
        spreadsheet_id: &str,
        sheet: &str,
        range: &str,
        rows: Vec<Row>,
    ) -> Result<(), SpreadsheetError> {
        (**self).append_rows(spreadsheet_id, sheet, range, rows)
    }

    fn update_range(
        &mut self,
        spreadsheet_id: &str,
        sheet: &str,
        range: &str,
        rows: Vec<Row>,
    ) -> Result<(), SpreadsheetError> {
        (**self).update_range(spreadsheet_id, sheet, range, rows)
    }
}
