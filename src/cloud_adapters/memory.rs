use std::collections::{BTreeMap, HashMap};

use super::range::CellRange;
use super::{SpreadsheetError, TabularStore};
use crate::core::format::Row;

/// A request observed by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    ListSheets,
    CreateSheets(Vec<String>),
    GetRange { sheet: String, range: String },
    AppendRows { sheet: String, rows: usize },
    UpdateRange { sheet: String, range: String },
}

/// In-memory store simulating Google Sheets behaviour.
#[derive(Debug, Default)]
pub struct MemoryStore {
    spreadsheets: HashMap<String, BTreeMap<String, Vec<Row>>>,
    calls: std::cell::RefCell<Vec<StoreCall>>,
}

fn trim_row(mut row: Row) -> Row {
    while row.last().is_some_and(|c| c.is_empty()) {
        row.pop();
    }
    row
}

fn trim_rows(rows: &mut Vec<Row>) {
    while rows.last().is_some_and(|r| r.iter().all(|c| c.is_empty())) {
        rows.pop();
    }
}

impl MemoryStore {
    /// Creates a new mock store instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding one empty spreadsheet.
    pub fn with_spreadsheet(id: &str) -> Self {
        let mut store = Self::new();
        store.spreadsheets.insert(id.to_string(), BTreeMap::new());
        store
    }

    /// Overwrites a sheet with `rows`, creating it when missing.
    pub fn seed(&mut self, id: &str, sheet: &str, rows: Vec<Row>) {
        self.spreadsheets
            .entry(id.to_string())
            .or_default()
            .insert(sheet.to_string(), rows);
    }

    /// Current content of a sheet.
    pub fn sheet(&self, id: &str, sheet: &str) -> Option<&[Row]> {
        self.spreadsheets
            .get(id)
            .and_then(|s| s.get(sheet))
            .map(Vec::as_slice)
    }

    /// Requests received so far, oldest first.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, call: StoreCall) {
        self.calls.borrow_mut().push(call);
    }

    fn sheets(&self, id: &str) -> Result<&BTreeMap<String, Vec<Row>>, SpreadsheetError> {
        self.spreadsheets
            .get(id)
            .ok_or_else(|| SpreadsheetError::SpreadsheetNotFound(id.to_string()))
    }

    fn rows_mut(&mut self, id: &str, sheet: &str) -> Result<&mut Vec<Row>, SpreadsheetError> {
        self.spreadsheets
            .get_mut(id)
            .ok_or_else(|| SpreadsheetError::SpreadsheetNotFound(id.to_string()))?
            .get_mut(sheet)
            .ok_or_else(|| SpreadsheetError::SheetNotFound(sheet.to_string()))
    }
}

impl TabularStore for MemoryStore {
    fn list_sheets(&self, spreadsheet_id: &str) -> Result<Vec<String>, SpreadsheetError> {
        self.record(StoreCall::ListSheets);
        Ok(self.sheets(spreadsheet_id)?.keys().cloned().collect())
    }

    fn create_sheets(
        &mut self,
        spreadsheet_id: &str,
        titles: &[String],
    ) -> Result<(), SpreadsheetError> {
        self.record(StoreCall::CreateSheets(titles.to_vec()));
        let sheets = self
            .spreadsheets
            .get_mut(spreadsheet_id)
            .ok_or_else(|| SpreadsheetError::SpreadsheetNotFound(spreadsheet_id.to_string()))?;
        if let Some(dup) = titles.iter().find(|t| sheets.contains_key(*t)) {
            return Err(SpreadsheetError::Permanent(format!(
                "a sheet with the name \"{dup}\" already exists"
            )));
        }
        for title in titles {
            sheets.insert(title.clone(), Vec::new());
        }
        Ok(())
    }

    fn get_range(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        range: &str,
    ) -> Result<Vec<Row>, SpreadsheetError> {
        self.record(StoreCall::GetRange {
            sheet: sheet.to_string(),
            range: range.to_string(),
        });
        let bounds: CellRange = range.parse()?;
        let rows = self
            .sheets(spreadsheet_id)?
            .get(sheet)
            .ok_or_else(|| SpreadsheetError::SheetNotFound(sheet.to_string()))?;
        let mut out: Vec<Row> = rows
            .iter()
            .enumerate()
            .filter(|(i, _)| bounds.contains_row(i + 1))
            .map(|(_, row)| {
                let cells = row
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| bounds.contains_col(j + 1))
                    .map(|(_, c)| c.clone())
                    .collect();
                trim_row(cells)
            })
            .collect();
        trim_rows(&mut out);
        Ok(out)
    }

    fn append_rows(
        &mut self,
        spreadsheet_id: &str,
        sheet: &str,
        range: &str,
        rows: Vec<Row>,
    ) -> Result<(), SpreadsheetError> {
        self.record(StoreCall::AppendRows {
            sheet: sheet.to_string(),
            rows: rows.len(),
        });
        range.parse::<CellRange>()?;
        let existing = self.rows_mut(spreadsheet_id, sheet)?;
        trim_rows(existing);
        existing.extend(rows);
        Ok(())
    }

    fn update_range(
        &mut self,
        spreadsheet_id: &str,
        sheet: &str,
        range: &str,
        rows: Vec<Row>,
    ) -> Result<(), SpreadsheetError> {
        self.record(StoreCall::UpdateRange {
            sheet: sheet.to_string(),
            range: range.to_string(),
        });
        let bounds: CellRange = range.parse()?;
        let first_row = bounds
            .start_row
            .ok_or_else(|| SpreadsheetError::InvalidRange(range.to_string()))?;
        let first_col = bounds.start_col.unwrap_or(1);
        let existing = self.rows_mut(spreadsheet_id, sheet)?;
        for (offset, values) in rows.into_iter().enumerate() {
            let index = first_row - 1 + offset;
            if existing.len() <= index {
                existing.resize(index + 1, Vec::new());
            }
            let target = &mut existing[index];
            for (j, value) in values.into_iter().enumerate() {
                let col = first_col - 1 + j;
                if target.len() <= col {
                    target.resize(col + 1, String::new());
                }
                target[col] = value;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn get_range_crops_and_trims() {
        let mut store = MemoryStore::with_spreadsheet("s");
        store.seed(
            "s",
            "Sleep",
            vec![row(&["Date", "Source(s)"]), row(&["2024-01-01", ""]), row(&["", ""])],
        );
        let col = store.get_range("s", "Sleep", "A:A").unwrap();
        assert_eq!(col, vec![row(&["Date"]), row(&["2024-01-01"])]);
        let header = store.get_range("s", "Sleep", "1:1").unwrap();
        assert_eq!(header, vec![row(&["Date", "Source(s)"])]);
    }

    #[test]
    fn missing_sheet_is_reported() {
        let store = MemoryStore::with_spreadsheet("s");
        let err = store.get_range("s", "Vitals", "1:1").unwrap_err();
        assert_eq!(err, SpreadsheetError::SheetNotFound("Vitals".into()));
        let err = store.list_sheets("other").unwrap_err();
        assert_eq!(err, SpreadsheetError::SpreadsheetNotFound("other".into()));
    }

    #[test]
    fn update_writes_in_place() {
        let mut store = MemoryStore::with_spreadsheet("s");
        store.seed("s", "Vitals", vec![row(&["Date", "HR"]), row(&["2024-01-01", ""])]);
        store
            .update_range("s", "Vitals", "A2:B2", vec![row(&["2024-01-01", "70"])])
            .unwrap();
        assert_eq!(store.sheet("s", "Vitals").unwrap()[1], row(&["2024-01-01", "70"]));
    }
}
