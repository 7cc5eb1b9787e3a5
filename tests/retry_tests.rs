use std::cell::RefCell;
use std::time::Duration;

use health_sheet_export::cloud_adapters::{MemoryStore, SpreadsheetError, TabularStore};
use health_sheet_export::core::format::{RecordFormatter, Row};
use health_sheet_export::core::{DailyRecord, DailyRecords, SleepDay};
use health_sheet_export::export::{ExportError, RetryPolicy, export_to_sheets};
use health_sheet_export::source::{ExportConfig, HealthDataSource, SourceError};
use health_sheet_export::sync::SyncWriter;

/// Store whose appends fail with a transient error a fixed number of times.
struct FlakyStore {
    inner: MemoryStore,
    fail_times: usize,
    appends: RefCell<usize>,
}

impl TabularStore for FlakyStore {
    fn list_sheets(&self, id: &str) -> Result<Vec<String>, SpreadsheetError> {
        self.inner.list_sheets(id)
    }

    fn create_sheets(&mut self, id: &str, titles: &[String]) -> Result<(), SpreadsheetError> {
        self.inner.create_sheets(id, titles)
    }

    fn get_range(&self, id: &str, sheet: &str, range: &str) -> Result<Vec<Row>, SpreadsheetError> {
        self.inner.get_range(id, sheet, range)
    }

    fn append_rows(
        &mut self,
        id: &str,
        sheet: &str,
        range: &str,
        rows: Vec<Row>,
    ) -> Result<(), SpreadsheetError> {
        let mut c = self.appends.borrow_mut();
        *c += 1;
        if *c <= self.fail_times {
            return Err(SpreadsheetError::Transient("network".into()));
        }
        self.inner.append_rows(id, sheet, range, rows)
    }

    fn update_range(
        &mut self,
        id: &str,
        sheet: &str,
        range: &str,
        rows: Vec<Row>,
    ) -> Result<(), SpreadsheetError> {
        self.inner.update_range(id, sheet, range, rows)
    }
}

struct OneNight;

impl HealthDataSource for OneNight {
    fn read_by_day(&self, _config: &ExportConfig) -> Result<DailyRecords, SourceError> {
        let record = DailyRecord {
            sleep: Some(SleepDay {
                start_time: Some("2024-01-01T23:00".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        Ok([("2024-01-01".to_string(), record)].into())
    }
}

fn writer(fail_times: usize) -> SyncWriter<FlakyStore> {
    SyncWriter::new(
        FlakyStore {
            inner: MemoryStore::with_spreadsheet("s"),
            fail_times,
            appends: RefCell::new(0),
        },
        "s",
    )
}

#[test]
fn retries_and_succeeds() {
    let mut writer = writer(2);
    let formatter = RecordFormatter::default();
    let config = ExportConfig::all_metrics(None);
    let policy = RetryPolicy::new(3, Duration::from_millis(1));

    let report = policy
        .run(
            || export_to_sheets(&OneNight, &formatter, &mut writer, &config),
            ExportError::is_retryable,
        )
        .unwrap();
    assert!(report.is_success());
    assert_eq!(*writer.store().appends.borrow(), 3);
    // earlier attempts failed before writing, so the header lands once
    assert_eq!(writer.store().inner.sheet("s", "Sleep").unwrap().len(), 2);
}

#[test]
fn gives_up_after_max_retries() {
    let mut writer = writer(5);
    let formatter = RecordFormatter::default();
    let config = ExportConfig::all_metrics(None);
    let policy = RetryPolicy::new(3, Duration::from_millis(1));

    let err = policy
        .run(
            || export_to_sheets(&OneNight, &formatter, &mut writer, &config),
            ExportError::is_retryable,
        )
        .unwrap_err();
    assert!(matches!(err, ExportError::Sheets(_)));
    assert!(err.is_retryable());
    assert_eq!(*writer.store().appends.borrow(), 4);
}

#[test]
fn permanent_errors_are_not_retried() {
    let calls = RefCell::new(0);
    let policy = RetryPolicy::new(3, Duration::from_millis(1));
    let result: Result<(), SpreadsheetError> = policy.run(
        || {
            *calls.borrow_mut() += 1;
            Err(SpreadsheetError::Permanent("bad request".into()))
        },
        SpreadsheetError::is_retryable,
    );
    assert!(result.is_err());
    assert_eq!(*calls.borrow(), 1);
}
