use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use chrono::NaiveDate;
use health_sheet_export::cloud_adapters::{CsvDirectorySink, CsvSink};
use health_sheet_export::core::format::{Header, RecordFormatter, Row};
use health_sheet_export::core::{
    Category, DailyRecord, DailyRecords, DynamicDay, FieldValue, MinMaxAvg, SleepDay, SplitMode,
    VitalsDay,
};
use health_sheet_export::export::{ExportError, export_to_csv};
use health_sheet_export::source::{ExportConfig, JsonFileSource, Metric};

fn write_input(dir: &std::path::Path, records: &DailyRecords) -> PathBuf {
    let path = dir.join("health.json");
    std::fs::write(&path, serde_json::to_string(records).unwrap()).unwrap();
    path
}

fn sample() -> DailyRecords {
    let mut records = DailyRecords::new();
    for (date, note) in [
        ("2023-12-30", "plain"),
        ("2024-01-02", "Jan, 2024 \"notes\""),
        ("2024-02-10", "line\nbreak"),
    ] {
        records.insert(
            date.to_string(),
            DailyRecord {
                cycle_tracking: Some(DynamicDay {
                    sources: Some("app".into()),
                    fields: BTreeMap::from([("note".to_string(), FieldValue::Text(note.into()))]),
                }),
                vitals: Some(VitalsDay {
                    heart_rate: MinMaxAvg {
                        avg: Some(64.0),
                        ..Default::default()
                    },
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
    }
    records
}

#[test]
fn writes_one_file_per_category() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &sample());
    let out = dir.path().join("exports");
    let source = JsonFileSource::new(&input);
    let mut sink = CsvDirectorySink::new(&out);

    let report = export_to_csv(
        &source,
        &RecordFormatter::new("UTC"),
        &mut sink,
        &ExportConfig::all_metrics(None),
        SplitMode::None,
    )
    .unwrap();

    let mut names: Vec<String> = report
        .files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, ["Cycle_Tracking.csv", "Vitals.csv"]);

    let cycle = std::fs::read_to_string(out.join("Cycle_Tracking.csv")).unwrap();
    assert_eq!(
        cycle,
        "Date,Source(s),Timezone,note\n\
         2023-12-30,app,UTC,plain\n\
         2024-01-02,app,UTC,\"Jan, 2024 \"\"notes\"\"\"\n\
         2024-02-10,app,UTC,\"line\nbreak\"\n"
    );
}

#[test]
fn split_by_month_names_files_by_group() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &sample());
    let mut sink = CsvDirectorySink::new(dir.path());

    let config = ExportConfig::new(None, [Metric::HeartRate]);
    let report = export_to_csv(
        &JsonFileSource::new(&input),
        &RecordFormatter::default(),
        &mut sink,
        &config,
        SplitMode::Month,
    )
    .unwrap();
    let mut names: Vec<String> = report
        .files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(
        names,
        ["Vitals_2023-12.csv", "Vitals_2024-01.csv", "Vitals_2024-02.csv"]
    );
    let january = std::fs::read_to_string(dir.path().join("Vitals_2024-01.csv")).unwrap();
    assert_eq!(january.lines().count(), 2);
}

#[test]
fn windowed_exports_ignore_split() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &sample());
    let mut sink = CsvDirectorySink::new(dir.path());
    let source =
        JsonFileSource::new(&input).with_today(NaiveDate::from_ymd_opt(2024, 2, 10).unwrap());

    let report = export_to_csv(
        &source,
        &RecordFormatter::default(),
        &mut sink,
        &ExportConfig::new(Some(60), [Metric::HeartRate]),
        SplitMode::Month,
    )
    .unwrap();
    assert_eq!(report.files, [dir.path().join("Vitals.csv")]);
}

struct BrokenSink;

impl CsvSink for BrokenSink {
    fn write_file(&mut self, name: &str, _header: &Header, _rows: &[Row]) -> io::Result<PathBuf> {
        if name.starts_with("Sleep") {
            Err(io::Error::other("disk full"))
        } else {
            Ok(PathBuf::from(name))
        }
    }
}

#[test]
fn sink_failure_does_not_stop_other_categories() {
    let dir = tempfile::tempdir().unwrap();
    let mut records = sample();
    if let Some(day) = records.get_mut("2024-01-02") {
        day.sleep = Some(SleepDay {
            start_time: Some("2024-01-02T23:10".into()),
            ..Default::default()
        });
    }
    let input = write_input(dir.path(), &records);

    let err = export_to_csv(
        &JsonFileSource::new(&input),
        &RecordFormatter::default(),
        &mut BrokenSink,
        &ExportConfig::all_metrics(None),
        SplitMode::None,
    )
    .unwrap_err();
    let ExportError::Csv(report) = err else {
        panic!("expected a CSV failure");
    };
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, Category::Sleep);
    assert_eq!(report.files.len(), 2);
}
