use std::time::Duration;

use chrono::NaiveDate;
use health_sheet_export::source::{
    CachedSource, ExportConfig, HealthDataSource, JsonFileSource, Metric, SourceError,
};

const DATA: &str = r#"{
  "2024-03-01": {
    "activity": {
      "sources": "watch",
      "steps": 9000,
      "distance_m": 6400.5,
      "exercises": [{"start": "2024-03-01T07:00", "name": "Run", "duration_minutes": 35}]
    },
    "vitals": {
      "heart_rate": {"min": 48.0, "max": 151.0, "avg": 71.5},
      "resting_heart_rate": {"avg": 52.0},
      "blood_pressure": "120/80"
    }
  },
  "2024-03-09": {
    "body_measurements": {
      "height_m": 1.8,
      "measurements": [{"date_time": "2024-03-09T07:10", "weight_kg": 80.2}]
    },
    "nutrition": {"fields": {"water_l": 2.5}}
  },
  "2024-03-10": {
    "sleep": {"start_time": "2024-03-09T23:30", "deep_minutes": 80}
  }
}"#;

fn source(dir: &tempfile::TempDir) -> JsonFileSource {
    let path = dir.path().join("health.json");
    std::fs::write(&path, DATA).unwrap();
    JsonFileSource::new(path).with_today(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap())
}

#[test]
fn reads_all_history() {
    let dir = tempfile::tempdir().unwrap();
    let records = source(&dir)
        .read_by_day(&ExportConfig::all_metrics(None))
        .unwrap();
    assert_eq!(records.len(), 3);
    let vitals = records["2024-03-01"].vitals.as_ref().unwrap();
    assert_eq!(vitals.heart_rate.avg, Some(71.5));
    assert_eq!(vitals.blood_pressure.as_deref(), Some("120/80"));
    let activity = records["2024-03-01"].activity.as_ref().unwrap();
    assert_eq!(activity.exercises.len(), 1);
}

#[test]
fn window_limits_days() {
    let dir = tempfile::tempdir().unwrap();
    let records = source(&dir)
        .read_by_day(&ExportConfig::all_metrics(Some(3)))
        .unwrap();
    let days: Vec<&str> = records.keys().map(String::as_str).collect();
    assert_eq!(days, ["2024-03-09", "2024-03-10"]);
}

#[test]
fn unselected_metrics_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExportConfig::all_metrics(None).for_auto_export();
    let config = ExportConfig {
        days_back: None,
        ..config
    };
    let records = source(&dir).read_by_day(&config).unwrap();
    let vitals = records["2024-03-01"].vitals.as_ref().unwrap();
    assert!(vitals.heart_rate.is_empty());
    assert_eq!(vitals.blood_pressure, None);
    assert_eq!(vitals.resting_heart_rate.avg, Some(52.0));

    let steps_only = ExportConfig::new(None, [Metric::Steps]);
    let records = source(&dir).read_by_day(&steps_only).unwrap();
    let day = &records["2024-03-01"];
    assert!(day.vitals.as_ref().is_none_or(|v| v.is_empty()));
    let activity = day.activity.as_ref().unwrap();
    assert!(activity.exercises.is_empty());
    assert_eq!(activity.distance_m, None);
    assert!(records["2024-03-09"].nutrition.is_none());
    assert!(records["2024-03-10"].sleep.is_none());
}

#[test]
fn ungranted_metrics_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    let source = source(&dir).with_granted([Metric::Steps, Metric::Weight]);
    let err = source
        .read_by_day(&ExportConfig::new(None, [Metric::Steps, Metric::HeartRate]))
        .unwrap_err();
    match err {
        SourceError::PermissionDenied { missing } => assert_eq!(missing, [Metric::HeartRate]),
        other => panic!("unexpected error {other}"),
    }
    assert!(
        source
            .read_by_day(&ExportConfig::new(None, [Metric::Weight]))
            .is_ok()
    );
}

#[test]
fn invalid_json_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("health.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = JsonFileSource::new(path)
        .read_by_day(&ExportConfig::default())
        .unwrap_err();
    assert!(matches!(err, SourceError::Parse(_)));
}

#[test]
fn cache_serves_repeated_reads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("health.json");
    std::fs::write(&path, DATA).unwrap();
    let cached = CachedSource::with_ttl(JsonFileSource::new(&path), Duration::from_secs(300));
    let config = ExportConfig::all_metrics(None);
    let first = cached.read_by_day(&config).unwrap();

    std::fs::remove_file(&path).unwrap();
    assert_eq!(cached.read_by_day(&config).unwrap(), first);

    cached.invalidate();
    assert!(matches!(cached.read_by_day(&config), Err(SourceError::Io(_))));
}
