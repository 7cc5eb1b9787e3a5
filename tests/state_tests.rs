use chrono::{TimeZone, Utc};
use health_sheet_export::export::{ExportKind, ExportLock, ExportState};

#[test]
fn saves_and_loads_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export_state.json");
    let at = Utc.with_ymd_and_hms(2024, 3, 10, 6, 30, 0).unwrap();

    let mut state = ExportState::load(&path);
    state.record(ExportKind::Auto, at);
    state.save(&path).unwrap();

    let loaded = ExportState::load(&path);
    assert_eq!(loaded.last(ExportKind::Auto), Some(at));
    assert_eq!(loaded.last(ExportKind::Manual), None);
}

#[test]
fn missing_or_corrupt_state_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export_state.json");
    assert_eq!(ExportState::load(&path), ExportState::default());
    std::fs::write(&path, "not json").unwrap();
    assert_eq!(ExportState::load(&path), ExportState::default());
}

#[test]
fn lock_is_exclusive_until_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.lock");

    let lock = ExportLock::acquire(&path).unwrap();
    assert!(lock.path().exists());
    let err = ExportLock::acquire(&path).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);

    drop(lock);
    assert!(!path.exists());
    assert!(ExportLock::acquire(&path).is_ok());
}
