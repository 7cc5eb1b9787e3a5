use std::path::PathBuf;

use health_sheet_export::config::{ConfigError, load_config, parse_config, save_config};
use health_sheet_export::core::{Category, SplitMode};
use health_sheet_export::source::Metric;

#[test]
fn minimal_config_uses_defaults() {
    let toml = r#"
[google_sheets]
credentials_path = "cred.json"
"#;
    let cfg = parse_config(toml).unwrap();
    assert_eq!(cfg.google_sheets.credentials_path, "cred.json");
    assert_eq!(cfg.google_sheets.token_path, "tokens.json");
    assert_eq!(cfg.google_sheets.spreadsheet_id, None);
    assert_eq!(cfg.export.split, SplitMode::None);
    assert_eq!(cfg.export.days_back, Some(7));
    assert_eq!(cfg.export.cache_ttl_secs, 300);
    assert_eq!(cfg.retry.max_retries, 3);
    assert_eq!(cfg.schedule.cron, "0 0 * * * *");
    assert_eq!(cfg.export.export_config().metrics.len(), Metric::ALL.len());
}

#[test]
fn parses_full_config() {
    let toml = r#"
[google_sheets]
credentials_path = "cred.json"
token_path = "secrets/tokens.json"
spreadsheet_id = "abc"

[export]
input = "data/health.json"
output_dir = "out"
split = "month"
timezone = "Europe/Berlin"
categories = ["activity", "vitals"]
metrics = ["steps", "heart_rate", "weight"]

[retry]
max_retries = 5
base_delay_ms = 250

[schedule]
cron = "0 30 6 * * *"
"#;
    let cfg = parse_config(toml).unwrap();
    assert_eq!(cfg.google_sheets.spreadsheet_id.as_deref(), Some("abc"));
    assert_eq!(cfg.export.input, PathBuf::from("data/health.json"));
    assert_eq!(cfg.export.split, SplitMode::Month);
    assert_eq!(cfg.export.timezone.as_deref(), Some("Europe/Berlin"));
    assert_eq!(
        cfg.export.categories,
        Some(vec![Category::Activity, Category::Vitals])
    );
    let export = cfg.export.export_config();
    assert!(export.includes(Metric::Steps));
    assert!(export.includes(Metric::HeartRate));
    assert!(!export.includes(Metric::Weight));
    assert_eq!(cfg.retry.policy().max_retries, 5);
    assert_eq!(cfg.schedule.cron, "0 30 6 * * *");
}

#[test]
fn fails_without_credentials() {
    let toml = r#"
[google_sheets]
spreadsheet_id = "abc"
"#;
    assert!(matches!(parse_config(toml), Err(ConfigError::Invalid(_))));

    let toml = r#"
[google_sheets]
credentials_path = ""
"#;
    assert!(matches!(parse_config(toml), Err(ConfigError::Invalid(_))));
}

#[test]
fn rejects_unknown_split() {
    let toml = r#"
[google_sheets]
credentials_path = "cred.json"

[export]
split = "weekly"
"#;
    assert!(parse_config(toml).is_err());
}

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let mut cfg = parse_config("[google_sheets]\ncredentials_path = \"cred.json\"\n").unwrap();
    cfg.google_sheets.spreadsheet_id = Some("xyz".into());
    save_config(&path, &cfg).unwrap();
    assert_eq!(load_config(&path).unwrap(), cfg);
}

#[test]
fn missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config(&dir.path().join("config.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Missing(_)));
}
