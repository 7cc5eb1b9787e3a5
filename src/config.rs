//! `config.toml` handling.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{Category, SplitMode};
use crate::export::RetryPolicy;
use crate::source::{ExportConfig, Metric};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleSheetsConfig {
    pub credentials_path: String,
    #[serde(default = "default_token_path")]
    pub token_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<String>,
}

fn default_token_path() -> String {
    "tokens.json".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSection {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub split: SplitMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_back: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<Category>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Vec<Metric>>,
    pub state_path: PathBuf,
    pub lock_path: PathBuf,
    pub cache_ttl_secs: u64,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            input: PathBuf::from("health.json"),
            output_dir: PathBuf::from("exports"),
            split: SplitMode::None,
            days_back: Some(7),
            timezone: None,
            categories: None,
            metrics: None,
            state_path: PathBuf::from("export_state.json"),
            lock_path: PathBuf::from("export.lock"),
            cache_ttl_secs: 300,
        }
    }
}

impl ExportSection {
    /// Read configuration for a manual export.
    ///
    /// Selected metrics are narrowed to the selected categories.
    pub fn export_config(&self) -> ExportConfig {
        let metrics: BTreeSet<Metric> = match &self.metrics {
            Some(list) => list.iter().copied().collect(),
            None => Metric::ALL.into_iter().collect(),
        };
        let metrics = metrics
            .into_iter()
            .filter(|m| {
                self.categories
                    .as_ref()
                    .is_none_or(|cats| cats.contains(&m.category()))
            })
            .collect::<Vec<_>>();
        ExportConfig::new(self.days_back, metrics)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
        }
    }
}

impl RetrySection {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.base_delay_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSection {
    pub cron: String,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            cron: "0 0 * * * *".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub google_sheets: GoogleSheetsConfig,
    #[serde(default)]
    pub export: ExportSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub schedule: ScheduleSection,
}

#[derive(Debug)]
pub enum ConfigError {
    /// The file does not exist or cannot be read.
    Missing(PathBuf),
    /// The file is not valid configuration.
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(path) => write!(f, "{} file not found", path.display()),
            ConfigError::Invalid(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse configuration from TOML text.
pub fn parse_config(data: &str) -> Result<Config, ConfigError> {
    let cfg: Config = toml::from_str(data).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    if cfg.google_sheets.credentials_path.is_empty() {
        return Err(ConfigError::Invalid(
            "google_sheets.credentials_path is missing".to_string(),
        ));
    }
    if cfg.export.categories.as_ref().is_some_and(|c| c.is_empty()) {
        return Err(ConfigError::Invalid(
            "export.categories must not be empty".to_string(),
        ));
    }
    Ok(cfg)
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let data =
        std::fs::read_to_string(path).map_err(|_| ConfigError::Missing(path.to_path_buf()))?;
    parse_config(&data)
}

pub fn save_config(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    let data = toml::to_string(cfg).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    std::fs::write(path, data).map_err(|e| ConfigError::Invalid(e.to_string()))
}

/// Extract the spreadsheet id from a sharing link, or return the input as is.
pub fn parse_sheet_id(input: &str) -> String {
    let input = input.trim();
    if let Some(start) = input.find("/d/") {
        let rest = &input[start + 3..];
        let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        rest[..end].to_string()
    } else {
        input.to_string()
    }
}
