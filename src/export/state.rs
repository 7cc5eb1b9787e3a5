use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Who started an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Manual,
    Auto,
}

/// Timestamps of the last successful exports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportState {
    pub last_manual: Option<DateTime<Utc>>,
    pub last_auto: Option<DateTime<Utc>>,
}

impl ExportState {
    /// Load state from `path`. A missing or unreadable file yields the default.
    pub fn load(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|data| serde_json::from_str(&data).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let data = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        std::fs::write(path, data)
    }

    pub fn record(&mut self, kind: ExportKind, at: DateTime<Utc>) {
        match kind {
            ExportKind::Manual => self.last_manual = Some(at),
            ExportKind::Auto => self.last_auto = Some(at),
        }
    }

    pub fn last(&self, kind: ExportKind) -> Option<DateTime<Utc>> {
        match kind {
            ExportKind::Manual => self.last_manual,
            ExportKind::Auto => self.last_auto,
        }
    }
}

/// Marker file held while an export runs; removed on drop.
#[derive(Debug)]
pub struct ExportLock {
    path: PathBuf,
}

impl ExportLock {
    /// Create the lock file, failing with `AlreadyExists` if another export
    /// holds it.
    pub fn acquire(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        writeln!(file, "{}", std::process::id())?;
        debug!(path = %path.display(), "Acquired export lock");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ExportLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove export lock");
        }
    }
}
