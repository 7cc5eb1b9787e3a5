//! Cron schedule for unattended exports.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleError(pub String);

impl std::fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid schedule: {}", self.0)
    }
}

impl std::error::Error for ScheduleError {}

/// Parsed cron expression (seconds field included, e.g. `0 0 * * * *`).
#[derive(Debug, Clone)]
pub struct ExportSchedule {
    expression: String,
    schedule: Schedule,
}

impl ExportSchedule {
    pub fn parse(expression: &str) -> Result<Self, ScheduleError> {
        let schedule =
            Schedule::from_str(expression).map_err(|e| ScheduleError(format!("{expression}: {e}")))?;
        Ok(Self {
            expression: expression.to_string(),
            schedule,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First run strictly after `since`.
    pub fn next_after(&self, since: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&since).next()
    }

    /// Runs after `since` up to and including `until`.
    pub fn upcoming(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        self.schedule
            .after(&since)
            .take_while(|d| *d <= until)
            .collect()
    }
}

impl FromStr for ExportSchedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
