//! Health-data sources and the read configuration they honour.

pub mod cache;

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{Category, DailyRecord, DailyRecords, parse_day};

pub use cache::CachedSource;

/// One selectable measurement type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    ActiveCalories,
    Distance,
    ElevationGained,
    Exercise,
    FloorsClimbed,
    Power,
    Speed,
    Steps,
    TotalCalories,
    Vo2Max,
    WheelchairPushes,
    BodyFat,
    BoneMass,
    Height,
    LeanBodyMass,
    Weight,
    CervicalMucus,
    Menstruation,
    OvulationTest,
    SexualActivity,
    Hydration,
    Nutrition,
    SleepSession,
    BloodGlucose,
    BloodPressure,
    BodyTemperature,
    HeartRate,
    HeartRateVariability,
    OxygenSaturation,
    RespiratoryRate,
    RestingHeartRate,
}

impl Metric {
    pub const ALL: [Metric; 31] = [
        Metric::ActiveCalories,
        Metric::Distance,
        Metric::ElevationGained,
        Metric::Exercise,
        Metric::FloorsClimbed,
        Metric::Power,
        Metric::Speed,
        Metric::Steps,
        Metric::TotalCalories,
        Metric::Vo2Max,
        Metric::WheelchairPushes,
        Metric::BodyFat,
        Metric::BoneMass,
        Metric::Height,
        Metric::LeanBodyMass,
        Metric::Weight,
        Metric::CervicalMucus,
        Metric::Menstruation,
        Metric::OvulationTest,
        Metric::SexualActivity,
        Metric::Hydration,
        Metric::Nutrition,
        Metric::SleepSession,
        Metric::BloodGlucose,
        Metric::BloodPressure,
        Metric::BodyTemperature,
        Metric::HeartRate,
        Metric::HeartRateVariability,
        Metric::OxygenSaturation,
        Metric::RespiratoryRate,
        Metric::RestingHeartRate,
    ];

    /// Vitals sampled many times a day, left out of unattended exports.
    pub const HIGH_FREQUENCY: [Metric; 7] = [
        Metric::BloodGlucose,
        Metric::BloodPressure,
        Metric::BodyTemperature,
        Metric::HeartRate,
        Metric::HeartRateVariability,
        Metric::OxygenSaturation,
        Metric::RespiratoryRate,
    ];

    pub fn category(self) -> Category {
        use Metric::*;
        match self {
            ActiveCalories | Distance | ElevationGained | Exercise | FloorsClimbed | Power
            | Speed | Steps | TotalCalories | Vo2Max | WheelchairPushes => Category::Activity,
            BodyFat | BoneMass | Height | LeanBodyMass | Weight => Category::BodyMeasurements,
            CervicalMucus | Menstruation | OvulationTest | SexualActivity => {
                Category::CycleTracking
            }
            Hydration | Nutrition => Category::Nutrition,
            SleepSession => Category::Sleep,
            BloodGlucose | BloodPressure | BodyTemperature | HeartRate | HeartRateVariability
            | OxygenSaturation | RespiratoryRate | RestingHeartRate => Category::Vitals,
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Which metrics to read and over how many days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Days before today to include; `None` reads all history.
    pub days_back: Option<u32>,
    pub metrics: BTreeSet<Metric>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self::all_metrics(Some(7))
    }
}

impl ExportConfig {
    pub fn new(days_back: Option<u32>, metrics: impl IntoIterator<Item = Metric>) -> Self {
        Self {
            days_back,
            metrics: metrics.into_iter().collect(),
        }
    }

    pub fn all_metrics(days_back: Option<u32>) -> Self {
        Self::new(days_back, Metric::ALL)
    }

    /// Every metric over the last three days.
    pub fn recent_all() -> Self {
        Self::all_metrics(Some(3))
    }

    /// Preset for unattended runs: the last day, without high-frequency
    /// vitals other than resting heart rate.
    pub fn for_auto_export(&self) -> Self {
        Self {
            days_back: Some(1),
            metrics: self
                .metrics
                .iter()
                .copied()
                .filter(|m| !Metric::HIGH_FREQUENCY.contains(m))
                .collect(),
        }
    }

    pub fn includes(&self, metric: Metric) -> bool {
        self.metrics.contains(&metric)
    }

    /// Categories with at least one selected metric.
    pub fn categories(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|c| self.metrics.iter().any(|m| m.category() == *c))
            .collect()
    }

    /// Whether `date` falls inside the window ending on `today`.
    pub fn in_window(&self, date: NaiveDate, today: NaiveDate) -> bool {
        match self.days_back {
            None => true,
            Some(n) => {
                let oldest = today.checked_sub_days(Days::new(u64::from(n)));
                oldest.is_none_or(|oldest| date >= oldest) && date <= today
            }
        }
    }
}

/// Errors raised while reading health data.
#[derive(Debug)]
pub enum SourceError {
    Io(std::io::Error),
    Parse(String),
    /// Metrics requested but not granted.
    PermissionDenied { missing: Vec<Metric> },
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Io(e) => write!(f, "failed to read health data: {e}"),
            SourceError::Parse(e) => write!(f, "invalid health data: {e}"),
            SourceError::PermissionDenied { missing } => {
                let names: Vec<String> = missing.iter().map(|m| m.to_string()).collect();
                write!(f, "missing permission for: {}", names.join(", "))
            }
        }
    }
}

impl std::error::Error for SourceError {}

impl From<std::io::Error> for SourceError {
    fn from(e: std::io::Error) -> Self {
        SourceError::Io(e)
    }
}

/// Provider of per-day health records.
pub trait HealthDataSource {
    fn read_by_day(&self, config: &ExportConfig) -> Result<DailyRecords, SourceError>;
}

impl<T: HealthDataSource + ?Sized> HealthDataSource for &T {
    fn read_by_day(&self, config: &ExportConfig) -> Result<DailyRecords, SourceError> {
        (**self).read_by_day(config)
    }
}

/// Drop every field of `record` whose metric is not selected.
pub fn retain_metrics(record: &mut DailyRecord, config: &ExportConfig) {
    let has = |m| config.includes(m);

    if let Some(day) = record.activity.as_mut() {
        if !has(Metric::ActiveCalories) {
            day.active_calories = None;
        }
        if !has(Metric::Distance) {
            day.distance_m = None;
        }
        if !has(Metric::ElevationGained) {
            day.elevation_m = None;
        }
        if !has(Metric::Exercise) {
            day.exercises.clear();
        }
        if !has(Metric::FloorsClimbed) {
            day.floors_climbed = None;
        }
        if !has(Metric::Power) {
            day.power_w = Default::default();
        }
        if !has(Metric::Speed) {
            day.speed_mps = Default::default();
        }
        if !has(Metric::Steps) {
            day.steps = None;
        }
        if !has(Metric::TotalCalories) {
            day.total_calories = None;
        }
        if !has(Metric::Vo2Max) {
            day.vo2_max = Default::default();
        }
        if !has(Metric::WheelchairPushes) {
            day.wheelchair_pushes = None;
        }
    }

    if let Some(day) = record.body_measurements.as_mut() {
        if !has(Metric::BoneMass) {
            day.bone_mass_kg = None;
        }
        if !has(Metric::Height) {
            day.height_m = None;
        }
        if !has(Metric::LeanBodyMass) {
            day.lean_body_mass_kg = None;
        }
        for entry in &mut day.measurements {
            if !has(Metric::Weight) {
                entry.weight_kg = None;
            }
            if !has(Metric::BodyFat) {
                entry.body_fat_pct = None;
            }
        }
        day.measurements
            .retain(|e| e.weight_kg.is_some() || e.body_fat_pct.is_some());
    }

    if !config.categories().contains(&Category::CycleTracking) {
        record.cycle_tracking = None;
    }
    if !config.categories().contains(&Category::Nutrition) {
        record.nutrition = None;
    }
    if !has(Metric::SleepSession) {
        record.sleep = None;
    }

    if let Some(day) = record.vitals.as_mut() {
        if !has(Metric::BloodGlucose) {
            day.blood_glucose = None;
        }
        if !has(Metric::BloodPressure) {
            day.blood_pressure = None;
        }
        if !has(Metric::BodyTemperature) {
            day.body_temperature = None;
        }
        if !has(Metric::HeartRate) {
            day.heart_rate = Default::default();
        }
        if !has(Metric::HeartRateVariability) {
            day.heart_rate_variability = Default::default();
        }
        if !has(Metric::OxygenSaturation) {
            day.oxygen_saturation = Default::default();
        }
        if !has(Metric::RespiratoryRate) {
            day.respiratory_rate = Default::default();
        }
        if !has(Metric::RestingHeartRate) {
            day.resting_heart_rate = Default::default();
        }
    }
}

/// Source reading a JSON object of `{ "YYYY-MM-DD": DailyRecord }` from disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    today: Option<NaiveDate>,
    granted: Option<BTreeSet<Metric>>,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            today: None,
            granted: None,
        }
    }

    /// Fix the reference day of the read window instead of the local date.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Restrict readable metrics; requests outside the set are refused.
    pub fn with_granted(mut self, granted: impl IntoIterator<Item = Metric>) -> Self {
        self.granted = Some(granted.into_iter().collect());
        self
    }

    fn check_granted(&self, config: &ExportConfig) -> Result<(), SourceError> {
        let Some(granted) = &self.granted else {
            return Ok(());
        };
        let missing: Vec<Metric> = config.metrics.difference(granted).copied().collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SourceError::PermissionDenied { missing })
        }
    }
}

impl HealthDataSource for JsonFileSource {
    fn read_by_day(&self, config: &ExportConfig) -> Result<DailyRecords, SourceError> {
        self.check_granted(config)?;
        let data = std::fs::read_to_string(&self.path)?;
        let mut records: DailyRecords =
            serde_json::from_str(&data).map_err(|e| SourceError::Parse(e.to_string()))?;
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());

        // malformed keys are kept so formatting can report them
        records.retain(|date, _| match parse_day(date) {
            Ok(day) => config.in_window(day, today),
            Err(_) => true,
        });
        for record in records.values_mut() {
            retain_metrics(record, config);
        }
        debug!(path = %self.path.display(), days = records.len(), "Read health data");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_metrics() {
        let config = ExportConfig::all_metrics(None);
        assert_eq!(config.categories(), Category::ALL.to_vec());
        assert_eq!(Metric::ALL.len(), 31);
    }

    #[test]
    fn auto_preset_keeps_resting_heart_rate() {
        let auto = ExportConfig::all_metrics(Some(30)).for_auto_export();
        assert_eq!(auto.days_back, Some(1));
        assert!(auto.includes(Metric::RestingHeartRate));
        assert!(!auto.includes(Metric::HeartRate));
        assert!(!auto.includes(Metric::BloodPressure));
        assert!(auto.includes(Metric::Steps));
    }

    #[test]
    fn window_is_inclusive() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let config = ExportConfig::new(Some(3), [Metric::Steps]);
        assert!(config.in_window(NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(), today));
        assert!(!config.in_window(NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(), today));
    }

    #[test]
    fn huge_window_has_no_lower_bound() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let config = ExportConfig::new(Some(u32::MAX), []);
        assert!(config.in_window(today, today));
        assert!(config.in_window(NaiveDate::MIN, today));
        assert!(!config.in_window(NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(), today));
        assert!(ExportConfig::new(None, []).in_window(NaiveDate::MIN, today));
    }
}
