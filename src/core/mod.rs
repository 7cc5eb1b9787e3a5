//! Core data model for per-day health records.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod format;
pub mod schema;

/// Per-day records keyed by ISO date (`YYYY-MM-DD`).
pub type DailyRecords = BTreeMap<String, DailyRecord>;

/// Errors raised while interpreting input records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// A day key is not a strict `YYYY-MM-DD` calendar date.
    MalformedDate(String),
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordError::MalformedDate(date) => {
                write!(f, "malformed date '{date}', expected YYYY-MM-DD")
            }
        }
    }
}

impl std::error::Error for RecordError {}

/// Parse a day key strictly as a zero padded `YYYY-MM-DD` date.
pub fn parse_day(date: &str) -> Result<NaiveDate, RecordError> {
    let malformed = || RecordError::MalformedDate(date.to_string());
    if date.len() != 10 {
        return Err(malformed());
    }
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| malformed())?;
    if parsed.format("%Y-%m-%d").to_string() != date {
        return Err(malformed());
    }
    Ok(parsed)
}

/// The six health-data domains exported as separate sheets or files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Activity,
    BodyMeasurements,
    CycleTracking,
    Nutrition,
    Sleep,
    Vitals,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Activity,
        Category::BodyMeasurements,
        Category::CycleTracking,
        Category::Nutrition,
        Category::Sleep,
        Category::Vitals,
    ];

    /// Title of the spreadsheet tab holding this category.
    pub fn sheet_name(self) -> &'static str {
        match self {
            Category::Activity => "Activity",
            Category::BodyMeasurements => "Body Measurements",
            Category::CycleTracking => "Cycle Tracking",
            Category::Nutrition => "Nutrition",
            Category::Sleep => "Sleep",
            Category::Vitals => "Vitals",
        }
    }

    /// Stem used for CSV file names.
    pub fn file_stem(self) -> &'static str {
        match self {
            Category::Activity => "Activity",
            Category::BodyMeasurements => "Body_Measurements",
            Category::CycleTracking => "Cycle_Tracking",
            Category::Nutrition => "Nutrition",
            Category::Sleep => "Sleep",
            Category::Vitals => "Vitals",
        }
    }

    /// Whether the column set is computed from the data of each run.
    pub fn is_dynamic(self) -> bool {
        matches!(self, Category::Nutrition | Category::CycleTracking)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.sheet_name())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "activity" => Ok(Category::Activity),
            "body_measurements" | "body" => Ok(Category::BodyMeasurements),
            "cycle_tracking" | "cycle" => Ok(Category::CycleTracking),
            "nutrition" => Ok(Category::Nutrition),
            "sleep" => Ok(Category::Sleep),
            "vitals" => Ok(Category::Vitals),
            _ => Err(format!("unknown category '{s}'")),
        }
    }
}

/// How rows of one category are bucketed into separate outputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    #[default]
    None,
    Month,
    Year,
}

impl SplitMode {
    /// Bucket key for `date`: `ALL`, `YYYY-MM` or `YYYY`.
    pub fn group_key(self, date: &str) -> Result<String, RecordError> {
        let day = parse_day(date)?;
        Ok(match self {
            SplitMode::None => "ALL".to_string(),
            SplitMode::Month => day.format("%Y-%m").to_string(),
            SplitMode::Year => day.format("%Y").to_string(),
        })
    }

    /// File name suffix for a group produced by this mode.
    pub fn file_suffix(self, key: &str) -> String {
        match self {
            SplitMode::None => String::new(),
            SplitMode::Month | SplitMode::Year => format!("_{key}"),
        }
    }
}

impl std::str::FromStr for SplitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "all" => Ok(SplitMode::None),
            "month" | "by-month" => Ok(SplitMode::Month),
            "year" | "by-year" => Ok(SplitMode::Year),
            other => Err(format!("unknown split mode '{other}'")),
        }
    }
}

/// A numeric measurement as delivered by the source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl From<i64> for Number {
    fn from(v: i64) -> Self {
        Number::Integer(v)
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Number::Float(v)
    }
}

/// Value of an open-ended field in a dynamic category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

/// Minimum, maximum and average of a sampled measurement over one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinMaxAvg {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
}

impl MinMaxAvg {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.avg.is_none()
    }
}

/// One exercise session within a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseEntry {
    pub start: String,
    pub name: String,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityDay {
    pub sources: Option<String>,
    pub steps: Option<Number>,
    pub distance_m: Option<Number>,
    pub elevation_m: Option<Number>,
    pub floors_climbed: Option<Number>,
    pub total_calories: Option<Number>,
    pub active_calories: Option<Number>,
    pub power_w: MinMaxAvg,
    pub speed_mps: MinMaxAvg,
    pub vo2_max: MinMaxAvg,
    pub wheelchair_pushes: Option<Number>,
    pub exercises: Vec<ExerciseEntry>,
}

impl ActivityDay {
    pub fn is_empty(&self) -> bool {
        self.sources.is_none()
            && self.steps.is_none()
            && self.distance_m.is_none()
            && self.elevation_m.is_none()
            && self.floors_climbed.is_none()
            && self.total_calories.is_none()
            && self.active_calories.is_none()
            && self.power_w.is_empty()
            && self.speed_mps.is_empty()
            && self.vo2_max.is_empty()
            && self.wheelchair_pushes.is_none()
            && self.exercises.is_empty()
    }
}

/// A single weighing with its own timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementEntry {
    pub date_time: String,
    #[serde(default)]
    pub weight_kg: Option<Number>,
    #[serde(default)]
    pub body_fat_pct: Option<Number>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyMeasurementDay {
    pub sources: Option<String>,
    pub bone_mass_kg: Option<Number>,
    pub height_m: Option<Number>,
    pub lean_body_mass_kg: Option<Number>,
    pub measurements: Vec<MeasurementEntry>,
}

impl BodyMeasurementDay {
    /// Body rows are produced per measurement, so a day without any is empty.
    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepDay {
    pub sources: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub light_minutes: Option<Number>,
    pub deep_minutes: Option<Number>,
    pub rem_minutes: Option<Number>,
    pub awake_minutes: Option<Number>,
}

impl SleepDay {
    pub fn is_empty(&self) -> bool {
        self.sources.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.light_minutes.is_none()
            && self.deep_minutes.is_none()
            && self.rem_minutes.is_none()
            && self.awake_minutes.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalsDay {
    pub sources: Option<String>,
    pub heart_rate: MinMaxAvg,
    pub heart_rate_variability: MinMaxAvg,
    pub oxygen_saturation: MinMaxAvg,
    pub respiratory_rate: MinMaxAvg,
    pub resting_heart_rate: MinMaxAvg,
    pub blood_pressure: Option<String>,
    pub blood_glucose: Option<Number>,
    pub body_temperature: Option<Number>,
}

impl VitalsDay {
    pub fn is_empty(&self) -> bool {
        self.sources.is_none()
            && self.heart_rate.is_empty()
            && self.heart_rate_variability.is_empty()
            && self.oxygen_saturation.is_empty()
            && self.respiratory_rate.is_empty()
            && self.resting_heart_rate.is_empty()
            && self.blood_pressure.is_none()
            && self.blood_glucose.is_none()
            && self.body_temperature.is_none()
    }
}

/// Nutrition and cycle tracking days carry user-defined fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicDay {
    pub sources: Option<String>,
    pub fields: BTreeMap<String, FieldValue>,
}

impl DynamicDay {
    pub fn is_empty(&self) -> bool {
        self.sources.is_none() && self.fields.is_empty()
    }
}

/// One calendar day of health data across all categories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyRecord {
    pub activity: Option<ActivityDay>,
    pub body_measurements: Option<BodyMeasurementDay>,
    pub cycle_tracking: Option<DynamicDay>,
    pub nutrition: Option<DynamicDay>,
    pub sleep: Option<SleepDay>,
    pub vitals: Option<VitalsDay>,
}

impl DailyRecord {
    /// Whether this day contributes rows to `category`.
    pub fn has(&self, category: Category) -> bool {
        match category {
            Category::Activity => self.activity.as_ref().is_some_and(|d| !d.is_empty()),
            Category::BodyMeasurements => self
                .body_measurements
                .as_ref()
                .is_some_and(|d| !d.is_empty()),
            Category::CycleTracking => self.cycle_tracking.as_ref().is_some_and(|d| !d.is_empty()),
            Category::Nutrition => self.nutrition.as_ref().is_some_and(|d| !d.is_empty()),
            Category::Sleep => self.sleep.as_ref().is_some_and(|d| !d.is_empty()),
            Category::Vitals => self.vitals.as_ref().is_some_and(|d| !d.is_empty()),
        }
    }

    /// The open-ended payload for a dynamic category.
    pub fn dynamic(&self, category: Category) -> Option<&DynamicDay> {
        match category {
            Category::Nutrition => self.nutrition.as_ref(),
            Category::CycleTracking => self.cycle_tracking.as_ref(),
            _ => None,
        }
    }
}

/// Categories that have at least one day of data.
pub fn categories_with_data(records: &DailyRecords) -> Vec<Category> {
    Category::ALL
        .into_iter()
        .filter(|c| records.values().any(|r| r.has(*c)))
        .collect()
}
