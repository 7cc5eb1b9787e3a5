//! Column layouts for every exported category.
//!
//! Fixed categories map typed fields to named columns through small tables;
//! the leading `Date`, `Source(s)` and `Timezone` columns are shared by all
//! layouts and filled in by the formatter.

use super::format::{float_cell, number_cell, text_cell};
use super::{
    ActivityDay, BodyMeasurementDay, Category, ExerciseEntry, MeasurementEntry, SleepDay,
    VitalsDay,
};

pub const DATE: &str = "Date";
pub const DATE_TIME: &str = "Date/Time";
pub const SOURCES: &str = "Source(s)";
pub const TIMEZONE: &str = "Timezone";
pub const EXERCISE_START: &str = "Start Date/Time";
pub const EXERCISE_NAME: &str = "Exercise Name";
pub const EXERCISE_DURATION: &str = "Duration (min)";

/// Column title paired with the function that renders its cell.
pub type Column<T> = (&'static str, fn(&T) -> String);

pub const ACTIVITY_COLUMNS: &[Column<ActivityDay>] = &[
    ("Steps", |d| number_cell(d.steps)),
    ("Distance (m)", |d| number_cell(d.distance_m)),
    ("Elevation (m)", |d| number_cell(d.elevation_m)),
    ("Floors climbed", |d| number_cell(d.floors_climbed)),
    ("Total Calories (kcal)", |d| number_cell(d.total_calories)),
    ("Active Calories (kcal)", |d| number_cell(d.active_calories)),
    ("Power min (W)", |d| float_cell(d.power_w.min)),
    ("Power max (W)", |d| float_cell(d.power_w.max)),
    ("Power avg (W)", |d| float_cell(d.power_w.avg)),
    ("Speed min (m/s)", |d| float_cell(d.speed_mps.min)),
    ("Speed max (m/s)", |d| float_cell(d.speed_mps.max)),
    ("Speed avg (m/s)", |d| float_cell(d.speed_mps.avg)),
    ("VO2 max min (ml/min/kg)", |d| float_cell(d.vo2_max.min)),
    ("VO2 max max (ml/min/kg)", |d| float_cell(d.vo2_max.max)),
    ("VO2 max avg (ml/min/kg)", |d| float_cell(d.vo2_max.avg)),
    ("Wheelchair pushes", |d| number_cell(d.wheelchair_pushes)),
];

pub const EXERCISE_COLUMNS: &[Column<ExerciseEntry>] = &[
    (EXERCISE_START, |e| e.start.clone()),
    (EXERCISE_NAME, |e| e.name.clone()),
    (EXERCISE_DURATION, |e| e.duration_minutes.to_string()),
];

pub const MEASUREMENT_COLUMNS: &[Column<MeasurementEntry>] = &[
    ("Weight (kg)", |m| number_cell(m.weight_kg)),
    ("Body Fat (%)", |m| number_cell(m.body_fat_pct)),
];

/// Day-level body fields repeated on every measurement row.
pub const BODY_DAY_COLUMNS: &[Column<BodyMeasurementDay>] = &[
    ("Bone mass (kg)", |d| number_cell(d.bone_mass_kg)),
    ("Height (m)", |d| number_cell(d.height_m)),
    ("Lean body mass (kg)", |d| number_cell(d.lean_body_mass_kg)),
];

pub const SLEEP_COLUMNS: &[Column<SleepDay>] = &[
    ("Start Time", |d| text_cell(d.start_time.as_deref())),
    ("End Time", |d| text_cell(d.end_time.as_deref())),
    ("Light Sleep (min)", |d| number_cell(d.light_minutes)),
    ("Deep Sleep (min)", |d| number_cell(d.deep_minutes)),
    ("REM Sleep (min)", |d| number_cell(d.rem_minutes)),
    ("Awake (min)", |d| number_cell(d.awake_minutes)),
];

pub const VITALS_COLUMNS: &[Column<VitalsDay>] = &[
    ("Heart rate min (bpm)", |d| float_cell(d.heart_rate.min)),
    ("Heart rate max (bpm)", |d| float_cell(d.heart_rate.max)),
    ("Heart rate avg (bpm)", |d| float_cell(d.heart_rate.avg)),
    ("Heart rate variability min (ms)", |d| {
        float_cell(d.heart_rate_variability.min)
    }),
    ("Heart rate variability max (ms)", |d| {
        float_cell(d.heart_rate_variability.max)
    }),
    ("Heart rate variability avg (ms)", |d| {
        float_cell(d.heart_rate_variability.avg)
    }),
    ("Oxygen saturation min (%)", |d| float_cell(d.oxygen_saturation.min)),
    ("Oxygen saturation max (%)", |d| float_cell(d.oxygen_saturation.max)),
    ("Oxygen saturation avg (%)", |d| float_cell(d.oxygen_saturation.avg)),
    ("Respiratory rate min (breaths/min)", |d| {
        float_cell(d.respiratory_rate.min)
    }),
    ("Respiratory rate max (breaths/min)", |d| {
        float_cell(d.respiratory_rate.max)
    }),
    ("Respiratory rate avg (breaths/min)", |d| {
        float_cell(d.respiratory_rate.avg)
    }),
    ("Resting heart rate min (bpm)", |d| float_cell(d.resting_heart_rate.min)),
    ("Resting heart rate max (bpm)", |d| float_cell(d.resting_heart_rate.max)),
    ("Resting heart rate avg (bpm)", |d| float_cell(d.resting_heart_rate.avg)),
    ("Blood pressure (mmHg)", |d| text_cell(d.blood_pressure.as_deref())),
    ("Blood glucose (mmol/L)", |d| number_cell(d.blood_glucose)),
    ("Body temperature (°C)", |d| number_cell(d.body_temperature)),
];

fn titles<T>(columns: &[Column<T>]) -> impl Iterator<Item = &'static str> {
    columns.iter().map(|(title, _)| *title)
}

/// Name of the first column, which holds the row's day or timestamp.
pub fn leading_column(category: Category) -> &'static str {
    match category {
        Category::BodyMeasurements => DATE_TIME,
        _ => DATE,
    }
}

/// Hardcoded header of a fixed-schema category; `None` for dynamic ones.
pub fn fixed_header(category: Category) -> Option<Vec<String>> {
    let lead = [leading_column(category), SOURCES, TIMEZONE].into_iter();
    let columns: Vec<&str> = match category {
        Category::Activity => lead
            .chain(titles(ACTIVITY_COLUMNS))
            .chain(titles(EXERCISE_COLUMNS))
            .collect(),
        Category::BodyMeasurements => lead
            .chain(titles(MEASUREMENT_COLUMNS))
            .chain(titles(BODY_DAY_COLUMNS))
            .collect(),
        Category::Sleep => lead.chain(titles(SLEEP_COLUMNS)).collect(),
        Category::Vitals => lead.chain(titles(VITALS_COLUMNS)).collect(),
        Category::Nutrition | Category::CycleTracking => return None,
    };
    Some(columns.into_iter().map(String::from).collect())
}

/// Header of a dynamic category given its sorted field names.
pub fn dynamic_header<I>(fields: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    [DATE, SOURCES, TIMEZONE]
        .into_iter()
        .map(String::from)
        .chain(fields)
        .collect()
}
