//! Shapes per-day records into header-aligned rows per category.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::schema::{self, Column};
use super::{Category, DailyRecord, DailyRecords, FieldValue, Number, RecordError, SplitMode};

/// One output row, positionally aligned with a [`Header`].
pub type Row = Vec<String>;

/// Render a number: floats with two decimals, integers verbatim.
pub fn format_number(value: Number) -> String {
    match value {
        Number::Integer(v) => v.to_string(),
        Number::Float(v) => format!("{v:.2}"),
    }
}

pub fn number_cell(value: Option<Number>) -> String {
    value.map(format_number).unwrap_or_default()
}

pub fn float_cell(value: Option<f64>) -> String {
    value.map(|v| format_number(Number::Float(v))).unwrap_or_default()
}

pub fn text_cell(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

pub fn field_cell(value: Option<&FieldValue>) -> String {
    match value {
        Some(FieldValue::Integer(v)) => format_number(Number::Integer(*v)),
        Some(FieldValue::Float(v)) => format_number(Number::Float(*v)),
        Some(FieldValue::Text(v)) => v.clone(),
        None => String::new(),
    }
}

fn render<T>(columns: &[Column<T>], value: &T) -> impl Iterator<Item = String> {
    columns.iter().map(move |(_, cell)| cell(value))
}

/// Ordered column names of one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    columns: Vec<String>,
}

impl Header {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Zero-based index of the column titled `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn to_row(&self) -> Row {
        self.columns.clone()
    }
}

/// Rows that land in the same split bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct RowGroup {
    pub key: String,
    pub rows: Vec<Row>,
}

/// Formatting output for one category.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedCategory {
    pub category: Category,
    pub split: SplitMode,
    pub header: Header,
    /// Groups in ascending key order.
    pub groups: Vec<RowGroup>,
}

impl FormattedCategory {
    pub fn row_count(&self) -> usize {
        self.groups.iter().map(|g| g.rows.len()).sum()
    }

    /// All rows across groups, still in ascending date order.
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.groups.iter().flat_map(|g| g.rows.iter())
    }

    /// File name for a group, e.g. `Vitals.csv` or `Vitals_2024-01.csv`.
    pub fn file_name(&self, group: &RowGroup) -> String {
        format!(
            "{}{}.csv",
            self.category.file_stem(),
            self.split.file_suffix(&group.key)
        )
    }
}

/// Outcome of formatting one selected category.
pub type CategoryResult = (Category, Result<FormattedCategory, RecordError>);

/// Pure converter from [`DailyRecords`] to category rows.
#[derive(Debug, Clone)]
pub struct RecordFormatter {
    timezone: String,
}

impl RecordFormatter {
    /// Create a formatter that labels rows with `timezone`.
    pub fn new(timezone: impl Into<String>) -> Self {
        Self {
            timezone: timezone.into(),
        }
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    /// Header for `category` in a run over `records`.
    ///
    /// Dynamic categories use the sorted union of field names over every
    /// day, so all split groups of one run share the same header.
    pub fn header(&self, records: &DailyRecords, category: Category) -> Header {
        match schema::fixed_header(category) {
            Some(columns) => Header::new(columns),
            None => Header::new(schema::dynamic_header(dynamic_fields(records, category))),
        }
    }

    /// Format one category, returning `None` when no day has data for it.
    pub fn format_category(
        &self,
        records: &DailyRecords,
        category: Category,
        split: SplitMode,
    ) -> Result<Option<FormattedCategory>, RecordError> {
        if !records.values().any(|r| r.has(category)) {
            return Ok(None);
        }
        let header = self.header(records, category);
        let dynamic_columns: Vec<String> = if category.is_dynamic() {
            header.columns()[3..].to_vec()
        } else {
            Vec::new()
        };

        let mut groups: BTreeMap<String, Vec<Row>> = BTreeMap::new();
        for (date, record) in records {
            if !record.has(category) {
                continue;
            }
            let key = split.group_key(date)?;
            let rows = self.day_rows(date, record, category, &dynamic_columns);
            groups.entry(key).or_default().extend(rows);
        }

        let formatted = FormattedCategory {
            category,
            split,
            header,
            groups: groups
                .into_iter()
                .map(|(key, rows)| RowGroup { key, rows })
                .collect(),
        };
        debug!(
            category = %category,
            groups = formatted.groups.len(),
            rows = formatted.row_count(),
            "Formatted category"
        );
        Ok(Some(formatted))
    }

    /// Format every selected category that has data, each independently.
    pub fn format_selected(
        &self,
        records: &DailyRecords,
        categories: &[Category],
        split: SplitMode,
    ) -> Vec<CategoryResult> {
        let mut out = Vec::new();
        for category in Category::ALL {
            if !categories.contains(&category) {
                continue;
            }
            match self.format_category(records, category, split) {
                Ok(Some(formatted)) => out.push((category, Ok(formatted))),
                Ok(None) => {}
                Err(e) => out.push((category, Err(e))),
            }
        }
        out
    }

    fn day_rows(
        &self,
        date: &str,
        record: &DailyRecord,
        category: Category,
        dynamic_columns: &[String],
    ) -> Vec<Row> {
        let lead = |first: &str, sources: Option<&str>| -> Row {
            vec![
                first.to_string(),
                text_cell(sources),
                self.timezone.clone(),
            ]
        };

        match category {
            Category::Activity => {
                let Some(day) = record.activity.as_ref() else {
                    return Vec::new();
                };
                let mut base = lead(date, day.sources.as_deref());
                base.extend(render(schema::ACTIVITY_COLUMNS, day));
                if day.exercises.is_empty() {
                    let mut row = base;
                    row.extend(schema::EXERCISE_COLUMNS.iter().map(|_| String::new()));
                    return vec![row];
                }
                day.exercises
                    .iter()
                    .map(|exercise| {
                        let mut row = base.clone();
                        row.extend(render(schema::EXERCISE_COLUMNS, exercise));
                        row
                    })
                    .collect()
            }
            Category::BodyMeasurements => {
                let Some(day) = record.body_measurements.as_ref() else {
                    return Vec::new();
                };
                let day_cells: Vec<String> = render(schema::BODY_DAY_COLUMNS, day).collect();
                day.measurements
                    .iter()
                    .map(|m| {
                        let mut row = lead(&m.date_time, day.sources.as_deref());
                        row.extend(render(schema::MEASUREMENT_COLUMNS, m));
                        row.extend(day_cells.iter().cloned());
                        row
                    })
                    .collect()
            }
            Category::Sleep => record
                .sleep
                .as_ref()
                .map(|day| {
                    let mut row = lead(date, day.sources.as_deref());
                    row.extend(render(schema::SLEEP_COLUMNS, day));
                    row
                })
                .into_iter()
                .collect(),
            Category::Vitals => record
                .vitals
                .as_ref()
                .map(|day| {
                    let mut row = lead(date, day.sources.as_deref());
                    row.extend(render(schema::VITALS_COLUMNS, day));
                    row
                })
                .into_iter()
                .collect(),
            Category::Nutrition | Category::CycleTracking => record
                .dynamic(category)
                .map(|day| {
                    let mut row = lead(date, day.sources.as_deref());
                    row.extend(dynamic_columns.iter().map(|c| field_cell(day.fields.get(c))));
                    row
                })
                .into_iter()
                .collect(),
        }
    }
}

impl Default for RecordFormatter {
    fn default() -> Self {
        Self::new("UTC")
    }
}

/// Sorted union of field names of a dynamic category across all days.
fn dynamic_fields(records: &DailyRecords, category: Category) -> BTreeSet<String> {
    records
        .values()
        .filter_map(|r| r.dynamic(category))
        .flat_map(|d| d.fields.keys().cloned())
        .collect()
}
