//! Logical row identity and lookups of rows already in a sheet.

use std::collections::HashMap;

use crate::core::Category;
use crate::core::format::{Header, Row};
use crate::core::schema::{DATE, DATE_TIME, EXERCISE_START};

/// Key component used for activity days without an exercise entry.
pub const NO_EXERCISE: &str = "NO_EXERCISE";

/// How the logical key of a row is derived from named columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// The value of one column.
    Column(&'static str),
    /// `date|start`, with [`NO_EXERCISE`] standing in for a blank start.
    Composite {
        date: &'static str,
        start: &'static str,
    },
}

impl KeyStrategy {
    pub fn for_category(category: Category) -> Self {
        match category {
            Category::Activity => KeyStrategy::Composite {
                date: DATE,
                start: EXERCISE_START,
            },
            Category::BodyMeasurements => KeyStrategy::Column(DATE_TIME),
            _ => KeyStrategy::Column(DATE),
        }
    }

    /// Names of the columns the key is built from.
    pub fn columns(&self) -> Vec<&'static str> {
        match *self {
            KeyStrategy::Column(name) => vec![name],
            KeyStrategy::Composite { date, start } => vec![date, start],
        }
    }

    /// Locate the key columns in `header`, or list the ones it lacks.
    pub fn resolve(&self, header: &Header) -> Result<ResolvedKey, Vec<String>> {
        let mut positions = Vec::new();
        let mut missing = Vec::new();
        for name in self.columns() {
            match header.position(name) {
                Some(pos) => positions.push(pos),
                None => missing.push(name.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(missing);
        }
        Ok(ResolvedKey {
            composite: matches!(self, KeyStrategy::Composite { .. }),
            positions,
        })
    }
}

/// A key strategy bound to column positions of one concrete header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    composite: bool,
    positions: Vec<usize>,
}

impl ResolvedKey {
    /// Number of leading columns that must be read to see every key cell.
    pub fn span(&self) -> usize {
        self.positions.iter().max().map_or(0, |p| p + 1)
    }

    /// Logical key of `row`; `None` when the leading key cell is blank.
    pub fn key_of(&self, row: &[String]) -> Option<String> {
        let cell = |pos: usize| row.get(pos).map(|c| c.trim()).unwrap_or_default();
        let first = cell(*self.positions.first()?);
        if first.is_empty() {
            return None;
        }
        if !self.composite {
            return Some(first.to_string());
        }
        let start = self.positions.get(1).map(|p| cell(*p)).unwrap_or_default();
        let start = if start.is_empty() { NO_EXERCISE } else { start };
        Some(format!("{first}|{start}"))
    }
}

/// What happens to a candidate row whose key already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    Skip,
    Merge,
}

impl WritePolicy {
    pub fn for_category(category: Category) -> Self {
        match category {
            Category::Vitals => WritePolicy::Merge,
            _ => WritePolicy::Skip,
        }
    }
}

/// Map each key found below the header row to its 1-indexed sheet row.
///
/// `rows` must start at sheet row 1. When a key occurs more than once the
/// last occurrence wins.
pub fn existing_keys(rows: &[Row], key: &ResolvedKey) -> HashMap<String, usize> {
    rows.iter()
        .enumerate()
        .skip(1)
        .filter_map(|(idx, row)| key.key_of(row).map(|k| (k, idx + 1)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::fixed_header;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn activity_key_uses_start_or_sentinel() {
        let header = Header::new(fixed_header(Category::Activity).unwrap());
        let key = KeyStrategy::for_category(Category::Activity)
            .resolve(&header)
            .unwrap();
        assert_eq!(key.span(), 20);
        let mut cells = vec![String::new(); 22];
        cells[0] = "2024-01-01".into();
        assert_eq!(key.key_of(&cells).as_deref(), Some("2024-01-01|NO_EXERCISE"));
        cells[19] = "2024-01-01T07:00".into();
        assert_eq!(key.key_of(&cells).as_deref(), Some("2024-01-01|2024-01-01T07:00"));
        // a truncated row read back from the store still has a key
        assert_eq!(key.key_of(&row(&["2024-01-02"])).as_deref(), Some("2024-01-02|NO_EXERCISE"));
    }

    #[test]
    fn missing_key_columns_are_listed() {
        let header = Header::new(vec!["Date".into(), "Steps".into()]);
        let missing = KeyStrategy::for_category(Category::Activity)
            .resolve(&header)
            .unwrap_err();
        assert_eq!(missing, vec![EXERCISE_START.to_string()]);
    }

    #[test]
    fn last_occurrence_wins() {
        let key = KeyStrategy::Column(DATE)
            .resolve(&Header::new(vec!["Date".into()]))
            .unwrap();
        let rows = vec![
            row(&["Date"]),
            row(&["2024-01-01"]),
            row(&[""]),
            row(&["2024-01-01"]),
        ];
        let keys = existing_keys(&rows, &key);
        assert_eq!(keys.len(), 1);
        assert_eq!(keys["2024-01-01"], 4);
    }
}
