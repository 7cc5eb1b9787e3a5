//! A1 notation helpers.
//!
//! Columns are numbered from 1 and written in bijective base 26:
//! `1 -> A`, `26 -> Z`, `27 -> AA`, `702 -> ZZ`, `703 -> AAA`.

use std::str::FromStr;

use super::SpreadsheetError;

/// Letter name of the 1-indexed column `number`. Returns an empty string for 0.
pub fn column_letter(number: usize) -> String {
    let mut n = number;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Inverse of [`column_letter`]. Accepts upper or lower case.
pub fn column_number(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters.bytes().try_fold(0usize, |acc, b| {
        let b = b.to_ascii_uppercase();
        if !b.is_ascii_uppercase() {
            return None;
        }
        acc.checked_mul(26)?.checked_add((b - b'A') as usize + 1)
    })
}

/// Whole columns from `A` to the `width`-th column, e.g. `A:U`.
pub fn column_span(width: usize) -> String {
    format!("A:{}", column_letter(width.max(1)))
}

/// A single row from column `A` to the `width`-th column, e.g. `A5:U5`.
pub fn row_span(row: usize, width: usize) -> String {
    let last = column_letter(width.max(1));
    format!("A{row}:{last}{row}")
}

/// The first row of a sheet.
pub const HEADER_ROW: &str = "1:1";

/// Prefix `range` with a quoted sheet title: `'Body Measurements'!A:H`.
pub fn qualified(sheet: &str, range: &str) -> String {
    format!("'{}'!{}", sheet.replace('\'', "''"), range)
}

/// A parsed rectangular range. Bounds are 1-indexed and inclusive;
/// `None` means unbounded in that direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellRange {
    pub start_col: Option<usize>,
    pub end_col: Option<usize>,
    pub start_row: Option<usize>,
    pub end_row: Option<usize>,
}

impl CellRange {
    pub fn contains_row(&self, row: usize) -> bool {
        self.start_row.is_none_or(|s| row >= s) && self.end_row.is_none_or(|e| row <= e)
    }

    pub fn contains_col(&self, col: usize) -> bool {
        self.start_col.is_none_or(|s| col >= s) && self.end_col.is_none_or(|e| col <= e)
    }
}

fn parse_cell(part: &str) -> Option<(Option<usize>, Option<usize>)> {
    let split = part
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(part.len());
    let (letters, digits) = part.split_at(split);
    let col = if letters.is_empty() {
        None
    } else {
        Some(column_number(letters)?)
    };
    let row = if digits.is_empty() {
        None
    } else {
        match digits.parse::<usize>().ok()? {
            0 => return None,
            n => Some(n),
        }
    };
    if col.is_none() && row.is_none() {
        return None;
    }
    Some((col, row))
}

impl FromStr for CellRange {
    type Err = SpreadsheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SpreadsheetError::InvalidRange(s.to_string());
        let body = s.rsplit_once('!').map_or(s, |(_, r)| r).trim();
        let (first, second) = match body.split_once(':') {
            Some((a, b)) => (a, b),
            None => (body, body),
        };
        let (start_col, start_row) = parse_cell(first).ok_or_else(invalid)?;
        let (end_col, end_row) = parse_cell(second).ok_or_else(invalid)?;
        Ok(CellRange {
            start_col,
            end_col,
            start_row,
            end_row,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_for_known_columns() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(52), "AZ");
        assert_eq!(column_letter(702), "ZZ");
        assert_eq!(column_letter(703), "AAA");
        assert_eq!(column_letter(0), "");
    }

    #[test]
    fn numbers_reject_garbage() {
        assert_eq!(column_number(""), None);
        assert_eq!(column_number("A1"), None);
        assert_eq!(column_number("aa"), Some(27));
    }

    #[test]
    fn spans() {
        assert_eq!(column_span(21), "A:U");
        assert_eq!(row_span(5, 21), "A5:U5");
        assert_eq!(qualified("Body Measurements", "A:H"), "'Body Measurements'!A:H");
        assert_eq!(qualified("Bob's", "1:1"), "'Bob''s'!1:1");
    }

    #[test]
    fn parse_ranges() {
        let r: CellRange = "A:H".parse().unwrap();
        assert_eq!((r.start_col, r.end_col, r.start_row, r.end_row), (Some(1), Some(8), None, None));
        let r: CellRange = "1:1".parse().unwrap();
        assert_eq!((r.start_col, r.start_row, r.end_row), (None, Some(1), Some(1)));
        let r: CellRange = "A5:U5".parse().unwrap();
        assert!(r.contains_row(5) && !r.contains_row(6));
        assert!(r.contains_col(21) && !r.contains_col(22));
        let r: CellRange = "'Vitals'!B2".parse().unwrap();
        assert_eq!((r.start_col, r.end_col, r.start_row), (Some(2), Some(2), Some(2)));
        assert!("".parse::<CellRange>().is_err());
        assert!("A0:B0".parse::<CellRange>().is_err());
    }
}
