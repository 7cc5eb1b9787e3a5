use crate::core::format::Row;

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Combine one cell: the incoming value wins unless it is blank.
pub fn merge_field(existing: Option<&str>, incoming: Option<&str>) -> String {
    present(incoming)
        .or(present(existing))
        .unwrap_or_default()
        .to_string()
}

/// Merge two positionally aligned rows cell by cell.
///
/// The result is as long as the longer input. A blank or missing incoming
/// cell never replaces a populated existing one.
pub fn merge_row(existing: &[String], incoming: &[String]) -> Row {
    let width = existing.len().max(incoming.len());
    (0..width)
        .map(|i| {
            merge_field(
                existing.get(i).map(String::as_str),
                incoming.get(i).map(String::as_str),
            )
        })
        .collect()
}
