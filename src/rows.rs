//! Row shaping helpers.
//!
//! Provides [`chop_at_blank()`] which trims a header row to the columns that
//! precede its first empty cell, and [`drop_empty_rows()`] which removes data
//! rows with no visible content.

/// Returns the prefix of `row` before its first empty cell.
pub fn chop_at_blank(row: &[String]) -> Vec<String> {
    row.iter()
        .take_while(|cell| !cell.is_empty())
        .cloned()
        .collect()
}

pub fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

/// Removes rows whose cells are all empty after trimming. Kept rows are
/// returned untouched and in their original order.
pub fn drop_empty_rows(rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    rows.into_iter().filter(|row| !is_blank_row(row)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn chop_at_blank_stops_at_first_empty_cell() {
        assert_eq!(
            chop_at_blank(&row(&["id", "name", "", "notes"])),
            row(&["id", "name"])
        );
        assert_eq!(chop_at_blank(&row(&["id", "name"])), row(&["id", "name"]));
        assert!(chop_at_blank(&row(&["", "name"])).is_empty());
        assert!(chop_at_blank(&[]).is_empty());
    }

    #[test]
    fn chop_at_blank_keeps_whitespace_headers() {
        assert_eq!(chop_at_blank(&row(&["id", " ", ""])), row(&["id", " "]));
    }

    #[test]
    fn drop_empty_rows_keeps_original_content() {
        let rows = vec![
            row(&["", "  ", "\t"]),
            row(&[" Alice ", ""]),
            row(&[]),
            row(&["", "", "x"]),
        ];
        let kept = drop_empty_rows(rows);
        assert_eq!(kept, vec![row(&[" Alice ", ""]), row(&["", "", "x"])]);
    }
}
