//! Local workbook source using calamine.

use calamine::{Data, Range, Reader, open_workbook_auto};
use chrono::{Duration, NaiveDate};
use log::{debug, info};

use super::{SheetSource, WorksheetSelector};
use crate::{
    data::{DATE_FORMAT, DATETIME_FORMAT},
    error::Result,
    records::RawSheetPayload,
};

/// Reads worksheets from a workbook file on disk; the sheet ID is its path.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkbookSource;

impl SheetSource for WorkbookSource {
    fn fetch(&self, sheet_id: &str, selector: &WorksheetSelector) -> Result<RawSheetPayload> {
        let mut workbook = open_workbook_auto(sheet_id)?;
        let titles = workbook.sheet_names();
        let (position, title) = selector.resolve(&titles)?;
        debug!("Selected worksheet {position} ({title:?}) of {sheet_id:?} by {selector}");

        let range = workbook.worksheet_range(title)?;
        let grid = range_to_grid(&range);
        info!(
            "Read {} row(s) from worksheet '{}' in {:?}",
            grid.len(),
            title,
            sheet_id
        );
        Ok(RawSheetPayload::from_grid(title, grid))
    }
}

/// Renders the used area as strings, anchored at A1 so leading blank rows and
/// columns keep their positions.
fn range_to_grid(range: &Range<Data>) -> Vec<Vec<String>> {
    let Some((end_row, end_col)) = range.end() else {
        return Vec::new();
    };
    (0..=end_row)
        .map(|row| {
            (0..=end_col)
                .map(|col| {
                    range
                        .get_value((row, col))
                        .map(cell_to_string)
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect()
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{f:.0}")
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string().to_uppercase(),
        Data::Error(e) => e.to_string(),
        Data::DateTime(dt) if dt.is_datetime() => excel_serial_to_string(dt.as_f64()),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Converts a 1900-system serial day number to `YYYY-MM-DD[ HH:MM:SS]`.
fn excel_serial_to_string(serial: f64) -> String {
    let Some(epoch) = NaiveDate::from_ymd_opt(1899, 12, 30) else {
        return serial.to_string();
    };
    let millis = (serial * 86_400_000.0).round() as i64;
    let Some(stamp) = epoch
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.checked_add_signed(Duration::milliseconds(millis)))
    else {
        return serial.to_string();
    };
    if serial.fract() == 0.0 {
        stamp.format(DATE_FORMAT).to_string()
    } else {
        stamp.format(DATETIME_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_to_string_renders_scalars() {
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::String("hi".into())), "hi");
        assert_eq!(cell_to_string(&Data::Int(42)), "42");
        assert_eq!(cell_to_string(&Data::Float(10.0)), "10");
        assert_eq!(cell_to_string(&Data::Float(3.25)), "3.25");
        assert_eq!(cell_to_string(&Data::Bool(true)), "TRUE");
    }

    #[test]
    fn serial_dates_convert_to_iso() {
        assert_eq!(excel_serial_to_string(45356.0), "2024-03-05");
        assert_eq!(excel_serial_to_string(45356.5), "2024-03-05 12:00:00");
    }

    #[test]
    fn grid_is_anchored_at_a1() {
        let mut range = Range::new((1, 1), (2, 2));
        range.set_value((1, 1), Data::String("Name".into()));
        range.set_value((2, 2), Data::Int(7));
        let grid = range_to_grid(&range);
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[0], vec!["", "", ""]);
        assert_eq!(grid[1], vec!["", "Name", ""]);
        assert_eq!(grid[2], vec!["", "", "7"]);
    }

    #[test]
    fn empty_range_yields_empty_grid() {
        let range: Range<Data> = Range::empty();
        assert!(range_to_grid(&range).is_empty());
    }
}
