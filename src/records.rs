//! Raw worksheet payloads to keyed records.

use log::debug;

use crate::{
    coerce::{CoercionSpec, coerce_records},
    data::{Record, zip_record},
    dates::DateParser,
    error::Result,
    keys::headers_to_keys,
    rows::{chop_at_blank, drop_empty_rows},
};

/// Header row and data rows exactly as a sheet source returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSheetPayload {
    pub title: String,
    pub headers: Vec<String>,
    pub data: Vec<Vec<String>>,
}

impl RawSheetPayload {
    /// Splits a grid into header row and data rows, truncating the headers at
    /// the first blank cell and dropping blank data rows.
    pub fn from_grid(title: impl Into<String>, mut grid: Vec<Vec<String>>) -> Self {
        if grid.is_empty() {
            return Self {
                title: title.into(),
                ..Self::default()
            };
        }
        let rest = grid.split_off(1);
        let header_row = grid.pop().unwrap_or_default();
        Self {
            title: title.into(),
            headers: chop_at_blank(&header_row),
            data: drop_empty_rows(rest),
        }
    }
}

/// Worksheet title plus one record per retained data row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRecords {
    pub title: String,
    pub data: Vec<Record>,
}

impl SheetRecords {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

pub fn build_records(
    payload: RawSheetPayload,
    coercions: Option<&CoercionSpec>,
    dates: &dyn DateParser,
) -> Result<SheetRecords> {
    let headers = chop_at_blank(&payload.headers);
    let keys = headers_to_keys(&headers);
    let rows = drop_empty_rows(payload.data);
    debug!(
        "Building {} record(s) from worksheet '{}' with keys {:?}",
        rows.len(),
        payload.title,
        keys
    );

    let mut data: Vec<Record> = rows.iter().map(|row| zip_record(&keys, row)).collect();
    if let Some(spec) = coercions.filter(|spec| !spec.is_empty()) {
        data = coerce_records(&data, spec, dates)?;
    }
    Ok(SheetRecords {
        title: payload.title,
        data,
    })
}
