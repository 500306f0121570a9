//! Sheet sources.
//!
//! A [`SheetSource`] turns a sheet identifier and a [`WorksheetSelector`] into
//! a [`RawSheetPayload`]. Three sources exist:
//!
//! - [`WorkbookSource`]: local `.xlsx`, `.xlsm`, `.xlsb`, `.xls` and `.ods` files.
//! - [`CsvSource`]: local `.csv` and `.tsv` files holding a single worksheet.
//! - [`GoogleSheetsSource`]: hosted spreadsheets addressed by document ID.
//!
//! [`open_source()`] picks one from the shape of the identifier.

mod delimited;
mod google;
mod workbook;

use std::{fmt, path::Path};

use crate::{
    error::{LoadError, Result},
    records::RawSheetPayload,
};

pub use self::delimited::CsvSource;
pub use self::google::{DEFAULT_CREDENTIALS_FILE, DEFAULT_SCOPES, GoogleSheetsSource, SheetAuth};
pub use self::workbook::WorkbookSource;

pub const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];
pub const DELIMITED_EXTENSIONS: &[&str] = &["csv", "tsv"];

pub trait SheetSource {
    fn fetch(&self, sheet_id: &str, selector: &WorksheetSelector) -> Result<RawSheetPayload>;
}

/// Picks a worksheet inside a sheet by zero-based position or by title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorksheetSelector {
    Index(usize),
    Title(String),
}

impl Default for WorksheetSelector {
    fn default() -> Self {
        WorksheetSelector::Index(0)
    }
}

impl WorksheetSelector {
    /// Accepts a non-negative integer or a string; anything else is rejected.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::String(title) => Ok(WorksheetSelector::Title(title.clone())),
            serde_json::Value::Number(number) => number
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .map(WorksheetSelector::Index)
                .ok_or_else(|| {
                    LoadError::InvalidSelector(format!("{number} is not a worksheet position"))
                }),
            other => Err(LoadError::InvalidSelector(format!(
                "expected a worksheet position or title, got {other}"
            ))),
        }
    }

    /// An absent or empty title selects the first worksheet.
    pub fn from_title(title: Option<&str>) -> Self {
        match title {
            Some(title) if !title.is_empty() => WorksheetSelector::Title(title.to_string()),
            _ => WorksheetSelector::default(),
        }
    }

    /// Resolves the selector against worksheet titles in sheet order.
    pub fn resolve<'a>(&self, titles: &'a [String]) -> Result<(usize, &'a str)> {
        let position = match self {
            WorksheetSelector::Index(index) => (*index < titles.len()).then_some(*index),
            WorksheetSelector::Title(title) => titles.iter().position(|t| t == title),
        };
        position
            .map(|idx| (idx, titles[idx].as_str()))
            .ok_or_else(|| {
                LoadError::InvalidSelector(format!(
                    "no worksheet matches {self} (available: {titles:?})"
                ))
            })
    }
}

impl fmt::Display for WorksheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorksheetSelector::Index(index) => write!(f, "position {index}"),
            WorksheetSelector::Title(title) => write!(f, "title {title:?}"),
        }
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

/// Local files with a known extension are read directly; any other
/// identifier is treated as a hosted spreadsheet ID.
pub fn open_source(
    sheet_id: &str,
    auth: &SheetAuth,
    input_encoding: Option<&str>,
) -> Result<Box<dyn SheetSource>> {
    let path = Path::new(sheet_id);
    if path.is_file() && has_extension(path, WORKBOOK_EXTENSIONS) {
        return Ok(Box::new(WorkbookSource));
    }
    if path.is_file() && has_extension(path, DELIMITED_EXTENSIONS) {
        return Ok(Box::new(CsvSource::new(input_encoding)?));
    }
    Ok(Box::new(GoogleSheetsSource::new(auth.clone())?))
}
