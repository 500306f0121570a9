use std::path::Path;

use encoding_rs::Encoding;
use log::info;

use super::{SheetSource, WorksheetSelector};
use crate::{
    error::{LoadError, Result},
    io_utils,
    records::RawSheetPayload,
};

/// A delimited text file read as a sheet with one worksheet, titled by the
/// file stem.
#[derive(Debug, Clone)]
pub struct CsvSource {
    encoding: &'static Encoding,
}

impl CsvSource {
    pub fn new(input_encoding: Option<&str>) -> Result<Self> {
        Ok(Self {
            encoding: io_utils::resolve_encoding(input_encoding)?,
        })
    }
}

impl SheetSource for CsvSource {
    fn fetch(&self, sheet_id: &str, selector: &WorksheetSelector) -> Result<RawSheetPayload> {
        let path = Path::new(sheet_id);
        let title = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| LoadError::Sheet(format!("No file name in {path:?}")))?
            .to_string();
        selector.resolve(std::slice::from_ref(&title))?;

        let delimiter = io_utils::resolve_input_delimiter(path);
        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
        let mut grid = Vec::new();
        for (idx, record) in reader.byte_records().enumerate() {
            let record = record.map_err(|err| {
                LoadError::Sheet(format!("Reading row {} in {path:?}: {err}", idx + 1))
            })?;
            grid.push(io_utils::decode_record(&record, self.encoding)?);
        }
        info!("Read {} row(s) from {:?}", grid.len(), path);
        Ok(RawSheetPayload::from_grid(title, grid))
    }
}
