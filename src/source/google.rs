//! Hosted spreadsheet source using the Google Sheets v4 REST API.
//!
//! Requests are authorized with an OAuth bearer token read from the
//! credentials file. The file must carry an `access_token`; when it also
//! lists the granted `scope`s, those must cover every requested scope.

use std::path::{Path, PathBuf};

use log::{debug, info};
use reqwest::{
    StatusCode, Url,
    blocking::{Client, Response},
};
use serde::{Deserialize, de::DeserializeOwned};

use super::{SheetSource, WorksheetSelector};
use crate::{
    error::{LoadError, Result},
    io_utils,
    records::RawSheetPayload,
};

pub const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

pub const DEFAULT_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/spreadsheets",
];

pub const DEFAULT_CREDENTIALS_FILE: &str = "service-account.json";

/// Credential file and OAuth scopes used to read hosted sheets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetAuth {
    pub credentials_file: PathBuf,
    pub scopes: Vec<String>,
}

impl SheetAuth {
    pub fn new(credentials_file: impl Into<PathBuf>) -> Self {
        Self {
            credentials_file: credentials_file.into(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Reads the credentials file and returns the bearer token it holds.
    pub fn access_token(&self) -> Result<String> {
        let path = &self.credentials_file;
        let credentials: Credentials = io_utils::read_json_file(path).map_err(|message| {
            LoadError::Auth(format!("Reading credentials {path:?}: {message}"))
        })?;
        credentials.bearer_token(path, &self.scopes)
    }
}

#[derive(Debug, Deserialize)]
struct Credentials {
    #[serde(rename = "type")]
    kind: Option<String>,
    access_token: Option<String>,
    scope: Option<String>,
}

impl Credentials {
    fn bearer_token(self, path: &Path, scopes: &[String]) -> Result<String> {
        let token = match self.access_token.filter(|t| !t.trim().is_empty()) {
            Some(token) => token,
            None if self.kind.as_deref() == Some("service_account") => {
                return Err(LoadError::Auth(format!(
                    "{path:?} is a service-account key without an access_token; \
                     exchange it for an OAuth token first"
                )));
            }
            None => {
                return Err(LoadError::Auth(format!(
                    "{path:?} does not contain an access_token"
                )));
            }
        };
        if let Some(granted) = &self.scope {
            let granted: Vec<&str> = granted.split_whitespace().collect();
            let missing: Vec<&str> = scopes
                .iter()
                .map(String::as_str)
                .filter(|scope| !granted.contains(scope))
                .collect();
            if !missing.is_empty() {
                return Err(LoadError::Auth(format!(
                    "token in {path:?} lacks scope(s) {missing:?}"
                )));
            }
        }
        Ok(token)
    }
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
    #[serde(default)]
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

pub struct GoogleSheetsSource {
    client: Client,
    base_url: String,
    auth: SheetAuth,
}

impl GoogleSheetsSource {
    pub fn new(auth: SheetAuth) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("sheetload/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| LoadError::Sheet(format!("Creating HTTP client: {err}")))?;
        Ok(Self {
            client,
            base_url: SHEETS_API_URL.to_string(),
            auth,
        })
    }

    /// Points the source at another API root, e.g. a local stub.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let invalid = || LoadError::Sheet(format!("Invalid API URL {:?}", self.base_url));
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .extend(segments);
        Ok(url)
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url, token: &str) -> Result<T> {
        debug!("GET {url}");
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(token)
            .send()
            .map_err(|err| LoadError::Sheet(format!("GET {url} failed: {err}")))?;
        let response = check_status(response)?;
        response
            .json()
            .map_err(|err| LoadError::Sheet(format!("Decoding response from {url}: {err}")))
    }

    fn worksheet_titles(&self, sheet_id: &str, token: &str) -> Result<Vec<String>> {
        let mut url = self.url(&[sheet_id])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties(title,index)");
        let meta: SpreadsheetMeta = self.get_json(url, token)?;
        let mut properties: Vec<SheetProperties> =
            meta.sheets.into_iter().map(|s| s.properties).collect();
        properties.sort_by_key(|p| p.index);
        Ok(properties.into_iter().map(|p| p.title).collect())
    }
}

fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .unwrap_or_else(|_| "Unknown error".to_string());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(LoadError::Auth(format!("{status}: {message}")))
        }
        _ => Err(LoadError::Sheet(format!("{status}: {message}"))),
    }
}

/// A1 range covering a whole worksheet, quoted so any title is accepted.
fn worksheet_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// The API omits trailing empty cells; pad every row to the widest one.
fn values_to_grid(values: Vec<Vec<serde_json::Value>>) -> Vec<Vec<String>> {
    let width = values.iter().map(Vec::len).max().unwrap_or(0);
    values
        .into_iter()
        .map(|row| {
            let mut cells: Vec<String> = row.into_iter().map(cell_text).collect();
            cells.resize(width, String::new());
            cells
        })
        .collect()
}

impl SheetSource for GoogleSheetsSource {
    fn fetch(&self, sheet_id: &str, selector: &WorksheetSelector) -> Result<RawSheetPayload> {
        let token = self.auth.access_token()?;
        let titles = self.worksheet_titles(sheet_id, &token)?;
        let (position, title) = selector.resolve(&titles)?;
        debug!("Selected worksheet {position} ({title:?}) of sheet {sheet_id} by {selector}");

        let range = worksheet_range(title);
        let mut url = self.url(&[sheet_id, "values", &range])?;
        url.query_pairs_mut().append_pair("majorDimension", "ROWS");
        let values: ValueRange = self.get_json(url, &token)?;
        let grid = values_to_grid(values.values);
        info!(
            "Read {} row(s) from worksheet '{}' of sheet {}",
            grid.len(),
            title,
            sheet_id
        );
        Ok(RawSheetPayload::from_grid(title, grid))
    }
}
