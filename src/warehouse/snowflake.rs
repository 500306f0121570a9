//! Snowflake connector over the SQL REST API (`/api/v2/statements`).
//!
//! Each statement is submitted as its own request with the database, schema,
//! warehouse and role from the config. Statements still running when the
//! request returns (HTTP 202) are polled until they finish.

use std::{thread, time::Duration};

use log::{debug, info};
use reqwest::{
    StatusCode,
    blocking::{Client, RequestBuilder, Response},
};
use serde::{Deserialize, Serialize};

use super::{Connector, DbConfig, Session};
use crate::error::{LoadError, Result};

const STATEMENTS_PATH: &str = "/api/v2/statements";
const POLL_INTERVAL: Duration = Duration::from_millis(500);

fn default_token_type() -> String {
    "OAUTH".to_string()
}

/// Connection parameters recognised in the config file. Unknown keys are
/// ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct SnowflakeSettings {
    pub account: String,
    pub token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub warehouse: Option<String>,
    pub role: Option<String>,
    /// Overrides `https://<account>.snowflakecomputing.com`.
    pub host: Option<String>,
}

impl SnowflakeSettings {
    pub fn base_url(&self) -> String {
        match &self.host {
            Some(host) if host.contains("://") => host.trim_end_matches('/').to_string(),
            Some(host) => format!("https://{}", host.trim_end_matches('/')),
            None => format!("https://{}.snowflakecomputing.com", self.account),
        }
    }
}

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warehouse: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementResponse {
    statement_handle: Option<String>,
    statement_status_url: Option<String>,
    message: Option<String>,
    code: Option<String>,
    sql_state: Option<String>,
}

impl StatementResponse {
    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(code) = &self.code {
            parts.push(format!("code {code}"));
        }
        if let Some(state) = &self.sql_state {
            parts.push(format!("SQL state {state}"));
        }
        let message = self.message.as_deref().unwrap_or("no message");
        if parts.is_empty() {
            message.to_string()
        } else {
            format!("{message} ({})", parts.join(", "))
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnowflakeConnector {
    client: Client,
}

impl SnowflakeConnector {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("sheetload/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| LoadError::Warehouse(format!("Creating HTTP client: {err}")))?;
        Ok(Self { client })
    }
}

impl Connector for SnowflakeConnector {
    type Session = SnowflakeSession;

    fn connect(&self, config: &DbConfig) -> Result<SnowflakeSession> {
        let settings: SnowflakeSettings = config.settings()?;
        let token = settings
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                LoadError::Warehouse(
                    "config has no `token`; the SQL API needs an OAuth or key-pair JWT token"
                        .to_string(),
                )
            })?;
        let base_url = settings.base_url();
        info!(
            "Connecting to Snowflake account '{}' at {}",
            settings.account, base_url
        );
        Ok(SnowflakeSession {
            client: self.client.clone(),
            base_url,
            token,
            settings,
            executed: 0,
        })
    }
}

pub struct SnowflakeSession {
    client: Client,
    base_url: String,
    token: String,
    settings: SnowflakeSettings,
    executed: usize,
}

impl SnowflakeSession {
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("X-Snowflake-Authorization-Token-Type", &self.settings.token_type)
            .header("Accept", "application/json")
    }

    fn read_response(response: Response) -> Result<(StatusCode, StatementResponse)> {
        let status = response.status();
        let body = response
            .text()
            .map_err(|err| LoadError::Warehouse(format!("Reading response: {err}")))?;
        let parsed = serde_json::from_str(&body).unwrap_or_else(|_| StatementResponse {
            message: Some(body),
            ..StatementResponse::default()
        });
        Ok((status, parsed))
    }

    fn wait_for(&self, mut pending: StatementResponse) -> Result<StatementResponse> {
        loop {
            let Some(status_url) = pending.statement_status_url.clone() else {
                return Err(LoadError::Warehouse(format!(
                    "statement {} still running but no status URL was returned",
                    pending.statement_handle.as_deref().unwrap_or("<unknown>")
                )));
            };
            thread::sleep(POLL_INTERVAL);
            let url = format!("{}{}", self.base_url, status_url);
            debug!("Polling {url}");
            let response = self
                .authorized(self.client.get(&url))
                .send()
                .map_err(|err| LoadError::Warehouse(format!("GET {url} failed: {err}")))?;
            let (status, body) = Self::read_response(response)?;
            match status {
                StatusCode::OK => return Ok(body),
                StatusCode::ACCEPTED => {
                    pending = StatementResponse {
                        statement_status_url: body.statement_status_url.or(Some(status_url)),
                        ..body
                    };
                }
                other => {
                    return Err(LoadError::Warehouse(format!("{other}: {}", body.describe())));
                }
            }
        }
    }
}

impl Session for SnowflakeSession {
    fn execute(&mut self, statement: &str) -> Result<()> {
        let request = StatementRequest {
            statement,
            database: self.settings.database.as_deref(),
            schema: self.settings.schema.as_deref(),
            warehouse: self.settings.warehouse.as_deref(),
            role: self.settings.role.as_deref(),
        };
        let url = format!("{}{}", self.base_url, STATEMENTS_PATH);
        let response = self
            .authorized(self.client.post(&url))
            .json(&request)
            .send()
            .map_err(|err| LoadError::Warehouse(format!("POST {url} failed: {err}")))?;
        let (status, body) = Self::read_response(response)?;
        let finished = match status {
            StatusCode::OK => body,
            StatusCode::ACCEPTED => self.wait_for(body)?,
            other => {
                return Err(LoadError::Warehouse(format!("{other}: {}", body.describe())));
            }
        };
        self.executed += 1;
        debug!(
            "Statement {} finished: {}",
            finished.statement_handle.as_deref().unwrap_or("<unknown>"),
            finished.message.as_deref().unwrap_or("ok")
        );
        Ok(())
    }

    fn close(self) -> Result<()> {
        info!(
            "Closed Snowflake session after {} statement(s)",
            self.executed
        );
        Ok(())
    }
}
