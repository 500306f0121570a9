//! Warehouse connections.
//!
//! A [`Connector`] opens a [`Session`] from the connection parameters in a
//! [`DbConfig`]; the session runs statements one after another and is closed
//! exactly once. [`SnowflakeConnector`] is the production implementation.

mod snowflake;

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{
    error::{LoadError, Result},
    io_utils,
};

pub use self::snowflake::{SnowflakeConnector, SnowflakeSession, SnowflakeSettings};

pub const DEFAULT_DB_CONFIG_FILE: &str = "db.json";

pub trait Connector {
    type Session: Session;

    fn connect(&self, config: &DbConfig) -> Result<Self::Session>;
}

pub trait Session {
    fn execute(&mut self, statement: &str) -> Result<()>;

    fn close(self) -> Result<()>;
}

/// Driver-specific connection parameters, kept exactly as read from disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DbConfig {
    path: Option<PathBuf>,
    params: Map<String, Value>,
}

impl DbConfig {
    pub fn new(params: Map<String, Value>) -> Self {
        Self { path: None, params }
    }

    /// Reads a JSON object from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let config_error = |message: String| LoadError::ConfigRead {
            path: path.to_path_buf(),
            message,
        };
        let value: Value = io_utils::read_json_file(path).map_err(config_error)?;
        match value {
            Value::Object(params) => Ok(Self {
                path: Some(path.to_path_buf()),
                params,
            }),
            other => Err(config_error(format!("expected a JSON object, got {other}"))),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Interprets the parameters as a driver's settings struct.
    pub fn settings<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.params.clone())).map_err(|err| {
            LoadError::ConfigRead {
                path: self.path.clone().unwrap_or_default(),
                message: err.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_reads_json_object() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("db.json");
        fs::write(&path, r#"{"account": "acme", "warehouse": "LOAD_WH"}"#).expect("write");

        let config = DbConfig::load(&path).unwrap();
        assert_eq!(config.path(), Some(path.as_path()));
        assert_eq!(config.get("account"), Some(&Value::from("acme")));
        assert_eq!(config.params().len(), 2);
    }

    #[test]
    fn load_rejects_missing_malformed_and_non_object_files() {
        let dir = tempdir().expect("temp dir");
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            DbConfig::load(&missing),
            Err(LoadError::ConfigRead { .. })
        ));

        let malformed = dir.path().join("bad.json");
        fs::write(&malformed, "{account:").expect("write");
        assert!(matches!(
            DbConfig::load(&malformed),
            Err(LoadError::ConfigRead { .. })
        ));

        let array = dir.path().join("array.json");
        fs::write(&array, "[]").expect("write");
        let err = DbConfig::load(&array).unwrap_err();
        assert!(err.to_string().contains("expected a JSON object"));
    }
}
