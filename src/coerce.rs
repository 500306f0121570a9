//! Per-column type coercion.
//!
//! A [`CoercionSpec`] maps record keys to a [`CoercionKind`]. Numeric kinds
//! strip thousands separators and dollar signs before parsing; date kinds go
//! through a [`DateParser`]. Blank cells become `null`. Tags that name no known
//! kind are reported with a warning and leave the value untouched.

use std::{collections::BTreeMap, fmt, str::FromStr};

use log::warn;
use serde::{Deserialize, Deserializer};

use crate::{
    data::{Record, Value},
    dates::DateParser,
    error::{LoadError, Result},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoercionKind {
    Integer,
    Float,
    Date,
    DateTime,
    Unrecognized(String),
}

impl CoercionKind {
    pub fn tag(&self) -> &str {
        match self {
            CoercionKind::Integer => "integer",
            CoercionKind::Float => "float",
            CoercionKind::Date => "date",
            CoercionKind::DateTime => "datetime",
            CoercionKind::Unrecognized(tag) => tag,
        }
    }
}

impl fmt::Display for CoercionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for CoercionKind {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match value {
            "int" | "integer" => CoercionKind::Integer,
            "float" => CoercionKind::Float,
            "date" => CoercionKind::Date,
            "datetime" | "timestamp" => CoercionKind::DateTime,
            other => CoercionKind::Unrecognized(other.to_string()),
        })
    }
}

impl<'de> Deserialize<'de> for CoercionKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        let Ok(kind) = tag.parse::<CoercionKind>();
        Ok(kind)
    }
}

/// Coercion targets keyed by normalized record key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct CoercionSpec(BTreeMap<String, CoercionKind>);

impl CoercionSpec {
    /// Parses a JSON object such as `{"amount": "int", "ordered_at": "date"}`.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|err| LoadError::InvalidCoercions(err.to_string()))
    }

    pub fn get(&self, key: &str) -> Option<&CoercionKind> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
impl<K: Into<String>> FromIterator<(K, CoercionKind)> for CoercionSpec {
    fn from_iter<I: IntoIterator<Item = (K, CoercionKind)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(key, kind)| (key.into(), kind)).collect())
    }
}

fn strip_currency(value: &str) -> String {
    value.replace([',', '$'], "")
}

pub fn coerce_value(
    key: &str,
    raw: &str,
    kind: &CoercionKind,
    dates: &dyn DateParser,
) -> Result<Option<Value>> {
    let parse_error = || LoadError::Parse {
        key: key.to_string(),
        value: raw.to_string(),
        kind: kind.clone(),
    };
    let coerced = match kind {
        CoercionKind::Integer => {
            let stripped = strip_currency(raw);
            if stripped.is_empty() {
                return Ok(None);
            }
            let parsed: i64 = stripped.trim().parse().map_err(|_| parse_error())?;
            Value::Integer(parsed)
        }
        CoercionKind::Float => {
            let stripped = strip_currency(raw);
            if stripped.is_empty() {
                return Ok(None);
            }
            let parsed: f64 = stripped.trim().parse().map_err(|_| parse_error())?;
            if !parsed.is_finite() {
                return Err(parse_error());
            }
            Value::Float(parsed)
        }
        CoercionKind::Date => {
            if raw.trim().is_empty() {
                return Ok(None);
            }
            let parsed = dates.parse(raw).ok_or_else(parse_error)?;
            Value::Date(parsed.date())
        }
        CoercionKind::DateTime => {
            if raw.trim().is_empty() {
                return Ok(None);
            }
            let parsed = dates.parse(raw).ok_or_else(parse_error)?;
            Value::DateTime(parsed)
        }
        CoercionKind::Unrecognized(tag) => {
            warn!("Unknown coercion target {tag:?}");
            Value::String(raw.to_string())
        }
    };
    Ok(Some(coerced))
}

/// Applies `spec` to a record of raw strings. Keys without a target, and
/// values that are not strings, are copied as-is.
pub fn coerce_record(
    record: &Record,
    spec: &CoercionSpec,
    dates: &dyn DateParser,
) -> Result<Record> {
    let mut result = Record::with_capacity(record.len());
    for (key, value) in record {
        let coerced = match (spec.get(key), value) {
            (Some(kind), Some(Value::String(raw))) => coerce_value(key, raw, kind, dates)?,
            _ => value.clone(),
        };
        result.insert(key.clone(), coerced);
    }
    Ok(result)
}

pub fn coerce_records(
    records: &[Record],
    spec: &CoercionSpec,
    dates: &dyn DateParser,
) -> Result<Vec<Record>> {
    records
        .iter()
        .map(|record| coerce_record(record, spec, dates))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::FlexibleDateParser;
    use chrono::NaiveDate;

    fn coerce(raw: &str, kind: CoercionKind) -> Result<Option<Value>> {
        coerce_value("col", raw, &kind, &FlexibleDateParser::default())
    }

    #[test]
    fn tags_map_to_kinds() {
        assert_eq!("int".parse::<CoercionKind>().unwrap(), CoercionKind::Integer);
        assert_eq!("integer".parse::<CoercionKind>().unwrap(), CoercionKind::Integer);
        assert_eq!("timestamp".parse::<CoercionKind>().unwrap(), CoercionKind::DateTime);
        assert_eq!(
            "Float".parse::<CoercionKind>().unwrap(),
            CoercionKind::Unrecognized("Float".into())
        );
    }

    #[test]
    fn integers_strip_currency_and_separators() {
        assert_eq!(
            coerce("$1,234", CoercionKind::Integer).unwrap(),
            Some(Value::Integer(1234))
        );
        assert_eq!(
            coerce(" -42 ", CoercionKind::Integer).unwrap(),
            Some(Value::Integer(-42))
        );
        assert_eq!(coerce("$", CoercionKind::Integer).unwrap(), None);
        assert!(coerce("12.5", CoercionKind::Integer).is_err());
        assert!(coerce("  ", CoercionKind::Integer).is_err());
    }

    #[test]
    fn floats_parse_and_reject_non_finite() {
        assert_eq!(coerce("", CoercionKind::Float).unwrap(), None);
        assert_eq!(
            coerce("$1,234.50", CoercionKind::Float).unwrap(),
            Some(Value::Float(1234.5))
        );
        assert!(coerce("abc", CoercionKind::Float).is_err());
        assert!(coerce("inf", CoercionKind::Float).is_err());
        assert!(coerce("NaN", CoercionKind::Float).is_err());
    }

    #[test]
    fn dates_format_and_blank_to_null() {
        assert_eq!(
            coerce("2024-03-05", CoercionKind::Date).unwrap(),
            Some(Value::Date(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()))
        );
        assert_eq!(coerce("   ", CoercionKind::Date).unwrap(), None);
        assert_eq!(coerce("", CoercionKind::DateTime).unwrap(), None);
        let stamped = coerce("March 5, 2024 2:30 PM", CoercionKind::DateTime)
            .unwrap()
            .unwrap();
        assert_eq!(stamped.as_display(), "2024-03-05 14:30:00");
    }

    #[test]
    fn spelled_out_dates_expand_short_years() {
        assert_eq!(
            coerce("05-Mar-24", CoercionKind::Date).unwrap(),
            Some(Value::Date(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()))
        );
        assert!(coerce("5 Mar 124", CoercionKind::Date).is_err());
    }

    #[test]
    fn parse_error_names_column_and_value() {
        let err = coerce("soon", CoercionKind::Date).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to parse \"soon\" in column 'col' as date"
        );
    }

    #[test]
    fn unrecognized_target_passes_value_through() {
        assert_eq!(
            coerce("TRUE", CoercionKind::Unrecognized("bool".into())).unwrap(),
            Some(Value::from("TRUE"))
        );
    }

    #[test]
    fn coerce_record_leaves_unlisted_keys() {
        let mut record = Record::new();
        record.insert("name".into(), Some(Value::from("Bob")));
        record.insert("amount".into(), Some(Value::from("$1,200")));
        let spec: CoercionSpec = [("amount", CoercionKind::Integer)].into_iter().collect();

        let coerced = coerce_record(&record, &spec, &FlexibleDateParser::default()).unwrap();
        assert_eq!(coerced.get("name"), Some(&Some(Value::from("Bob"))));
        assert_eq!(coerced.get("amount"), Some(&Some(Value::Integer(1200))));
    }

    #[test]
    fn spec_from_json_accepts_unknown_tags_and_rejects_non_objects() {
        let spec = CoercionSpec::from_json(r#"{"amount": "int", "flag": "bool"}"#).unwrap();
        assert_eq!(spec.get("amount"), Some(&CoercionKind::Integer));
        assert_eq!(
            spec.get("flag"),
            Some(&CoercionKind::Unrecognized("bool".into()))
        );
        assert!(matches!(
            CoercionSpec::from_json("[1, 2]"),
            Err(LoadError::InvalidCoercions(_))
        ));
    }
}
