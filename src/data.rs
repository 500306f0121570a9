use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

/// One worksheet row keyed by normalized header. `None` serializes as `null`.
pub type Record = IndexMap<String, Option<Value>>;

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Date(d) => d.format(DATE_FORMAT).to_string(),
            Value::DateTime(dt) => dt.format(DATETIME_FORMAT).to_string(),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Date(_) | Value::DateTime(_) => serializer.collect_str(self),
        }
    }
}

/// Builds a string-valued record from keys and cells, stopping at the shorter
/// of the two. A repeated key keeps its first position and takes the later value.
pub fn zip_record(keys: &[String], cells: &[String]) -> Record {
    let mut record = Record::with_capacity(keys.len().min(cells.len()));
    for (key, cell) in keys.iter().zip(cells) {
        record.insert(key.clone(), Some(Value::String(cell.clone())));
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn serializes_typed_values_as_json_scalars() {
        let mut record = Record::new();
        record.insert("name".into(), Some(Value::from("Bob")));
        record.insert("count".into(), Some(Value::Integer(3)));
        record.insert("ratio".into(), Some(Value::Float(1200.0)));
        record.insert(
            "day".into(),
            Some(Value::Date(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())),
        );
        record.insert("missing".into(), None);

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"name":"Bob","count":3,"ratio":1200.0,"day":"2024-03-05","missing":null}"#
        );
    }

    #[test]
    fn datetime_displays_without_fraction() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_milli_opt(14, 30, 0, 250)
            .unwrap();
        assert_eq!(Value::DateTime(dt).as_display(), "2024-03-05 14:30:00");
    }

    #[test]
    fn zip_record_stops_at_shorter_side() {
        let keys = strings(&["a", "b", "c"]);
        let short = zip_record(&keys, &strings(&["1"]));
        assert_eq!(short.len(), 1);

        let long = zip_record(&strings(&["a"]), &strings(&["1", "2"]));
        assert_eq!(long.get("a"), Some(&Some(Value::from("1"))));
        assert_eq!(long.len(), 1);
    }

    #[test]
    fn zip_record_later_duplicate_wins_in_first_position() {
        let keys = strings(&["a_b", "x", "a_b"]);
        let record = zip_record(&keys, &strings(&["first", "middle", "second"]));
        let entries: Vec<_> = record.iter().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "a_b");
        assert_eq!(entries[0].1, &Some(Value::from("second")));
        assert_eq!(entries[1].0, "x");
    }
}
