use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::{json, Map, Value as JsonValue};

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    List(Vec<SqlValue>),
    Map(Vec<(SqlValue, SqlValue)>),
    Record(Vec<(String, SqlValue)>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn record_field(&self, name: &str) -> Option<&SqlValue> {
        match self {
            SqlValue::Record(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Driver-style JSON rendering: dates and timestamps become ISO strings,
    /// decimals become strings so no digits are lost.
    pub fn to_json(&self) -> JsonValue {
        match self {
            SqlValue::Null => JsonValue::Null,
            SqlValue::Bool(b) => JsonValue::Bool(*b),
            SqlValue::Int(i) => json!(i),
            SqlValue::Float(f) => json!(f),
            SqlValue::Decimal(d) => JsonValue::String(d.to_string()),
            SqlValue::String(s) => JsonValue::String(s.clone()),
            SqlValue::Date(d) => JsonValue::String(d.to_string()),
            SqlValue::Timestamp(ts) => JsonValue::String(format_iso_timestamp(ts, 'T')),
            SqlValue::List(items) => JsonValue::Array(items.iter().map(SqlValue::to_json).collect()),
            SqlValue::Map(entries) => {
                let obj: Map<String, JsonValue> = entries
                    .iter()
                    .map(|(k, v)| (map_key_text(k), v.to_json()))
                    .collect();
                JsonValue::Object(obj)
            }
            SqlValue::Record(fields) => {
                let obj: Map<String, JsonValue> = fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect();
                JsonValue::Object(obj)
            }
        }
    }

    /// Untyped conversion used when no type information applies.
    pub fn from_json(value: &JsonValue) -> SqlValue {
        match value {
            JsonValue::Null => SqlValue::Null,
            JsonValue::Bool(b) => SqlValue::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Int(i),
                None => SqlValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => SqlValue::String(s.clone()),
            JsonValue::Array(items) => SqlValue::List(items.iter().map(SqlValue::from_json).collect()),
            JsonValue::Object(obj) => SqlValue::Record(
                obj.iter()
                    .map(|(k, v)| (k.clone(), SqlValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}

fn map_key_text(key: &SqlValue) -> String {
    match key {
        SqlValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn format_iso_timestamp(ts: &NaiveDateTime, separator: char) -> String {
    let pattern = format!("%Y-%m-%d{}%H:%M:%S%.f", separator);
    ts.format(&pattern).to_string()
}

pub(crate) fn format_float(f: f64) -> String {
    let text = f.to_string();
    if f.is_finite() && !text.contains(['.', 'e', 'E']) {
        format!("{}.0", text)
    } else {
        text
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::Int(i) => write!(f, "{}", i),
            SqlValue::Float(v) => write!(f, "{}", format_float(*v)),
            SqlValue::Decimal(d) => write!(f, "{}", d),
            SqlValue::String(s) => write!(f, "{}", s),
            SqlValue::Date(d) => write!(f, "{}", d),
            SqlValue::Timestamp(ts) => write!(f, "{}", format_iso_timestamp(ts, 'T')),
            SqlValue::List(_) | SqlValue::Map(_) | SqlValue::Record(_) => {
                write!(f, "{}", self.to_json())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_display_scalars() {
        assert_eq!(SqlValue::Int(42).to_string(), "42");
        assert_eq!(SqlValue::Float(1.5).to_string(), "1.5");
        assert_eq!(SqlValue::Float(3.0).to_string(), "3.0");
        assert_eq!(SqlValue::Bool(true).to_string(), "true");
        assert_eq!(
            SqlValue::Decimal(Decimal::from_str("123.45").unwrap()).to_string(),
            "123.45"
        );
        assert_eq!(SqlValue::Null.to_string(), "NULL");
    }

    #[test]
    fn test_display_timestamp_omits_zero_fraction() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(SqlValue::Timestamp(ts).to_string(), "2024-01-15T10:30:00");
    }

    #[test]
    fn test_display_timestamp_with_fraction() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_micro_opt(10, 30, 0, 250_000)
            .unwrap();
        assert_eq!(format_iso_timestamp(&ts, ' '), "2024-01-15 10:30:00.250");
    }

    #[test]
    fn test_to_json_record() {
        let value = SqlValue::Record(vec![
            ("name".to_string(), SqlValue::String("Alice".to_string())),
            ("born".to_string(), SqlValue::Date(NaiveDate::from_ymd_opt(1990, 5, 1).unwrap())),
        ]);
        assert_eq!(value.to_json(), json!({"name": "Alice", "born": "1990-05-01"}));
    }

    #[test]
    fn test_to_json_decimal_keeps_digits() {
        let value = SqlValue::List(vec![
            SqlValue::Decimal(Decimal::from_str("1.5").unwrap()),
            SqlValue::Decimal(Decimal::from_str("12345678901234567.123456789").unwrap()),
        ]);
        assert_eq!(value.to_json(), json!(["1.5", "12345678901234567.123456789"]));
    }

    #[test]
    fn test_from_json_untyped() {
        let value = SqlValue::from_json(&json!({"a": [1, 2.5, null], "b": "x"}));
        assert_eq!(
            value.record_field("a"),
            Some(&SqlValue::List(vec![
                SqlValue::Int(1),
                SqlValue::Float(2.5),
                SqlValue::Null
            ]))
        );
        assert_eq!(value.record_field("b"), Some(&SqlValue::String("x".to_string())));
    }

    #[test]
    fn test_format_float_non_finite() {
        assert_eq!(format_float(f64::NAN), "NaN");
        assert_eq!(format_float(f64::INFINITY), "inf");
    }
}
