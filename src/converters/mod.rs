mod decode;
mod encode;
mod sql_type;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

pub use decode::decode_value;
pub use encode::{encode_literal, encode_literal_into};
pub use sql_type::sql_type_name;

/// Standard SQL string literal: NUL bytes are dropped, backslash and control
/// characters get two-character escapes, and `'` is doubled.
pub fn escape_sql_string(s: &str) -> String {
    let mut buf = String::with_capacity(s.len() + 2);
    escape_sql_string_into(s, &mut buf);
    buf
}

pub(crate) fn escape_sql_string_into(s: &str, buf: &mut String) {
    buf.push('\'');
    for c in s.chars() {
        match c {
            '\0' => {}
            '\\' => buf.push_str("\\\\"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            '\t' => buf.push_str("\\t"),
            '\u{8}' => buf.push_str("\\b"),
            '\u{c}' => buf.push_str("\\f"),
            '\u{b}' => buf.push_str("\\v"),
            '\'' => buf.push_str("''"),
            _ => buf.push(c),
        }
    }
    buf.push('\'');
}

/// BigQuery string literal. Values with a single quote use the triple-quoted
/// form; everything else takes the standard escape.
pub fn escape_bigquery_string(s: &str) -> String {
    let mut buf = String::with_capacity(s.len() + 6);
    escape_bigquery_string_into(s, &mut buf);
    buf
}

pub(crate) fn escape_bigquery_string_into(s: &str, buf: &mut String) {
    if !s.contains('\'') {
        escape_sql_string_into(s, buf);
        return;
    }
    // Triple-quoted literals still process escape sequences.
    buf.push_str("\"\"\"");
    for c in s.chars() {
        match c {
            '\0' => {}
            '\\' => buf.push_str("\\\\"),
            '"' => buf.push_str("\\\""),
            _ => buf.push(c),
        }
    }
    buf.push_str("\"\"\"");
}

pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(s).map(|ts| ts.date()))
}

/// ISO datetimes with `T` or space separator, optional fraction and optional
/// offset. Offsets are dropped, keeping the wall-clock time. A bare date reads
/// as midnight.
pub(crate) fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for pattern in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, pattern) {
            return Some(dt.naive_local());
        }
    }
    for pattern in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, pattern) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}
