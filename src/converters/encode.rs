use std::fmt::Write;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::sql_type::{sql_type_name, unsupported};
use super::{escape_bigquery_string_into, escape_sql_string_into};
use crate::dialect::{
    ArrayLiteral, DialectProfile, MapLiteral, NullLiteral, StringEscape, StructLiteral,
    TemporalLiteral,
};
use crate::error::{Error, Result};
use crate::types::value::{format_float, format_iso_timestamp};
use crate::types::{classify, Kind, PrimitiveKind, RecordDescriptor, SqlValue, TypeDescriptor};

pub fn encode_literal(value: &SqlValue, ty: &TypeDescriptor, profile: &DialectProfile) -> Result<String> {
    let mut buf = String::new();
    encode_literal_into(value, ty, profile, &mut buf)?;
    Ok(buf)
}

pub fn encode_literal_into(
    value: &SqlValue,
    ty: &TypeDescriptor,
    profile: &DialectProfile,
    buf: &mut String,
) -> Result<()> {
    match classify(ty) {
        Kind::Optional(inner) => encode_literal_into(value, inner, profile, buf),
        Kind::Primitive(kind) => encode_primitive(value, kind, ty, profile, buf),
        Kind::Record(rec) => encode_record(value, rec, ty, profile, buf),
        Kind::List(elem) => encode_list(value, elem, ty, profile, buf),
        Kind::Map(key, val) => encode_map(value, key, val, ty, profile, buf),
    }
}

fn push_null(ty: &TypeDescriptor, profile: &DialectProfile, buf: &mut String) -> Result<()> {
    match profile.null_literal {
        NullLiteral::Plain => buf.push_str("NULL"),
        NullLiteral::PostgresCast => {
            buf.push_str("NULL::");
            buf.push_str(&sql_type_name(ty, profile.dialect)?);
        }
        NullLiteral::AnsiCast => {
            let _ = write!(buf, "CAST(NULL AS {})", sql_type_name(ty, profile.dialect)?);
        }
    }
    Ok(())
}

fn push_string(s: &str, profile: &DialectProfile, buf: &mut String) {
    match profile.string_escape {
        StringEscape::Standard => escape_sql_string_into(s, buf),
        StringEscape::TripleQuote => escape_bigquery_string_into(s, buf),
    }
}

fn push_date(d: &NaiveDate, profile: &DialectProfile, buf: &mut String) {
    match profile.temporal_literal {
        TemporalLiteral::Keyword { .. } => {
            let _ = write!(buf, "DATE '{}'", d);
        }
        TemporalLiteral::Function => {
            let _ = write!(buf, "DATE('{}')", d);
        }
    }
}

fn push_timestamp(ts: &NaiveDateTime, profile: &DialectProfile, buf: &mut String) {
    match profile.temporal_literal {
        TemporalLiteral::Keyword {
            timestamp_separator,
        } => {
            let _ = write!(buf, "TIMESTAMP '{}'", format_iso_timestamp(ts, timestamp_separator));
        }
        TemporalLiteral::Function => {
            let _ = write!(buf, "DATETIME('{}')", format_iso_timestamp(ts, 'T'));
        }
    }
}

fn push_float(f: f64, ty: &TypeDescriptor, profile: &DialectProfile, buf: &mut String) -> Result<()> {
    if f.is_finite() {
        buf.push_str(&format_float(f));
        return Ok(());
    }
    let text = if f.is_nan() {
        "NaN"
    } else if f.is_sign_positive() {
        "Infinity"
    } else {
        "-Infinity"
    };
    let _ = write!(buf, "CAST('{}' AS {})", text, sql_type_name(ty, profile.dialect)?);
    Ok(())
}

fn encode_primitive(
    value: &SqlValue,
    kind: PrimitiveKind,
    ty: &TypeDescriptor,
    profile: &DialectProfile,
    buf: &mut String,
) -> Result<()> {
    use PrimitiveKind as P;
    match (kind, value) {
        (_, SqlValue::Null) => push_null(ty, profile, buf)?,
        (P::Boolean, SqlValue::Bool(b)) => buf.push_str(if *b { "TRUE" } else { "FALSE" }),
        (P::Integer, SqlValue::Int(i)) => {
            let _ = write!(buf, "{}", i);
        }
        (P::Float, SqlValue::Float(f)) => push_float(*f, ty, profile, buf)?,
        (P::Float | P::Decimal, SqlValue::Int(i)) => {
            let _ = write!(buf, "{}", i);
        }
        (P::Decimal, SqlValue::Decimal(d)) => {
            let _ = write!(buf, "{}", d);
        }
        (P::Decimal, SqlValue::Float(f)) if f.is_finite() => buf.push_str(&format_float(*f)),
        (P::Date, SqlValue::Date(d)) => push_date(d, profile, buf),
        (P::Date, SqlValue::Timestamp(ts)) => push_date(&ts.date(), profile, buf),
        (P::Timestamp, SqlValue::Timestamp(ts)) => push_timestamp(ts, profile, buf),
        (P::Timestamp, SqlValue::Date(d)) => {
            push_timestamp(&d.and_time(NaiveTime::MIN), profile, buf)
        }
        (P::String, SqlValue::String(s)) => push_string(s, profile, buf),
        (P::String | P::Unknown | P::NoneType, other) => push_string(&other.to_string(), profile, buf),
        (_, other) => return Err(Error::type_conversion(other, ty)),
    }
    Ok(())
}

fn encode_record(
    value: &SqlValue,
    rec: &RecordDescriptor,
    ty: &TypeDescriptor,
    profile: &DialectProfile,
    buf: &mut String,
) -> Result<()> {
    if profile.struct_literal == StructLiteral::Unsupported {
        return Err(unsupported("Struct", profile.dialect));
    }
    let row_type = sql_type_name(ty, profile.dialect)?;
    if value.is_null() {
        let _ = write!(buf, "CAST(NULL AS {})", row_type);
        return Ok(());
    }
    buf.push_str("CAST(");
    push_row_values(value, rec, profile, buf)?;
    let _ = write!(buf, " AS {})", row_type);
    Ok(())
}

/// `ROW(..)` body in declared field order. Nested records render as bare
/// `ROW(..)` since the outer cast already carries their types.
fn push_row_values(
    value: &SqlValue,
    rec: &RecordDescriptor,
    profile: &DialectProfile,
    buf: &mut String,
) -> Result<()> {
    let positional = match value {
        SqlValue::Record(_) => None,
        SqlValue::List(items) => Some(items),
        other => return Err(Error::type_conversion(other, &rec.name)),
    };
    buf.push_str("ROW(");
    for (i, field) in rec.fields.iter().enumerate() {
        if i > 0 {
            buf.push_str(", ");
        }
        let field_value = match positional {
            Some(items) => items.get(i),
            None => value.record_field(&field.name),
        }
        .unwrap_or(&SqlValue::Null);

        match classify(&field.ty) {
            Kind::Record(inner) if !field_value.is_null() => {
                push_row_values(field_value, inner, profile, buf)?
            }
            Kind::Optional(inner_ty) => match classify(inner_ty) {
                Kind::Record(inner) if !field_value.is_null() => {
                    push_row_values(field_value, inner, profile, buf)?
                }
                _ => encode_literal_into(field_value, &field.ty, profile, buf)
                    .map_err(|e| e.with_column(&field.name))?,
            },
            _ => encode_literal_into(field_value, &field.ty, profile, buf)
                .map_err(|e| e.with_column(&field.name))?,
        }
    }
    buf.push(')');
    Ok(())
}

fn encode_list(
    value: &SqlValue,
    elem: &TypeDescriptor,
    ty: &TypeDescriptor,
    profile: &DialectProfile,
    buf: &mut String,
) -> Result<()> {
    let items = match value {
        SqlValue::Null => return push_null(ty, profile, buf),
        SqlValue::List(items) => items,
        other => return Err(Error::type_conversion(other, ty)),
    };
    let (open, close) = match profile.array_literal {
        ArrayLiteral::Brackets => ("[", "]"),
        ArrayLiteral::ArrayKeyword => ("ARRAY[", "]"),
        ArrayLiteral::ArrayConstruct => ("ARRAY_CONSTRUCT(", ")"),
        ArrayLiteral::JsonParse => {
            push_json_parse(value, buf);
            return Ok(());
        }
    };
    buf.push_str(open);
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            buf.push_str(", ");
        }
        encode_literal_into(item, elem, profile, buf)?;
    }
    buf.push_str(close);
    Ok(())
}

fn map_entries(value: &SqlValue) -> Option<Vec<(SqlValue, &SqlValue)>> {
    match value {
        SqlValue::Map(entries) => Some(entries.iter().map(|(k, v)| (k.clone(), v)).collect()),
        SqlValue::Record(fields) => Some(
            fields
                .iter()
                .map(|(k, v)| (SqlValue::String(k.clone()), v))
                .collect(),
        ),
        _ => None,
    }
}

fn encode_map(
    value: &SqlValue,
    key_ty: &TypeDescriptor,
    val_ty: &TypeDescriptor,
    ty: &TypeDescriptor,
    profile: &DialectProfile,
    buf: &mut String,
) -> Result<()> {
    if profile.map_literal == MapLiteral::Unsupported {
        return Err(unsupported("Map", profile.dialect));
    }
    if value.is_null() {
        return push_null(ty, profile, buf);
    }
    let entries = map_entries(value).ok_or_else(|| Error::type_conversion(value, ty))?;

    match profile.map_literal {
        MapLiteral::MapOfArrays => {
            buf.push_str("MAP(ARRAY[");
            for (i, (k, _)) in entries.iter().enumerate() {
                if i > 0 {
                    buf.push_str(", ");
                }
                encode_literal_into(k, key_ty, profile, buf)?;
            }
            buf.push_str("], ARRAY[");
            for (i, (_, v)) in entries.iter().enumerate() {
                if i > 0 {
                    buf.push_str(", ");
                }
                encode_literal_into(v, val_ty, profile, buf)?;
            }
            buf.push_str("])");
        }
        MapLiteral::ObjectConstruct | MapLiteral::Braces => {
            let (open, sep, close) = if profile.map_literal == MapLiteral::Braces {
                ("MAP {", ": ", "}")
            } else {
                ("OBJECT_CONSTRUCT(", ", ", ")")
            };
            buf.push_str(open);
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    buf.push_str(", ");
                }
                encode_literal_into(k, key_ty, profile, buf)?;
                buf.push_str(sep);
                encode_literal_into(v, val_ty, profile, buf)?;
            }
            buf.push_str(close);
        }
        MapLiteral::JsonParse => push_json_parse(value, buf),
        MapLiteral::Unsupported => return Err(unsupported("Map", profile.dialect)),
    }
    Ok(())
}

fn push_json_parse(value: &SqlValue, buf: &mut String) {
    buf.push_str("JSON_PARSE(");
    escape_sql_string_into(&value.to_json().to_string(), buf);
    buf.push(')');
}
