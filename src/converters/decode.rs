use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value as JsonValue;

use crate::dialect::DialectProfile;
use crate::error::{Error, Result};
use crate::types::{
    classify, FromSqlValue, Kind, PrimitiveKind, RecordDescriptor, SqlValue, TypeDescriptor,
};

/// Converts one driver value into a typed `SqlValue` shaped by `ty`.
///
/// Drivers disagree on representation: records may arrive as objects,
/// positional arrays or JSON text, maps and lists as parsed JSON or text.
/// Malformed JSON text for a list or map yields an empty container.
pub fn decode_value(raw: &JsonValue, ty: &TypeDescriptor, profile: &DialectProfile) -> Result<SqlValue> {
    if is_null(raw, profile) {
        return Ok(SqlValue::Null);
    }
    match classify(ty) {
        Kind::Optional(inner) => decode_value(raw, inner, profile),
        Kind::Primitive(kind) => decode_primitive(raw, kind),
        Kind::Record(rec) => decode_record(raw, rec, profile),
        Kind::List(elem) => decode_list(raw, elem, ty, profile),
        Kind::Map(key, val) => decode_map(raw, key, val, ty, profile),
    }
}

fn is_null(raw: &JsonValue, profile: &DialectProfile) -> bool {
    match (raw, profile.null_sentinel) {
        (JsonValue::Null, _) => true,
        (JsonValue::String(s), Some(sentinel)) => s == sentinel,
        _ => false,
    }
}

fn decode_primitive(raw: &JsonValue, kind: PrimitiveKind) -> Result<SqlValue> {
    let untyped = SqlValue::from_json(raw);
    match kind {
        PrimitiveKind::String => String::from_sql_value(untyped).map(SqlValue::String),
        PrimitiveKind::Integer => i64::from_sql_value(untyped).map(SqlValue::Int),
        PrimitiveKind::Float => f64::from_sql_value(untyped).map(SqlValue::Float),
        PrimitiveKind::Boolean => bool::from_sql_value(untyped).map(SqlValue::Bool),
        PrimitiveKind::Decimal => match raw {
            // Number text avoids a lossy trip through f64.
            JsonValue::Number(n) => {
                let text = n.to_string();
                Decimal::from_str(&text)
                    .or_else(|_| Decimal::from_scientific(&text))
                    .map(SqlValue::Decimal)
                    .map_err(|_| Error::type_conversion(text, "decimal"))
            }
            _ => Decimal::from_sql_value(untyped).map(SqlValue::Decimal),
        },
        PrimitiveKind::Date => chrono::NaiveDate::from_sql_value(untyped).map(SqlValue::Date),
        PrimitiveKind::Timestamp => {
            chrono::NaiveDateTime::from_sql_value(untyped).map(SqlValue::Timestamp)
        }
        PrimitiveKind::NoneType | PrimitiveKind::Unknown => Ok(untyped),
    }
}

fn decode_record(raw: &JsonValue, rec: &RecordDescriptor, profile: &DialectProfile) -> Result<SqlValue> {
    match raw {
        JsonValue::Object(obj) => {
            let mut fields = Vec::with_capacity(rec.fields.len());
            for field in &rec.fields {
                let value = match obj.get(&field.name) {
                    Some(v) => decode_value(v, &field.ty, profile).map_err(|e| e.with_column(&field.name))?,
                    None => SqlValue::Null,
                };
                fields.push((field.name.clone(), value));
            }
            Ok(SqlValue::Record(fields))
        }
        JsonValue::Array(items) => {
            let mut fields = Vec::with_capacity(rec.fields.len());
            for (field, item) in rec.fields.iter().zip(items) {
                let value = decode_value(item, &field.ty, profile).map_err(|e| e.with_column(&field.name))?;
                fields.push((field.name.clone(), value));
            }
            Ok(SqlValue::Record(fields))
        }
        JsonValue::String(text) => match serde_json::from_str::<JsonValue>(text) {
            Ok(parsed @ (JsonValue::Object(_) | JsonValue::Array(_))) => decode_record(&parsed, rec, profile),
            _ => Ok(SqlValue::String(text.clone())),
        },
        other => Ok(SqlValue::from_json(other)),
    }
}

fn decode_list(
    raw: &JsonValue,
    elem: &TypeDescriptor,
    ty: &TypeDescriptor,
    profile: &DialectProfile,
) -> Result<SqlValue> {
    match raw {
        JsonValue::Array(items) => items
            .iter()
            .map(|item| decode_value(item, elem, profile))
            .collect::<Result<Vec<_>>>()
            .map(SqlValue::List),
        JsonValue::String(text) => match serde_json::from_str::<JsonValue>(text) {
            Ok(parsed @ JsonValue::Array(_)) => decode_list(&parsed, elem, ty, profile),
            _ => Ok(SqlValue::List(Vec::new())),
        },
        other => Err(Error::type_conversion(other, ty)),
    }
}

fn decode_map(
    raw: &JsonValue,
    key_ty: &TypeDescriptor,
    val_ty: &TypeDescriptor,
    ty: &TypeDescriptor,
    profile: &DialectProfile,
) -> Result<SqlValue> {
    let mut entries = Vec::new();
    match raw {
        JsonValue::Object(obj) => {
            for (k, v) in obj {
                entries.push((
                    decode_value(&JsonValue::String(k.clone()), key_ty, profile)?,
                    decode_value(v, val_ty, profile)?,
                ));
            }
        }
        JsonValue::Array(items) => {
            for item in items {
                let (k, v) = match item {
                    JsonValue::Array(pair) if pair.len() == 2 => (&pair[0], &pair[1]),
                    JsonValue::Object(obj) => match (obj.get("key"), obj.get("value")) {
                        (Some(k), Some(v)) => (k, v),
                        _ => return Err(Error::type_conversion(item, ty)),
                    },
                    _ => return Err(Error::type_conversion(item, ty)),
                };
                entries.push((decode_value(k, key_ty, profile)?, decode_value(v, val_ty, profile)?));
            }
        }
        JsonValue::String(text) => {
            return match serde_json::from_str::<JsonValue>(text) {
                Ok(parsed @ (JsonValue::Object(_) | JsonValue::Array(_))) => {
                    decode_map(&parsed, key_ty, val_ty, ty, profile)
                }
                _ => Ok(SqlValue::Map(Vec::new())),
            };
        }
        other => return Err(Error::type_conversion(other, ty)),
    }
    Ok(SqlValue::Map(entries))
}
