use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::warn;

use super::{PrimitiveKind, RecordDescriptor, SqlValue, TypeDescriptor};
use crate::converters::{parse_date, parse_timestamp};
use crate::error::{Error, Result};

pub trait SqlType {
    fn type_descriptor() -> TypeDescriptor;
}

pub trait ToSqlValue {
    fn to_sql_value(&self) -> SqlValue;
}

pub trait FromSqlValue: Sized {
    fn from_sql_value(value: SqlValue) -> Result<Self>;
}

/// Introspection capability for record-like types: a static field list plus
/// construction from a name-keyed mapping. Implemented by `#[derive(Record)]`.
pub trait Record: Sized {
    fn record_descriptor() -> RecordDescriptor;

    fn to_fields(&self) -> Vec<(String, SqlValue)>;

    fn from_fields(fields: FieldValues) -> Result<Self>;

    /// Zero-argument construction used when `from_fields` fails.
    fn fallback() -> Option<Self> {
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValues {
    entries: Vec<(String, SqlValue)>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: SqlValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Removes and returns the value for `name`; a missing field reads as NULL.
    pub fn take(&mut self, name: &str) -> SqlValue {
        match self.entries.iter().position(|(n, _)| n == name) {
            Some(idx) => self.entries.remove(idx).1,
            None => SqlValue::Null,
        }
    }

    pub fn take_as<T: FromSqlValue>(&mut self, name: &str) -> Result<T> {
        T::from_sql_value(self.take(name)).map_err(|e| e.with_column(name))
    }

    /// Re-keys entries through `(from, to)` pairs in a single pass, so two
    /// swapped names do not collide.
    pub fn rekey(&mut self, pairs: &[(&str, &str)]) {
        for (name, _) in &mut self.entries {
            if let Some((_, to)) = pairs.iter().find(|(from, _)| *from == name.as_str()) {
                *name = (*to).to_string();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_json(self) -> JsonValue {
        JsonValue::Object(
            self.entries
                .into_iter()
                .map(|(k, v)| (k, v.to_json()))
                .collect(),
        )
    }
}

impl From<Vec<(String, SqlValue)>> for FieldValues {
    fn from(entries: Vec<(String, SqlValue)>) -> Self {
        Self { entries }
    }
}

impl FromIterator<(String, SqlValue)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (String, SqlValue)>>(iter: I) -> Self {
        let mut fields = FieldValues::new();
        for (name, value) in iter {
            fields.insert(name, value);
        }
        fields
    }
}

pub fn construct_record<T: Record>(fields: FieldValues) -> Result<T> {
    match T::from_fields(fields) {
        Ok(record) => Ok(record),
        Err(e) => match T::fallback() {
            Some(record) => {
                warn!(
                    record = %T::record_descriptor().name,
                    error = %e,
                    "Record construction failed, using zero-argument fallback"
                );
                Ok(record)
            }
            None => Err(e),
        },
    }
}

pub fn record_from_value<T: Record>(value: SqlValue) -> Result<T> {
    match value {
        SqlValue::Record(fields) => construct_record(FieldValues::from(fields)),
        SqlValue::List(items) => {
            let descriptor = T::record_descriptor();
            let fields: FieldValues = descriptor
                .fields
                .iter()
                .map(|f| f.name.clone())
                .zip(items)
                .collect();
            construct_record(fields)
        }
        other => Err(Error::type_conversion(other, T::record_descriptor().name)),
    }
}

/// Construction path for validated models: the field mapping is handed to the
/// type's `serde::Deserialize` impl so its validation rules apply.
pub fn from_fields_via_serde<T: Record + DeserializeOwned>(fields: FieldValues) -> Result<T> {
    let json = fields.into_json();
    serde_json::from_value(json.clone()).map_err(|e| {
        warn!(record = %T::record_descriptor().name, error = %e, "Model validation failed");
        Error::type_conversion(json, T::record_descriptor().name)
    })
}

fn mismatch<T: SqlType>(value: SqlValue) -> Error {
    Error::type_conversion(value, T::type_descriptor())
}

macro_rules! primitive_sql_type {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl SqlType for $ty {
                fn type_descriptor() -> TypeDescriptor {
                    TypeDescriptor::Primitive(PrimitiveKind::$kind)
                }
            }
        )*
    };
}

primitive_sql_type! {
    String => String,
    &str => String,
    i64 => Integer,
    i32 => Integer,
    f64 => Float,
    bool => Boolean,
    Decimal => Decimal,
    NaiveDate => Date,
    NaiveDateTime => Timestamp,
    JsonValue => Unknown,
}

impl ToSqlValue for String {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::String(self.clone())
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::String(self.to_string())
    }
}

impl ToSqlValue for i64 {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Int(*self)
    }
}

impl ToSqlValue for i32 {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Int(i64::from(*self))
    }
}

impl ToSqlValue for f64 {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Float(*self)
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Bool(*self)
    }
}

impl ToSqlValue for Decimal {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Decimal(*self)
    }
}

impl ToSqlValue for NaiveDate {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Date(*self)
    }
}

impl ToSqlValue for NaiveDateTime {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Timestamp(*self)
    }
}

impl ToSqlValue for JsonValue {
    fn to_sql_value(&self) -> SqlValue {
        match self {
            JsonValue::Null => SqlValue::Null,
            JsonValue::String(s) => SqlValue::String(s.clone()),
            other => SqlValue::String(other.to_string()),
        }
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::String(s) => Ok(s),
            SqlValue::Null => Err(mismatch::<Self>(SqlValue::Null)),
            other => Ok(other.to_string()),
        }
    }
}

impl FromSqlValue for i64 {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Int(i) => Ok(i),
            SqlValue::Bool(b) => Ok(i64::from(b)),
            SqlValue::Float(f) if f.fract() == 0.0 => {
                float_to_i64(f).ok_or_else(|| mismatch::<Self>(SqlValue::Float(f)))
            }
            SqlValue::Decimal(d) if d.fract().is_zero() => {
                i64::try_from(d).map_err(|_| mismatch::<Self>(SqlValue::Decimal(d)))
            }
            SqlValue::String(s) => {
                let trimmed = s.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    return Ok(i);
                }
                trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(|f| float_to_i64(f.trunc()))
                    .ok_or_else(|| mismatch::<Self>(SqlValue::String(s)))
            }
            other => Err(mismatch::<Self>(other)),
        }
    }
}

/// `None` for non-finite values and anything outside the i64 range, where an
/// `as` cast would saturate.
fn float_to_i64(f: f64) -> Option<i64> {
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    (f.is_finite() && (-BOUND..BOUND).contains(&f)).then_some(f as i64)
}

impl FromSqlValue for i32 {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        let wide = i64::from_sql_value(value)?;
        i32::try_from(wide).map_err(|_| mismatch::<Self>(SqlValue::Int(wide)))
    }
}

impl FromSqlValue for f64 {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Float(f) => Ok(f),
            SqlValue::Int(i) => Ok(i as f64),
            SqlValue::Decimal(d) => d
                .to_string()
                .parse::<f64>()
                .map_err(|_| mismatch::<Self>(SqlValue::Decimal(d))),
            SqlValue::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| mismatch::<Self>(SqlValue::String(s))),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Bool(b) => Ok(b),
            SqlValue::Int(i) => Ok(i != 0),
            SqlValue::Float(f) => Ok(f != 0.0),
            SqlValue::String(s) => Ok(matches!(
                s.trim().to_lowercase().as_str(),
                "true" | "1" | "yes" | "t"
            )),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl FromSqlValue for Decimal {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Decimal(d) => Ok(d),
            SqlValue::Int(i) => Ok(Decimal::from(i)),
            SqlValue::Float(f) => {
                Decimal::from_str(&f.to_string()).map_err(|_| mismatch::<Self>(SqlValue::Float(f)))
            }
            SqlValue::String(s) => {
                let trimmed = s.trim();
                Decimal::from_str(trimmed)
                    .or_else(|_| Decimal::from_scientific(trimmed))
                    .map_err(|_| mismatch::<Self>(SqlValue::String(s)))
            }
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl FromSqlValue for NaiveDate {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Date(d) => Ok(d),
            SqlValue::Timestamp(ts) => Ok(ts.date()),
            SqlValue::String(s) => parse_date(&s).ok_or_else(|| mismatch::<Self>(SqlValue::String(s))),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl FromSqlValue for NaiveDateTime {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Timestamp(ts) => Ok(ts),
            SqlValue::Date(d) => Ok(d.and_time(chrono::NaiveTime::MIN)),
            SqlValue::String(s) => {
                parse_timestamp(&s).ok_or_else(|| mismatch::<Self>(SqlValue::String(s)))
            }
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl FromSqlValue for JsonValue {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        Ok(value.to_json())
    }
}

impl<T: SqlType> SqlType for Option<T> {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::optional(T::type_descriptor())
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(&self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}

impl<T: SqlType> SqlType for Vec<T> {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::list(T::type_descriptor())
    }
}

impl<T: ToSqlValue> ToSqlValue for Vec<T> {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::List(self.iter().map(ToSqlValue::to_sql_value).collect())
    }
}

impl<T: FromSqlValue + SqlType> FromSqlValue for Vec<T> {
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::List(items) => items.into_iter().map(T::from_sql_value).collect(),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl<K: SqlType, V: SqlType> SqlType for HashMap<K, V> {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::map(K::type_descriptor(), V::type_descriptor())
    }
}

impl<K: ToSqlValue, V: ToSqlValue> ToSqlValue for HashMap<K, V> {
    fn to_sql_value(&self) -> SqlValue {
        let mut entries: Vec<(SqlValue, SqlValue)> = self
            .iter()
            .map(|(k, v)| (k.to_sql_value(), v.to_sql_value()))
            .collect();
        entries.sort_by_key(|(k, _)| k.to_string());
        SqlValue::Map(entries)
    }
}

impl<K, V> FromSqlValue for HashMap<K, V>
where
    K: FromSqlValue + SqlType + Eq + Hash,
    V: FromSqlValue + SqlType,
{
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((K::from_sql_value(k)?, V::from_sql_value(v)?)))
                .collect(),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl<K: SqlType, V: SqlType> SqlType for BTreeMap<K, V> {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::map(K::type_descriptor(), V::type_descriptor())
    }
}

impl<K: ToSqlValue, V: ToSqlValue> ToSqlValue for BTreeMap<K, V> {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Map(
            self.iter()
                .map(|(k, v)| (k.to_sql_value(), v.to_sql_value()))
                .collect(),
        )
    }
}

impl<K, V> FromSqlValue for BTreeMap<K, V>
where
    K: FromSqlValue + SqlType + Ord,
    V: FromSqlValue + SqlType,
{
    fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((K::from_sql_value(k)?, V::from_sql_value(v)?)))
                .collect(),
            other => Err(mismatch::<Self>(other)),
        }
    }
}
