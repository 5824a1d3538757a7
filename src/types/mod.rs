mod classify;
mod record;
pub(crate) mod value;

pub use classify::{classify, classify_fields, is_optional, unwrap_optional, Kind};
pub use record::{
    construct_record, from_fields_via_serde, record_from_value, FieldValues, FromSqlValue, Record,
    SqlType, ToSqlValue,
};
pub use value::SqlValue;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    String,
    Integer,
    Float,
    Boolean,
    Decimal,
    Date,
    Timestamp,
    NoneType,
    Unknown,
}

impl PrimitiveKind {
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Integer => "integer",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Decimal => "decimal",
            PrimitiveKind::Date => "date",
            PrimitiveKind::Timestamp => "timestamp",
            PrimitiveKind::NoneType => "none",
            PrimitiveKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: TypeDescriptor,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Named, ordered field list of a record type. Field order is significant:
/// positional (tuple-form) decoding zips against it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl RecordDescriptor {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Primitive(PrimitiveKind),
    Optional(Box<TypeDescriptor>),
    /// Raw union of member types. A two-member union with one `NoneType`
    /// member classifies exactly like `Optional`.
    Union(Vec<TypeDescriptor>),
    Record(RecordDescriptor),
    List(Box<TypeDescriptor>),
    Map(Box<TypeDescriptor>, Box<TypeDescriptor>),
}

impl TypeDescriptor {
    pub fn string() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::String)
    }

    pub fn integer() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Integer)
    }

    pub fn float() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Float)
    }

    pub fn boolean() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Boolean)
    }

    pub fn decimal() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Decimal)
    }

    pub fn date() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Date)
    }

    pub fn timestamp() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Timestamp)
    }

    /// Wraps `inner` as optional. An inner type that is already optional is
    /// returned as is, so Optional never wraps Optional.
    pub fn optional(inner: TypeDescriptor) -> Self {
        if is_optional(&inner) {
            inner
        } else {
            TypeDescriptor::Optional(Box::new(inner))
        }
    }

    pub fn list(element: TypeDescriptor) -> Self {
        TypeDescriptor::List(Box::new(element))
    }

    pub fn map(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        TypeDescriptor::Map(Box::new(key), Box::new(value))
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Primitive(kind) => write!(f, "{}", kind.name()),
            TypeDescriptor::Optional(inner) => write!(f, "Optional[{}]", inner),
            TypeDescriptor::Union(members) => {
                write!(f, "Union[")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", m)?;
                }
                write!(f, "]")
            }
            TypeDescriptor::Record(rec) => write!(f, "{}", rec.name),
            TypeDescriptor::List(elem) => write!(f, "List[{}]", elem),
            TypeDescriptor::Map(k, v) => write!(f, "Map[{}, {}]", k, v),
        }
    }
}
