use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::types::{classify, Kind, PrimitiveKind, TypeDescriptor};

/// Column type name used in typed NULLs, ROW casts and CREATE TABLE DDL.
pub fn sql_type_name(ty: &TypeDescriptor, dialect: Dialect) -> Result<String> {
    match classify(ty) {
        Kind::Optional(inner) => sql_type_name(inner, dialect),
        Kind::Primitive(kind) => Ok(primitive_type_name(kind, dialect).to_string()),
        Kind::List(elem) => {
            let elem = sql_type_name(elem, dialect);
            match dialect {
                Dialect::BigQuery => Ok(format!("ARRAY<{}>", elem?)),
                Dialect::Athena | Dialect::Trino => Ok(format!("ARRAY({})", elem?)),
                Dialect::DuckDb => Ok(format!("{}[]", elem?)),
                Dialect::Redshift => Ok("SUPER".to_string()),
                Dialect::Snowflake => Ok("ARRAY".to_string()),
            }
        }
        Kind::Map(key, value) => match dialect {
            Dialect::Athena | Dialect::Trino | Dialect::DuckDb => Ok(format!(
                "MAP({}, {})",
                sql_type_name(key, dialect)?,
                sql_type_name(value, dialect)?
            )),
            Dialect::Redshift => Ok("SUPER".to_string()),
            Dialect::Snowflake => Ok("OBJECT".to_string()),
            Dialect::BigQuery => Err(unsupported("Map", dialect)),
        },
        Kind::Record(rec) => match dialect {
            Dialect::Athena | Dialect::Trino => {
                let mut fields = Vec::with_capacity(rec.fields.len());
                for field in &rec.fields {
                    fields.push(format!(
                        "{} {}",
                        dialect.profile().column_identifier(&field.name),
                        sql_type_name(&field.ty, dialect)?
                    ));
                }
                Ok(format!("ROW({})", fields.join(", ")))
            }
            _ => Err(unsupported("Struct", dialect)),
        },
    }
}

pub(crate) fn unsupported(type_name: &str, dialect: Dialect) -> Error {
    Error::UnsupportedType {
        type_name: type_name.to_string(),
        dialect: dialect.name().to_string(),
    }
}

fn primitive_type_name(kind: PrimitiveKind, dialect: Dialect) -> &'static str {
    use PrimitiveKind::*;
    match dialect {
        Dialect::BigQuery => match kind {
            Integer => "INT64",
            Float => "FLOAT64",
            Boolean => "BOOL",
            Decimal => "NUMERIC",
            Date => "DATE",
            Timestamp => "DATETIME",
            String | NoneType | Unknown => "STRING",
        },
        Dialect::Athena | Dialect::Trino => match kind {
            Integer => "BIGINT",
            Float => "DOUBLE",
            Boolean => "BOOLEAN",
            Decimal => "DECIMAL(38,9)",
            Date => "DATE",
            Timestamp => "TIMESTAMP",
            String | NoneType | Unknown => "VARCHAR",
        },
        Dialect::Redshift => match kind {
            Integer => "BIGINT",
            Float => "DOUBLE PRECISION",
            Boolean => "BOOLEAN",
            Decimal => "DECIMAL(38,9)",
            Date => "DATE",
            Timestamp => "TIMESTAMP",
            String | NoneType | Unknown => "VARCHAR(1024)",
        },
        Dialect::Snowflake => match kind {
            Integer => "NUMBER(38,0)",
            Float => "FLOAT",
            Boolean => "BOOLEAN",
            Decimal => "NUMBER(38,9)",
            Date => "DATE",
            Timestamp => "TIMESTAMP_NTZ",
            String | NoneType | Unknown => "VARCHAR",
        },
        Dialect::DuckDb => match kind {
            Integer => "BIGINT",
            Float => "DOUBLE",
            Boolean => "BOOLEAN",
            Decimal => "DECIMAL(38,9)",
            Date => "DATE",
            Timestamp => "TIMESTAMP",
            String | NoneType | Unknown => "VARCHAR",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldDescriptor, RecordDescriptor};

    #[test]
    fn test_redshift_primitives() {
        assert_eq!(
            sql_type_name(&TypeDescriptor::decimal(), Dialect::Redshift).unwrap(),
            "DECIMAL(38,9)"
        );
        assert_eq!(
            sql_type_name(&TypeDescriptor::float(), Dialect::Redshift).unwrap(),
            "DOUBLE PRECISION"
        );
        assert_eq!(
            sql_type_name(&TypeDescriptor::string(), Dialect::Redshift).unwrap(),
            "VARCHAR(1024)"
        );
    }

    #[test]
    fn test_optional_uses_inner() {
        let ty = TypeDescriptor::optional(TypeDescriptor::integer());
        assert_eq!(sql_type_name(&ty, Dialect::BigQuery).unwrap(), "INT64");
    }

    #[test]
    fn test_nested_row_type() {
        let address = RecordDescriptor::new(
            "Address",
            vec![
                FieldDescriptor::new("street", TypeDescriptor::string()),
                FieldDescriptor::new("zip", TypeDescriptor::optional(TypeDescriptor::integer())),
            ],
        );
        let person = TypeDescriptor::Record(RecordDescriptor::new(
            "Person",
            vec![
                FieldDescriptor::new("name", TypeDescriptor::string()),
                FieldDescriptor::new("address", TypeDescriptor::Record(address)),
            ],
        ));
        assert_eq!(
            sql_type_name(&person, Dialect::Trino).unwrap(),
            "ROW(name VARCHAR, address ROW(street VARCHAR, zip BIGINT))"
        );
    }

    #[test]
    fn test_row_type_quotes_reserved_field_names() {
        let event = TypeDescriptor::Record(RecordDescriptor::new(
            "Event",
            vec![
                FieldDescriptor::new("date", TypeDescriptor::date()),
                FieldDescriptor::new("kind", TypeDescriptor::string()),
            ],
        ));
        assert_eq!(
            sql_type_name(&event, Dialect::Athena).unwrap(),
            "ROW(\"date\" DATE, kind VARCHAR)"
        );
    }

    #[test]
    fn test_struct_unsupported() {
        let rec = TypeDescriptor::Record(RecordDescriptor::new("Empty", vec![]));
        let err = sql_type_name(&rec, Dialect::Snowflake).unwrap_err();
        assert_eq!(err.to_string(), "Struct type not yet supported for dialect: snowflake");
    }

    #[test]
    fn test_list_and_map_types() {
        let list = TypeDescriptor::list(TypeDescriptor::integer());
        assert_eq!(sql_type_name(&list, Dialect::Athena).unwrap(), "ARRAY(BIGINT)");
        assert_eq!(sql_type_name(&list, Dialect::BigQuery).unwrap(), "ARRAY<INT64>");
        assert_eq!(sql_type_name(&list, Dialect::DuckDb).unwrap(), "BIGINT[]");
        let map = TypeDescriptor::map(TypeDescriptor::string(), TypeDescriptor::float());
        assert_eq!(sql_type_name(&map, Dialect::Trino).unwrap(), "MAP(VARCHAR, DOUBLE)");
        assert!(sql_type_name(&map, Dialect::BigQuery).is_err());
    }
}
