use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::types::{unwrap_optional, Record, SqlValue, TypeDescriptor};
use crate::validation::{validate_column_name, validate_database_name, validate_table_name};

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: TypeDescriptor,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    /// Type with every optional layer removed, used for DDL and literals.
    pub fn schema_type(&self) -> &TypeDescriptor {
        unwrap_optional(&self.ty)
    }
}

/// In-memory stand-in for a warehouse table. The column schema is derived
/// once at construction; rows are stored aligned with it.
#[derive(Debug, Clone, PartialEq)]
pub struct MockTable {
    database: String,
    table: String,
    columns: Vec<ColumnDef>,
    rows: Vec<Vec<SqlValue>>,
}

impl MockTable {
    pub fn new(
        database: impl Into<String>,
        table: impl Into<String>,
        columns: Vec<ColumnDef>,
        rows: Vec<Vec<SqlValue>>,
    ) -> Result<Self> {
        let database = database.into();
        let table = table.into();
        validate_database_name(&database)?;
        validate_table_name(&table)?;
        for column in &columns {
            validate_column_name(&column.name)?;
        }
        if let Some(idx) = rows.iter().position(|r| r.len() != columns.len()) {
            return Err(Error::InvalidRequest(format!(
                "Row {} of {}.{} has {} values, expected {}",
                idx,
                database,
                table,
                rows[idx].len(),
                columns.len()
            )));
        }
        Ok(Self {
            database,
            table,
            columns,
            rows,
        })
    }

    pub fn from_records<T: Record>(
        database: impl Into<String>,
        table: impl Into<String>,
        records: &[T],
    ) -> Result<Self> {
        let descriptor = T::record_descriptor();
        let columns: Vec<ColumnDef> = descriptor
            .fields
            .iter()
            .map(|f| ColumnDef::new(f.name.clone(), f.ty.clone()))
            .collect();
        let rows = records
            .iter()
            .map(|record| {
                let mut fields = record.to_fields();
                columns
                    .iter()
                    .map(|c| match fields.iter().position(|(n, _)| *n == c.name) {
                        Some(idx) => fields.swap_remove(idx).1,
                        None => SqlValue::Null,
                    })
                    .collect()
            })
            .collect();
        Self::new(database, table, columns, rows)
    }

    /// Builds a table from JSON objects. Column order follows the key order of
    /// the objects; each column's type comes from its first non-null value.
    pub fn from_json_rows(
        database: impl Into<String>,
        table: impl Into<String>,
        rows: &[JsonValue],
    ) -> Result<Self> {
        let mut names: Vec<String> = Vec::new();
        for row in rows {
            let obj = row.as_object().ok_or_else(|| {
                Error::InvalidRequest(format!("Mock rows must be JSON objects, got: {}", row))
            })?;
            for key in obj.keys() {
                if !names.contains(key) {
                    names.push(key.clone());
                }
            }
        }

        let columns: Vec<ColumnDef> = names
            .iter()
            .map(|name| {
                let values: Vec<&JsonValue> = rows.iter().filter_map(|r| r.get(name)).collect();
                let has_null = values.len() < rows.len() || values.iter().any(|v| v.is_null());
                let ty = infer_type(values.into_iter());
                let ty = if has_null { TypeDescriptor::optional(ty) } else { ty };
                ColumnDef::new(name.clone(), ty)
            })
            .collect();

        let data = rows
            .iter()
            .map(|row| {
                names
                    .iter()
                    .map(|name| row.get(name).map(SqlValue::from_json).unwrap_or(SqlValue::Null))
                    .collect()
            })
            .collect();
        Self::new(database, table, columns, data)
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }

    /// `<database>__<table>_<tag>` with `-` and `.` in the database mapped to `_`.
    pub fn cte_alias(&self, tag: &str) -> String {
        format!(
            "{}__{}_{}",
            self.database.replace(['-', '.'], "_"),
            self.table,
            tag
        )
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<SqlValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Schema view: optional markers stripped.
    pub fn column_types(&self) -> Vec<(&str, &TypeDescriptor)> {
        self.columns
            .iter()
            .map(|c| (c.name.as_str(), c.schema_type()))
            .collect()
    }

    /// Decode view: types exactly as declared.
    pub fn full_column_types(&self) -> Vec<(&str, &TypeDescriptor)> {
        self.columns.iter().map(|c| (c.name.as_str(), &c.ty)).collect()
    }
}

fn infer_type<'a>(values: impl Iterator<Item = &'a JsonValue>) -> TypeDescriptor {
    let mut inferred: Option<TypeDescriptor> = None;
    for value in values {
        let ty = match value {
            JsonValue::Null => continue,
            JsonValue::Bool(_) => TypeDescriptor::boolean(),
            JsonValue::Number(n) if n.is_i64() || n.is_u64() => TypeDescriptor::integer(),
            JsonValue::Number(_) => TypeDescriptor::float(),
            JsonValue::String(_) => TypeDescriptor::string(),
            JsonValue::Array(items) => {
                TypeDescriptor::list(infer_type(items.iter()))
            }
            JsonValue::Object(obj) => {
                TypeDescriptor::map(TypeDescriptor::string(), infer_type(obj.values()))
            }
        };
        inferred = match inferred {
            None => Some(ty),
            // Integer columns widen to float once a fractional value shows up.
            Some(prev) if prev == TypeDescriptor::integer() && ty == TypeDescriptor::float() => {
                Some(ty)
            }
            Some(prev) => Some(prev),
        };
    }
    inferred.unwrap_or_else(TypeDescriptor::string)
}
