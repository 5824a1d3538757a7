use crate::converters::{encode_literal, encode_literal_into, sql_type_name};
use crate::dialect::{CteStyle, Dialect, DialectProfile, NullLiteral, PhysicalLoad};
use crate::domain::MockTable;
use crate::error::{Error, Result};
use crate::types::{SqlValue, TypeDescriptor};

pub(crate) const INSERT_BATCH_SIZE: usize = 1000;

/// Each row rendered as its list of column literals.
pub(crate) fn encode_rows(table: &MockTable, profile: &DialectProfile) -> Result<Vec<Vec<String>>> {
    let columns = table.columns();
    table
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .zip(columns)
                .map(|(value, column)| -> Result<String> {
                    let mut buf = String::new();
                    encode_literal_into(value, &column.ty, profile, &mut buf)
                        .map_err(|e| e.with_column(&column.name))?;
                    Ok(buf)
                })
                .collect()
        })
        .collect()
}

/// NULL that still carries the column type, so an empty table keeps its schema.
fn typed_null(ty: &TypeDescriptor, profile: &DialectProfile) -> Result<String> {
    if profile.null_literal != NullLiteral::Plain {
        return encode_literal(&SqlValue::Null, ty, profile);
    }
    match sql_type_name(ty, profile.dialect) {
        Ok(type_name) => Ok(format!("CAST(NULL AS {})", type_name)),
        Err(_) => Ok("NULL".to_string()),
    }
}

fn ensure_columns(table: &MockTable) -> Result<()> {
    if table.columns().is_empty() {
        return Err(Error::InvalidRequest(format!(
            "Mock table {} has no columns",
            table.qualified_name()
        )));
    }
    Ok(())
}

/// SELECT producing the mock rows, used as a CTE body and as the source of
/// create-as-select loads.
pub(crate) fn build_select(table: &MockTable, profile: &DialectProfile) -> Result<String> {
    ensure_columns(table)?;
    let columns = table.columns();

    if table.is_empty() {
        let mut parts = Vec::with_capacity(columns.len());
        for column in columns {
            parts.push(format!(
                "{} AS {}",
                typed_null(column.schema_type(), profile)?,
                profile.column_identifier(&column.name)
            ));
        }
        return Ok(format!("SELECT {} WHERE 1=0", parts.join(", ")));
    }

    let rows = encode_rows(table, profile)?;
    let mut sql = String::new();
    match profile.cte_style {
        CteStyle::Unnest => {
            sql.push_str("SELECT * FROM UNNEST([");
            for (i, row) in rows.iter().enumerate() {
                if i == 0 {
                    sql.push_str("STRUCT(");
                    push_aliased(&mut sql, row, table, profile);
                } else {
                    sql.push_str(", (");
                    sql.push_str(&row.join(", "));
                }
                sql.push(')');
            }
            sql.push_str("])");
        }
        CteStyle::UnionAll => {
            for (i, row) in rows.iter().enumerate() {
                if i == 0 {
                    sql.push_str("SELECT ");
                    push_aliased(&mut sql, row, table, profile);
                } else {
                    sql.push_str(" UNION ALL SELECT ");
                    sql.push_str(&row.join(", "));
                }
            }
        }
        CteStyle::Values => {
            sql.push_str("SELECT * FROM (VALUES ");
            for (i, row) in rows.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                sql.push('(');
                sql.push_str(&row.join(", "));
                sql.push(')');
            }
            sql.push_str(") AS t(");
            sql.push_str(&column_list(table, profile));
            sql.push(')');
        }
    }
    Ok(sql)
}

fn push_aliased(
    sql: &mut String,
    row: &[String],
    table: &MockTable,
    profile: &DialectProfile,
) {
    for (i, (literal, column)) in row.iter().zip(table.columns()).enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push_str(literal);
        sql.push_str(" AS ");
        sql.push_str(&profile.column_identifier(&column.name));
    }
}

fn column_list(table: &MockTable, profile: &DialectProfile) -> String {
    table
        .columns()
        .iter()
        .map(|c| profile.column_identifier(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn build_cte(alias: &str, table: &MockTable, profile: &DialectProfile) -> Result<String> {
    Ok(format!("{} AS ({})", alias, build_select(table, profile)?))
}

/// Size of the inline CTE for `table`, in bytes of SQL text.
pub fn estimate_inline_size(table: &MockTable, profile: &DialectProfile) -> Result<usize> {
    Ok(build_select(table, profile)?.len())
}

/// Table path as it appears in generated SQL. BigQuery paths go in a single
/// backtick pair since project ids may contain hyphens.
pub(crate) fn render_table_path(parts: &[&str], profile: &DialectProfile) -> String {
    let joined = parts.join(".");
    if profile.dialect == Dialect::BigQuery {
        profile.quote_identifier(&joined)
    } else {
        joined
    }
}

pub(crate) fn build_create_statements(
    path: &str,
    table: &MockTable,
    profile: &DialectProfile,
) -> Result<Vec<String>> {
    match profile.physical_load {
        PhysicalLoad::CreateAsSelect => Ok(vec![format!(
            "CREATE TABLE {} AS {}",
            path,
            build_select(table, profile)?
        )]),
        PhysicalLoad::CreateTemporaryAsSelect => Ok(vec![format!(
            "CREATE TEMPORARY TABLE {} AS {}",
            path,
            build_select(table, profile)?
        )]),
        PhysicalLoad::CreateThenInsert => {
            ensure_columns(table)?;
            let mut defs = Vec::with_capacity(table.columns().len());
            for column in table.columns() {
                defs.push(format!(
                    "{} {}",
                    profile.column_identifier(&column.name),
                    sql_type_name(column.schema_type(), profile.dialect)?
                ));
            }
            let mut statements = vec![format!(
                "CREATE TEMPORARY TABLE {} ({})",
                path,
                defs.join(", ")
            )];
            let rows = encode_rows(table, profile)?;
            let values: Vec<String> = rows.iter().map(|r| format!("({})", r.join(", "))).collect();
            let columns = column_list(table, profile);
            for chunk in values.chunks(INSERT_BATCH_SIZE) {
                statements.push(build_insert_sql(path, &columns, chunk));
            }
            Ok(statements)
        }
    }
}

pub(crate) fn build_insert_sql(path: &str, columns: &str, values: &[String]) -> String {
    let values_len: usize = values.iter().map(|v| v.len() + 2).sum();
    let mut sql = String::with_capacity(24 + path.len() + columns.len() + values_len);
    sql.push_str("INSERT INTO ");
    sql.push_str(path);
    sql.push_str(" (");
    sql.push_str(columns);
    sql.push_str(") VALUES ");
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push_str(v);
    }
    sql
}

pub(crate) fn build_drop_sql(path: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{ATHENA, BIGQUERY, DUCKDB, REDSHIFT, SNOWFLAKE, TRINO};
    use crate::domain::ColumnDef;

    fn users(rows: Vec<Vec<SqlValue>>) -> MockTable {
        MockTable::new(
            "db",
            "users",
            vec![
                ColumnDef::new("id", TypeDescriptor::integer()),
                ColumnDef::new("name", TypeDescriptor::optional(TypeDescriptor::string())),
            ],
            rows,
        )
        .unwrap()
    }

    fn two_rows() -> MockTable {
        users(vec![
            vec![SqlValue::Int(1), SqlValue::String("Alice".into())],
            vec![SqlValue::Int(2), SqlValue::Null],
        ])
    }

    #[test]
    fn test_union_all_select() {
        assert_eq!(
            build_select(&two_rows(), &TRINO).unwrap(),
            "SELECT 1 AS id, 'Alice' AS name UNION ALL SELECT 2, CAST(NULL AS VARCHAR)"
        );
    }

    #[test]
    fn test_unnest_select() {
        assert_eq!(
            build_select(&two_rows(), &BIGQUERY).unwrap(),
            "SELECT * FROM UNNEST([STRUCT(1 AS id, 'Alice' AS name), (2, NULL)])"
        );
    }

    #[test]
    fn test_values_select() {
        assert_eq!(
            build_select(&two_rows(), &SNOWFLAKE).unwrap(),
            "SELECT * FROM (VALUES (1, 'Alice'), (2, NULL)) AS t(id, name)"
        );
    }

    #[test]
    fn test_empty_table_is_typed() {
        assert_eq!(
            build_select(&users(vec![]), &DUCKDB).unwrap(),
            "SELECT CAST(NULL AS BIGINT) AS id, CAST(NULL AS VARCHAR) AS name WHERE 1=0"
        );
        assert_eq!(
            build_select(&users(vec![]), &REDSHIFT).unwrap(),
            "SELECT NULL::BIGINT AS id, NULL::VARCHAR(1024) AS name WHERE 1=0"
        );
    }

    #[test]
    fn test_no_columns_rejected() {
        let table = MockTable::new("db", "t", vec![], vec![]).unwrap();
        assert!(matches!(build_select(&table, &TRINO), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_encode_error_carries_column() {
        let table = users(vec![vec![SqlValue::String("x".into()), SqlValue::Null]]);
        match build_select(&table, &TRINO).unwrap_err() {
            Error::TypeConversion { column, .. } => assert_eq!(column.as_deref(), Some("id")),
            other => panic!("Expected TypeConversion, got {:?}", other),
        }
    }

    #[test]
    fn test_estimate_matches_select_length() {
        let table = two_rows();
        assert_eq!(
            estimate_inline_size(&table, &ATHENA).unwrap(),
            build_select(&table, &ATHENA).unwrap().len()
        );
    }

    #[test]
    fn test_create_as_select() {
        let stmts = build_create_statements("db.temp_users_x", &two_rows(), &TRINO).unwrap();
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].starts_with("CREATE TABLE db.temp_users_x AS SELECT 1 AS id"));
    }

    #[test]
    fn test_create_temporary_as_select() {
        let stmts = build_create_statements("temp_users_x", &two_rows(), &REDSHIFT).unwrap();
        assert!(stmts[0].starts_with("CREATE TEMPORARY TABLE temp_users_x AS SELECT"));
    }

    #[test]
    fn test_create_then_insert_batches() {
        let rows = (0..2500)
            .map(|i| vec![SqlValue::Int(i), SqlValue::Null])
            .collect();
        let stmts = build_create_statements("temp_users_x", &users(rows), &DUCKDB).unwrap();
        assert_eq!(stmts.len(), 4);
        assert_eq!(stmts[0], "CREATE TEMPORARY TABLE temp_users_x (id BIGINT, name VARCHAR)");
        assert!(stmts[1].starts_with("INSERT INTO temp_users_x (id, name) VALUES (0, NULL), (1, NULL)"));
        assert_eq!(stmts[3].matches("), (").count(), 499);
    }

    fn reserved_columns() -> MockTable {
        MockTable::new(
            "db",
            "orders",
            vec![
                ColumnDef::new("order", TypeDescriptor::integer()),
                ColumnDef::new("date", TypeDescriptor::string()),
            ],
            vec![vec![SqlValue::Int(1), SqlValue::String("x".into())]],
        )
        .unwrap()
    }

    #[test]
    fn test_reserved_column_names_are_quoted() {
        assert_eq!(
            build_select(&reserved_columns(), &TRINO).unwrap(),
            "SELECT 1 AS \"order\", 'x' AS \"date\""
        );
        assert_eq!(
            build_select(&reserved_columns(), &BIGQUERY).unwrap(),
            "SELECT * FROM UNNEST([STRUCT(1 AS `order`, 'x' AS `date`)])"
        );
        assert_eq!(
            build_select(&reserved_columns(), &SNOWFLAKE).unwrap(),
            "SELECT * FROM (VALUES (1, 'x')) AS t(\"order\", \"date\")"
        );

        let stmts = build_create_statements("temp_orders_x", &reserved_columns(), &DUCKDB).unwrap();
        assert_eq!(
            stmts[0],
            "CREATE TEMPORARY TABLE temp_orders_x (\"order\" BIGINT, \"date\" VARCHAR)"
        );
        assert!(stmts[1].starts_with("INSERT INTO temp_orders_x (\"order\", \"date\") VALUES"));
    }

    #[test]
    fn test_create_then_insert_empty_table() {
        let stmts = build_create_statements("temp_users_x", &users(vec![]), &DUCKDB).unwrap();
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn test_render_table_path() {
        assert_eq!(
            render_table_path(&["my-project.sales", "temp_x"], &BIGQUERY),
            "`my-project.sales.temp_x`"
        );
        assert_eq!(render_table_path(&["db", "temp_x"], &TRINO), "db.temp_x");
    }

    #[test]
    fn test_build_insert_and_drop_sql() {
        let values = vec!["(1, 'a')".to_string(), "(2, 'b')".to_string()];
        assert_eq!(
            build_insert_sql("t", "id, name", &values),
            "INSERT INTO t (id, name) VALUES (1, 'a'), (2, 'b')"
        );
        assert_eq!(build_drop_sql("db.t"), "DROP TABLE IF EXISTS db.t");
    }
}
