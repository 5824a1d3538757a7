use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

const MAX_IDENTIFIER_LEN: usize = 128;

static IDENTIFIER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("IDENTIFIER_REGEX pattern is valid")
});

// BigQuery project ids carry hyphens, so database parts allow them.
static DATABASE_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_-]*(\.[a-zA-Z_][a-zA-Z0-9_-]*)*$")
        .expect("DATABASE_NAME_REGEX pattern is valid")
});

// Sorted; looked up with a binary search.
const RESERVED_WORDS: &[&str] = &[
    "ALL", "AND", "ARRAY", "AS", "ASC", "BETWEEN", "BY", "CASE", "CAST", "CHECK", "COLUMN",
    "CONSTRAINT", "CREATE", "CROSS", "CURRENT", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP",
    "CURRENT_USER", "DATE", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE", "END",
    "EXCEPT", "EXISTS", "FALSE", "FETCH", "FOR", "FROM", "FULL", "GRANT", "GROUP", "HAVING", "IN",
    "INNER", "INSERT", "INTERSECT", "INTERVAL", "INTO", "IS", "JOIN", "LATERAL", "LEFT", "LIKE",
    "LIMIT", "MAP", "NATURAL", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER", "PARTITION",
    "RANGE", "RIGHT", "ROW", "ROWS", "SELECT", "SET", "TABLE", "THEN", "TIME", "TIMESTAMP", "TO",
    "TRUE", "UNION", "UNIQUE", "UNNEST", "UPDATE", "USER", "USING", "VALUES", "WHEN", "WHERE",
    "WINDOW", "WITH",
];

pub fn validate_table_name(name: &str) -> Result<()> {
    if name.len() > MAX_IDENTIFIER_LEN || !IDENTIFIER_REGEX.is_match(name) {
        return Err(Error::InvalidRequest(format!("Invalid table name: {}", name)));
    }
    Ok(())
}

pub fn validate_column_name(name: &str) -> Result<()> {
    if name.len() > MAX_IDENTIFIER_LEN || !IDENTIFIER_REGEX.is_match(name) {
        return Err(Error::InvalidRequest(format!("Invalid column name: {}", name)));
    }
    Ok(())
}

/// Database, schema or `project.dataset` style namespace.
pub fn validate_database_name(name: &str) -> Result<()> {
    if name.len() > MAX_IDENTIFIER_LEN || !DATABASE_NAME_REGEX.is_match(name) {
        return Err(Error::InvalidRequest(format!("Invalid database name: {}", name)));
    }
    Ok(())
}

/// Whether a column or field name must be quoted in generated SQL: it is a
/// reserved word in one of the supported engines, or not a plain identifier.
pub fn needs_quoting(name: &str) -> bool {
    !IDENTIFIER_REGEX.is_match(name)
        || RESERVED_WORDS
            .binary_search(&name.to_ascii_uppercase().as_str())
            .is_ok()
}
