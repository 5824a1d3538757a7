use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to parse SQL: {message}")]
    Parse { query: String, message: String },

    #[error("Mock table not found: '{table}'. Available: {}", render_available(.available))]
    TableNotFound {
        table: String,
        available: Vec<String>,
    },

    #[error(
        "Query size ({actual_size} bytes) exceeds the {dialect} limit of {limit} bytes. \
         Enable physical tables (force_physical or allow_physical_fallback) to run large mock datasets"
    )]
    SizeLimitExceeded {
        actual_size: usize,
        limit: usize,
        dialect: String,
    },

    #[error("Cannot convert '{value}' to {target_type}{}", render_column(.column))]
    TypeConversion {
        value: String,
        target_type: String,
        column: Option<String>,
    },

    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("{type_name} type not yet supported for dialect: {dialect}")]
    UnsupportedType { type_name: String, dialect: String },

    #[error("Executor error: {0}")]
    Executor(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn render_available(available: &[String]) -> String {
    if available.is_empty() {
        "None".to_string()
    } else {
        available.join(", ")
    }
}

fn render_column(column: &Option<String>) -> String {
    match column {
        Some(c) => format!(" for column '{}'", c),
        None => String::new(),
    }
}

impl Error {
    pub fn type_conversion(value: impl ToString, target_type: impl ToString) -> Self {
        Error::TypeConversion {
            value: value.to_string(),
            target_type: target_type.to_string(),
            column: None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Error::Parse { .. } => "parse",
            Error::TableNotFound { .. } => "table_not_found",
            Error::SizeLimitExceeded { .. } => "size_limit_exceeded",
            Error::TypeConversion { .. } => "type_conversion",
            Error::MissingConfiguration(_) => "missing_configuration",
            Error::UnsupportedType { .. } => "unsupported_type",
            Error::Executor(_) => "executor",
            Error::InvalidRequest(_) => "invalid_request",
            Error::Json(_) => "json",
        }
    }

    pub fn with_column(self, column: &str) -> Self {
        match self {
            Error::TypeConversion {
                value,
                target_type,
                column: None,
            } => Error::TypeConversion {
                value,
                target_type,
                column: Some(column.to_string()),
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_parse() {
        let err = Error::Parse {
            query: "SELECT * FROM".to_string(),
            message: "Expected identifier".to_string(),
        };
        assert_eq!(format!("{}", err), "Failed to parse SQL: Expected identifier");
    }

    #[test]
    fn test_error_display_table_not_found() {
        let err = Error::TableNotFound {
            table: "db.missing_table".to_string(),
            available: vec!["db.users".to_string(), "db.orders".to_string()],
        };
        assert_eq!(
            format!("{}", err),
            "Mock table not found: 'db.missing_table'. Available: db.users, db.orders"
        );
    }

    #[test]
    fn test_error_display_table_not_found_none_available() {
        let err = Error::TableNotFound {
            table: "test.table".to_string(),
            available: vec![],
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Mock table not found: 'test.table'"));
        assert!(msg.ends_with("Available: None"));
    }

    #[test]
    fn test_error_display_size_limit_mentions_physical_tables() {
        let err = Error::SizeLimitExceeded {
            actual_size: 2000,
            limit: 1000,
            dialect: "athena".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("2000"));
        assert!(msg.contains("1000"));
        assert!(msg.contains("athena"));
        assert!(msg.contains("physical tables"));
    }

    #[test]
    fn test_error_display_type_conversion_with_column() {
        let err = Error::TypeConversion {
            value: "not_a_number".to_string(),
            target_type: "integer".to_string(),
            column: Some("user_id".to_string()),
        };
        assert_eq!(
            format!("{}", err),
            "Cannot convert 'not_a_number' to integer for column 'user_id'"
        );
    }

    #[test]
    fn test_error_display_type_conversion_without_column() {
        let err = Error::type_conversion("invalid", "float");
        assert_eq!(format!("{}", err), "Cannot convert 'invalid' to float");
    }

    #[test]
    fn test_error_display_unsupported_type() {
        let err = Error::UnsupportedType {
            type_name: "Struct".to_string(),
            dialect: "bigquery".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Struct type not yet supported for dialect: bigquery"
        );
    }

    #[test]
    fn test_error_display_missing_configuration() {
        let err = Error::MissingConfiguration("mock_tables must be provided".to_string());
        assert_eq!(
            format!("{}", err),
            "Missing configuration: mock_tables must be provided"
        );
    }

    #[test]
    fn test_error_display_executor() {
        let err = Error::Executor("connection reset".to_string());
        assert_eq!(format!("{}", err), "Executor error: connection reset");
    }

    #[test]
    fn test_with_column_sets_missing_column() {
        let err = Error::type_conversion("abc", "integer").with_column("age");
        match err {
            Error::TypeConversion { column, .. } => assert_eq!(column.as_deref(), Some("age")),
            _ => panic!("Expected TypeConversion variant"),
        }
    }

    #[test]
    fn test_with_column_keeps_innermost_column() {
        let err = Error::type_conversion("abc", "integer")
            .with_column("zip")
            .with_column("address");
        match err {
            Error::TypeConversion { column, .. } => assert_eq!(column.as_deref(), Some("zip")),
            _ => panic!("Expected TypeConversion variant"),
        }
    }

    #[test]
    fn test_with_column_passthrough() {
        let err = Error::Executor("boom".to_string()).with_column("c");
        assert!(matches!(err, Error::Executor(msg) if msg == "boom"));
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(Error::MissingConfiguration("x".into()).kind(), "missing_configuration");
        assert_eq!(Error::type_conversion("a", "b").kind(), "type_conversion");
        assert_eq!(
            Error::TableNotFound {
                table: "a.b".into(),
                available: vec![]
            }
            .kind(),
            "table_not_found"
        );
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err: serde_json::Error = serde_json::from_str::<()>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
        assert_eq!(err.kind(), "json");
    }
}
