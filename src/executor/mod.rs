mod recording;

pub use self::recording::RecordingExecutor;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Raw rows as the warehouse driver hands them back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Vec<JsonValue>>,
}

impl QueryResult {
    pub fn new(columns: Vec<ColumnInfo>, rows: Vec<Vec<JsonValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Connection to a live warehouse. Implementations own transport, auth and
/// retries; errors they return are passed through to the caller untouched.
#[async_trait]
pub trait WarehouseExecutor: Send + Sync {
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Runs a DDL or DML statement, returning the affected row count when the
    /// driver reports one.
    async fn execute_statement(&self, sql: &str) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_column_index_is_case_insensitive() {
        let result = QueryResult::new(
            vec![ColumnInfo::new("ID", "BIGINT"), ColumnInfo::new("name", "VARCHAR")],
            vec![vec![json!(1), json!("a")]],
        );
        assert_eq!(result.column_index("id"), Some(0));
        assert_eq!(result.column_index("NAME"), Some(1));
        assert_eq!(result.column_index("missing"), None);
    }

    #[tokio::test]
    async fn test_shared_executor_records_calls() {
        let executor = Arc::new(RecordingExecutor::new());
        executor.execute_statement("CREATE TABLE t AS SELECT 1").await.unwrap();
        let shared: Arc<dyn WarehouseExecutor> = executor.clone();
        shared.execute_query("SELECT 1").await.unwrap();
        assert_eq!(executor.statements(), vec!["CREATE TABLE t AS SELECT 1"]);
        assert_eq!(executor.queries(), vec!["SELECT 1"]);
    }
}
