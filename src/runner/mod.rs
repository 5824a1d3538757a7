mod context;

pub use context::{CreatedTable, RunContext, Stage};

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::{PlanningConfig, RunnerConfig};
use crate::converters::decode_value;
use crate::dialect::{Dialect, DialectProfile};
use crate::domain::MockTable;
use crate::error::{Error, Result};
use crate::executor::{QueryResult, WarehouseExecutor};
use crate::metrics;
use crate::parser::parse_query;
use crate::planner::{plan, RewritePlan};
use crate::resolver::resolve;
use crate::types::{construct_record, FieldValues, Record, RecordDescriptor};

/// One query under test plus the mock tables standing in for its sources.
#[derive(Debug, Clone, Default)]
pub struct TestCase {
    pub query: String,
    /// Namespace unqualified table references resolve against.
    pub execution_namespace: String,
    pub mock_tables: Vec<MockTable>,
    pub force_physical: bool,
    pub description: Option<String>,
}

impl TestCase {
    pub fn new(query: impl Into<String>, execution_namespace: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            execution_namespace: execution_namespace.into(),
            ..Default::default()
        }
    }

    pub fn with_mock_table(mut self, table: MockTable) -> Self {
        self.mock_tables.push(table);
        self
    }

    pub fn with_mock_tables(mut self, tables: impl IntoIterator<Item = MockTable>) -> Self {
        self.mock_tables.extend(tables);
        self
    }

    pub fn force_physical(mut self, force: bool) -> Self {
        self.force_physical = force;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

pub struct SqlTestRunner {
    executor: Arc<dyn WarehouseExecutor>,
    dialect: Dialect,
    planning: PlanningConfig,
}

impl SqlTestRunner {
    pub fn new(executor: Arc<dyn WarehouseExecutor>, dialect: Dialect) -> Self {
        Self {
            executor,
            dialect,
            planning: PlanningConfig::default(),
        }
    }

    pub fn with_config(mut self, config: &RunnerConfig) -> Self {
        self.planning = config.planning.clone();
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn profile(&self) -> &'static DialectProfile {
        self.dialect.profile()
    }

    /// Builds the rewrite plan for `case` without touching the warehouse.
    pub fn plan(&self, case: &TestCase, ctx: &mut RunContext) -> Result<RewritePlan> {
        if case.mock_tables.is_empty() {
            return Err(Error::MissingConfiguration(
                "No mock tables supplied for the test case".into(),
            ));
        }

        ctx.enter(Stage::Parse);
        let parsed = parse_query(&case.query, self.dialect)?;

        ctx.enter(Stage::Resolve);
        let resolved = resolve(&parsed.table_refs, &case.mock_tables, &case.execution_namespace)?;

        ctx.enter(Stage::Plan);
        let options = self.planning.plan_options(case.force_physical);
        plan(&parsed, &resolved, self.profile(), &options, ctx.names())
    }

    /// Runs the query against the mock tables and decodes every row into `T`.
    /// Physical tables created along the way are dropped whatever the outcome.
    ///
    /// Cleanup runs inside this future. If the future is dropped before it
    /// completes (for example under `tokio::time::timeout`), no DROP is issued;
    /// the tables left behind are logged at `warn` with the run id and counted
    /// in `sql_test_leaked_tables_total`.
    pub async fn run<T: Record>(&self, case: &TestCase) -> Result<Vec<T>> {
        let mut ctx = RunContext::new();
        let start = Instant::now();
        metrics::record_run_started(self.dialect);
        info!(
            run_id = %ctx.run_id(),
            dialect = self.dialect.name(),
            mock_tables = case.mock_tables.len(),
            description = case.description.as_deref().unwrap_or(""),
            "Starting SQL test run"
        );

        let outcome = self.run_stages::<T>(case, &mut ctx).await;
        if let Err(e) = &outcome {
            warn!(
                run_id = %ctx.run_id(),
                stage = ctx.stage().as_str(),
                error = %e,
                "SQL test run failed"
            );
            metrics::record_run_failed(e.kind());
        }

        self.cleanup(&mut ctx).await;
        metrics::record_run_duration(self.dialect, start);

        if let Ok(rows) = &outcome {
            info!(run_id = %ctx.run_id(), rows = rows.len(), "SQL test run finished");
        }
        outcome
    }

    async fn run_stages<T: Record>(&self, case: &TestCase, ctx: &mut RunContext) -> Result<Vec<T>> {
        let plan = self.plan(case, ctx)?;

        ctx.enter(Stage::Setup);
        for table in &plan.physical_tables {
            for (i, statement) in table.setup.iter().enumerate() {
                self.executor.execute_statement(statement).await?;
                if i == 0 {
                    ctx.record_created(table);
                    debug!(run_id = %ctx.run_id(), table = %table.path, "Created physical table");
                }
            }
        }

        ctx.enter(Stage::Execute);
        let result = self.executor.execute_query(&plan.final_query).await?;

        ctx.enter(Stage::Decode);
        self.decode_rows(&result)
    }

    fn decode_rows<T: Record>(&self, result: &QueryResult) -> Result<Vec<T>> {
        let descriptor = T::record_descriptor();
        result
            .rows
            .iter()
            .map(|row| {
                let fields = self.decode_row(result, row, &descriptor)?;
                construct_record::<T>(fields)
            })
            .collect()
    }

    fn decode_row(
        &self,
        result: &QueryResult,
        row: &[serde_json::Value],
        descriptor: &RecordDescriptor,
    ) -> Result<FieldValues> {
        let mut fields = FieldValues::new();
        for (column, raw) in result.columns.iter().zip(row) {
            // Columns the record does not declare are ignored.
            let Some(field) = descriptor
                .fields
                .iter()
                .find(|f| f.name.eq_ignore_ascii_case(&column.name))
            else {
                continue;
            };
            let value = decode_value(raw, &field.ty, self.profile())
                .map_err(|e| e.with_column(&field.name))?;
            fields.insert(field.name.clone(), value);
        }
        Ok(fields)
    }

    async fn cleanup(&self, ctx: &mut RunContext) {
        ctx.enter(Stage::Cleanup);
        for statement in ctx.take_teardown() {
            if let Err(e) = self.executor.execute_statement(&statement).await {
                warn!(
                    run_id = %ctx.run_id(),
                    statement = %statement,
                    error = %e,
                    "Failed to drop physical table"
                );
                metrics::record_cleanup_failure();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ColumnDef;
    use crate::executor::{ColumnInfo, RecordingExecutor};
    use crate::types::{SqlValue, TypeDescriptor};
    use crate::Record;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Record)]
    struct User {
        id: i64,
        name: Option<String>,
    }

    fn users_table() -> MockTable {
        MockTable::from_records(
            "db",
            "users",
            &[
                User {
                    id: 1,
                    name: Some("Alice".into()),
                },
                User { id: 2, name: None },
            ],
        )
        .unwrap()
    }

    fn users_result() -> QueryResult {
        QueryResult::new(
            vec![ColumnInfo::new("id", "BIGINT"), ColumnInfo::new("name", "VARCHAR")],
            vec![vec![json!(1), json!("Alice")], vec![json!("2"), json!(null)]],
        )
    }

    fn runner(executor: &Arc<RecordingExecutor>, dialect: Dialect) -> SqlTestRunner {
        SqlTestRunner::new(executor.clone(), dialect)
    }

    /// Passes statements through but never answers a query.
    struct StalledQueries(Arc<RecordingExecutor>);

    #[async_trait::async_trait]
    impl WarehouseExecutor for StalledQueries {
        async fn execute_query(&self, _sql: &str) -> Result<QueryResult> {
            std::future::pending().await
        }

        async fn execute_statement(&self, sql: &str) -> Result<u64> {
            self.0.execute_statement(sql).await
        }
    }

    #[tokio::test]
    async fn test_inline_run_decodes_rows() {
        let executor = Arc::new(RecordingExecutor::new().with_result(users_result()));
        let case = TestCase::new("SELECT id, name FROM users", "db").with_mock_table(users_table());

        let rows: Vec<User> = runner(&executor, Dialect::Trino).run(&case).await.unwrap();

        assert_eq!(
            rows,
            vec![
                User {
                    id: 1,
                    name: Some("Alice".into())
                },
                User { id: 2, name: None },
            ]
        );
        assert!(executor.statements().is_empty());
        let queries = executor.queries();
        assert_eq!(queries.len(), 1);
        assert!(queries[0].starts_with("WITH db__users_"));
    }

    #[tokio::test]
    async fn test_missing_mock_tables() {
        let executor = Arc::new(RecordingExecutor::new());
        let case = TestCase::new("SELECT 1", "db");
        let err = runner(&executor, Dialect::DuckDb)
            .run::<User>(&case)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingConfiguration(_)));
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_physical_run_creates_and_drops() {
        let executor = Arc::new(RecordingExecutor::new().with_result(users_result()));
        let case = TestCase::new("SELECT * FROM db.users", "db")
            .with_mock_table(users_table())
            .force_physical(true);

        let rows: Vec<User> = runner(&executor, Dialect::Snowflake).run(&case).await.unwrap();
        assert_eq!(rows.len(), 2);

        let created = executor.created_tables();
        assert_eq!(created.len(), 1);
        assert!(created[0].starts_with("db.temp_users_"));
        assert_eq!(executor.dropped_tables(), created);
        assert_eq!(executor.queries()[0], format!("SELECT * FROM {}", created[0]));
    }

    #[tokio::test]
    async fn test_cancelled_run_skips_cleanup() {
        let recording = Arc::new(RecordingExecutor::new());
        let executor = Arc::new(StalledQueries(recording.clone()));
        let sql_runner = SqlTestRunner::new(executor, Dialect::DuckDb);
        let case = TestCase::new("SELECT * FROM users", "db")
            .with_mock_table(users_table())
            .force_physical(true);

        tokio::select! {
            biased;
            _ = sql_runner.run::<User>(&case) => panic!("stalled query completed"),
            _ = async {} => {}
        }

        assert_eq!(recording.created_tables().len(), 1);
        assert!(recording.dropped_tables().is_empty());
    }

    #[tokio::test]
    async fn test_query_failure_still_cleans_up() {
        let executor = Arc::new(RecordingExecutor::new().fail_when(|sql| sql.starts_with("SELECT")));
        let case = TestCase::new("SELECT * FROM users", "db")
            .with_mock_table(users_table())
            .force_physical(true);

        let err = runner(&executor, Dialect::DuckDb)
            .run::<User>(&case)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Executor(_)));
        assert_eq!(executor.created_tables().len(), 1);
        assert_eq!(executor.dropped_tables(), executor.created_tables());
    }

    #[tokio::test]
    async fn test_decode_error_names_column() {
        let result = QueryResult::new(
            vec![ColumnInfo::new("id", "BIGINT")],
            vec![vec![json!("not a number")]],
        );
        let executor = Arc::new(RecordingExecutor::new().with_result(result));
        let case = TestCase::new("SELECT id FROM users", "db").with_mock_table(users_table());

        match runner(&executor, Dialect::Athena).run::<User>(&case).await.unwrap_err() {
            Error::TypeConversion { column, .. } => assert_eq!(column.as_deref(), Some("id")),
            other => panic!("Expected TypeConversion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_columns_are_ignored_and_case_folded() {
        let result = QueryResult::new(
            vec![
                ColumnInfo::new("ID", "NUMBER"),
                ColumnInfo::new("NAME", "VARCHAR"),
                ColumnInfo::new("EXTRA", "VARCHAR"),
            ],
            vec![vec![json!(7), json!("Bo"), json!("x")]],
        );
        let executor = Arc::new(RecordingExecutor::new().with_result(result));
        let case = TestCase::new("SELECT * FROM users", "db").with_mock_table(users_table());

        let rows: Vec<User> = runner(&executor, Dialect::Snowflake).run(&case).await.unwrap();
        assert_eq!(
            rows,
            vec![User {
                id: 7,
                name: Some("Bo".into())
            }]
        );
    }

    #[test]
    fn test_plan_uses_config_limit() {
        let executor = Arc::new(RecordingExecutor::new());
        let config = RunnerConfig::load(Some(
            "[planning]\ninline_size_limit = 200\nallow_physical_fallback = true\n",
        ))
        .unwrap();
        let runner = runner(&executor, Dialect::Trino).with_config(&config);
        let users: Vec<User> = (0..20)
            .map(|id| User {
                id,
                name: Some(format!("user_{}", id)),
            })
            .collect();
        let case = TestCase::new("SELECT * FROM users", "db")
            .with_mock_table(MockTable::from_records("db", "users", &users).unwrap());

        let plan = runner.plan(&case, &mut RunContext::new()).unwrap();
        assert_eq!(plan.physical_tables.len(), 1);
    }

    #[test]
    fn test_plan_stage_is_tracked_on_failure() {
        let executor = Arc::new(RecordingExecutor::new());
        let case = TestCase::new("SELECT * FROM orders", "db").with_mock_table(
            MockTable::new(
                "db",
                "users",
                vec![ColumnDef::new("id", TypeDescriptor::integer())],
                vec![vec![SqlValue::Int(1)]],
            )
            .unwrap(),
        );
        let mut ctx = RunContext::new();
        let err = runner(&executor, Dialect::Trino).plan(&case, &mut ctx).unwrap_err();
        assert!(matches!(err, Error::TableNotFound { .. }));
        assert_eq!(ctx.stage(), Stage::Resolve);
    }
}
