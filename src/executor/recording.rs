use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{QueryResult, WarehouseExecutor};
use crate::error::{Error, Result};

type FailurePredicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Statement(String),
    Query(String),
}

impl RecordedCall {
    pub fn sql(&self) -> &str {
        match self {
            RecordedCall::Statement(sql) | RecordedCall::Query(sql) => sql,
        }
    }
}

#[derive(Default)]
struct State {
    calls: Vec<RecordedCall>,
    results: VecDeque<QueryResult>,
    created: Vec<String>,
    dropped: Vec<String>,
}

/// In-process stand-in for a warehouse connection. Records every call, hands
/// back scripted query results in order and fails any SQL the predicate
/// matches.
#[derive(Default)]
pub struct RecordingExecutor {
    state: Mutex<State>,
    default_result: QueryResult,
    fail_when: Option<FailurePredicate>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result returned once the scripted queue is exhausted.
    pub fn with_default_result(mut self, result: QueryResult) -> Self {
        self.default_result = result;
        self
    }

    pub fn with_result(self, result: QueryResult) -> Self {
        self.state.lock().results.push_back(result);
        self
    }

    pub fn fail_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.fail_when = Some(Box::new(predicate));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    pub fn statements(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                RecordedCall::Statement(sql) => Some(sql.clone()),
                RecordedCall::Query(_) => None,
            })
            .collect()
    }

    pub fn queries(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                RecordedCall::Query(sql) => Some(sql.clone()),
                RecordedCall::Statement(_) => None,
            })
            .collect()
    }

    /// Tables whose CREATE statement succeeded.
    pub fn created_tables(&self) -> Vec<String> {
        self.state.lock().created.clone()
    }

    /// Tables whose DROP statement succeeded.
    pub fn dropped_tables(&self) -> Vec<String> {
        self.state.lock().dropped.clone()
    }

    fn check_failure(&self, sql: &str) -> Result<()> {
        match &self.fail_when {
            Some(predicate) if predicate(sql) => Err(Error::Executor(format!(
                "Injected failure for: {}",
                truncate(sql, 80)
            ))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl WarehouseExecutor for RecordingExecutor {
    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        self.state.lock().calls.push(RecordedCall::Query(sql.to_string()));
        self.check_failure(sql)?;
        let mut state = self.state.lock();
        Ok(state
            .results
            .pop_front()
            .unwrap_or_else(|| self.default_result.clone()))
    }

    async fn execute_statement(&self, sql: &str) -> Result<u64> {
        self.state
            .lock()
            .calls
            .push(RecordedCall::Statement(sql.to_string()));
        self.check_failure(sql)?;

        let mut state = self.state.lock();
        if let Some(name) = extract_table_name_from_create(sql) {
            state.created.push(name);
        } else if let Some(name) = extract_table_name_from_drop(sql) {
            state.dropped.push(name);
        }
        Ok(0)
    }
}

fn truncate(sql: &str, max: usize) -> &str {
    match sql.char_indices().nth(max) {
        Some((idx, _)) => &sql[..idx],
        None => sql,
    }
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| text[prefix.len()..].trim_start())
}

fn extract_table_name_from_create(sql: &str) -> Option<String> {
    let rest = strip_prefix_ignore_case(sql.trim_start(), "CREATE")?;
    let rest = strip_prefix_ignore_case(rest, "TEMPORARY")
        .or_else(|| strip_prefix_ignore_case(rest, "TEMP"))
        .unwrap_or(rest);
    let rest = strip_prefix_ignore_case(rest, "TABLE")?;
    let rest = strip_prefix_ignore_case(rest, "IF NOT EXISTS").unwrap_or(rest);

    let end = rest.find([' ', '(', '\n']).unwrap_or(rest.len());
    Some(rest[..end].to_string())
}

fn extract_table_name_from_drop(sql: &str) -> Option<String> {
    let rest = strip_prefix_ignore_case(sql.trim_start(), "DROP TABLE")?;
    let rest = strip_prefix_ignore_case(rest, "IF EXISTS").unwrap_or(rest);

    let end = rest.find([' ', ';', '\n']).unwrap_or(rest.len());
    Some(rest[..end].to_string())
}
