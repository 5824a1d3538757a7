use metrics::{counter, histogram};
use std::time::Instant;

use crate::dialect::Dialect;

pub fn record_run_started(dialect: Dialect) {
    counter!("sql_test_runs_total", "dialect" => dialect.name()).increment(1);
}

pub fn record_run_failed(kind: &'static str) {
    counter!("sql_test_runs_failed_total", "kind" => kind).increment(1);
}

pub fn record_run_duration(dialect: Dialect, start: Instant) {
    let duration = start.elapsed().as_secs_f64();
    histogram!("sql_test_run_duration_seconds", "dialect" => dialect.name()).record(duration);
}

pub fn record_physical_table(dialect: Dialect) {
    counter!("sql_test_physical_tables_total", "dialect" => dialect.name()).increment(1);
}

pub fn record_cleanup_failure() {
    counter!("sql_test_cleanup_failures_total").increment(1);
}

pub fn record_leaked_tables(count: usize) {
    counter!("sql_test_leaked_tables_total").increment(count as u64);
}

pub fn record_inline_bytes(bytes: usize) {
    histogram!("sql_test_inline_bytes").record(bytes as f64);
}
