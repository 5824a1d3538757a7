extern crate self as sql_test_runner;

pub mod config;
pub mod converters;
pub mod dialect;
pub mod domain;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod parser;
pub mod planner;
pub mod resolver;
pub mod runner;
pub mod types;
pub mod validation;

pub use config::{LogFormat, LoggingConfig, PlanningConfig, RunnerConfig};
pub use converters::{decode_value, encode_literal, sql_type_name};
pub use dialect::{Dialect, DialectProfile};
pub use domain::{ColumnDef, MockTable};
pub use error::{Error, Result};
pub use executor::{ColumnInfo, QueryResult, RecordingExecutor, WarehouseExecutor};
pub use logging::init_logging;
pub use planner::{estimate_inline_size, PlanOptions, RewritePlan, Strategy};
pub use runner::{RunContext, SqlTestRunner, TestCase};
pub use sql_test_runner_macros::Record;
pub use types::{
    FieldDescriptor, FieldValues, FromSqlValue, PrimitiveKind, Record, RecordDescriptor, SqlType,
    SqlValue, ToSqlValue, TypeDescriptor,
};
