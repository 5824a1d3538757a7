use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlparser::dialect::{
    BigQueryDialect, DuckDbDialect, GenericDialect, RedshiftSqlDialect, SnowflakeDialect,
};

use crate::converters::{decode_value, encode_literal};
use crate::error::{Error, Result};
use crate::types::{SqlValue, TypeDescriptor};
use crate::validation::needs_quoting;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    BigQuery,
    Athena,
    Trino,
    Redshift,
    Snowflake,
    DuckDb,
}

impl Dialect {
    pub const ALL: [Dialect; 6] = [
        Dialect::BigQuery,
        Dialect::Athena,
        Dialect::Trino,
        Dialect::Redshift,
        Dialect::Snowflake,
        Dialect::DuckDb,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::BigQuery => "bigquery",
            Dialect::Athena => "athena",
            Dialect::Trino => "trino",
            Dialect::Redshift => "redshift",
            Dialect::Snowflake => "snowflake",
            Dialect::DuckDb => "duckdb",
        }
    }

    pub fn profile(&self) -> &'static DialectProfile {
        match self {
            Dialect::BigQuery => &BIGQUERY,
            Dialect::Athena => &ATHENA,
            Dialect::Trino => &TRINO,
            Dialect::Redshift => &REDSHIFT,
            Dialect::Snowflake => &SNOWFLAKE,
            Dialect::DuckDb => &DUCKDB,
        }
    }

    /// Parser dialect handed to sqlparser. Athena and Trino speak Presto SQL,
    /// which sqlparser covers through its generic dialect.
    pub fn parser_dialect(&self) -> Box<dyn sqlparser::dialect::Dialect> {
        match self {
            Dialect::BigQuery => Box::new(BigQueryDialect {}),
            Dialect::Athena | Dialect::Trino => Box::new(GenericDialect {}),
            Dialect::Redshift => Box::new(RedshiftSqlDialect {}),
            Dialect::Snowflake => Box::new(SnowflakeDialect {}),
            Dialect::DuckDb => Box::new(DuckDbDialect {}),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "bigquery" => Ok(Dialect::BigQuery),
            "athena" => Ok(Dialect::Athena),
            "trino" | "presto" => Ok(Dialect::Trino),
            "redshift" => Ok(Dialect::Redshift),
            "snowflake" => Ok(Dialect::Snowflake),
            "duckdb" => Ok(Dialect::DuckDb),
            other => Err(Error::InvalidRequest(format!("Unknown dialect: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullLiteral {
    Plain,
    /// `NULL::<TYPE>`
    PostgresCast,
    /// `CAST(NULL AS <TYPE>)`
    AnsiCast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructLiteral {
    Row,
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalLiteral {
    Keyword { timestamp_separator: char },
    /// `DATE('..')` and `DATETIME('..')`
    Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringEscape {
    Standard,
    /// Triple-quoted form for values containing a single quote.
    TripleQuote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayLiteral {
    Brackets,
    ArrayKeyword,
    JsonParse,
    ArrayConstruct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapLiteral {
    Unsupported,
    MapOfArrays,
    JsonParse,
    ObjectConstruct,
    Braces,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CteStyle {
    /// `SELECT * FROM UNNEST([STRUCT(v AS c, ..), (v, ..)])`
    Unnest,
    /// `SELECT v AS c UNION ALL SELECT v ..`
    UnionAll,
    /// `SELECT * FROM (VALUES (..), (..)) AS t(c, ..)`
    Values,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalLoad {
    CreateAsSelect,
    CreateTemporaryAsSelect,
    CreateThenInsert,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DialectProfile {
    pub dialect: Dialect,
    pub inline_size_limit: Option<usize>,
    pub null_literal: NullLiteral,
    pub struct_literal: StructLiteral,
    pub temporal_literal: TemporalLiteral,
    pub string_escape: StringEscape,
    pub array_literal: ArrayLiteral,
    pub map_literal: MapLiteral,
    pub cte_style: CteStyle,
    pub physical_load: PhysicalLoad,
    /// Temp tables vanish at session end, so no DROP is emitted.
    pub temp_auto_drop: bool,
    /// Temp tables live in a session schema and cannot be qualified.
    pub session_temp_tables: bool,
    /// Text some drivers return in place of SQL NULL.
    pub null_sentinel: Option<&'static str>,
    pub identifier_quote: char,
}

const KIB: usize = 1024;
const MIB: usize = 1024 * 1024;

pub static BIGQUERY: DialectProfile = DialectProfile {
    dialect: Dialect::BigQuery,
    inline_size_limit: Some(MIB),
    null_literal: NullLiteral::Plain,
    struct_literal: StructLiteral::Unsupported,
    temporal_literal: TemporalLiteral::Function,
    string_escape: StringEscape::TripleQuote,
    array_literal: ArrayLiteral::Brackets,
    map_literal: MapLiteral::Unsupported,
    cte_style: CteStyle::Unnest,
    physical_load: PhysicalLoad::CreateAsSelect,
    temp_auto_drop: false,
    session_temp_tables: false,
    null_sentinel: None,
    identifier_quote: '`',
};

pub static ATHENA: DialectProfile = DialectProfile {
    dialect: Dialect::Athena,
    inline_size_limit: Some(256 * KIB),
    null_literal: NullLiteral::AnsiCast,
    struct_literal: StructLiteral::Row,
    temporal_literal: TemporalLiteral::Keyword {
        timestamp_separator: ' ',
    },
    string_escape: StringEscape::Standard,
    array_literal: ArrayLiteral::ArrayKeyword,
    map_literal: MapLiteral::MapOfArrays,
    cte_style: CteStyle::UnionAll,
    physical_load: PhysicalLoad::CreateAsSelect,
    temp_auto_drop: false,
    session_temp_tables: false,
    null_sentinel: Some("NULL"),
    identifier_quote: '"',
};

pub static TRINO: DialectProfile = DialectProfile {
    dialect: Dialect::Trino,
    inline_size_limit: Some(16 * MIB),
    null_literal: NullLiteral::AnsiCast,
    struct_literal: StructLiteral::Row,
    temporal_literal: TemporalLiteral::Keyword {
        timestamp_separator: ' ',
    },
    string_escape: StringEscape::Standard,
    array_literal: ArrayLiteral::ArrayKeyword,
    map_literal: MapLiteral::MapOfArrays,
    cte_style: CteStyle::UnionAll,
    physical_load: PhysicalLoad::CreateAsSelect,
    temp_auto_drop: false,
    session_temp_tables: false,
    null_sentinel: None,
    identifier_quote: '"',
};

pub static REDSHIFT: DialectProfile = DialectProfile {
    dialect: Dialect::Redshift,
    inline_size_limit: Some(16 * MIB),
    null_literal: NullLiteral::PostgresCast,
    struct_literal: StructLiteral::Unsupported,
    temporal_literal: TemporalLiteral::Keyword {
        timestamp_separator: 'T',
    },
    string_escape: StringEscape::Standard,
    array_literal: ArrayLiteral::JsonParse,
    map_literal: MapLiteral::JsonParse,
    cte_style: CteStyle::UnionAll,
    physical_load: PhysicalLoad::CreateTemporaryAsSelect,
    temp_auto_drop: true,
    session_temp_tables: true,
    null_sentinel: None,
    identifier_quote: '"',
};

pub static SNOWFLAKE: DialectProfile = DialectProfile {
    dialect: Dialect::Snowflake,
    inline_size_limit: Some(MIB),
    null_literal: NullLiteral::Plain,
    struct_literal: StructLiteral::Unsupported,
    temporal_literal: TemporalLiteral::Keyword {
        timestamp_separator: 'T',
    },
    string_escape: StringEscape::Standard,
    array_literal: ArrayLiteral::ArrayConstruct,
    map_literal: MapLiteral::ObjectConstruct,
    cte_style: CteStyle::Values,
    physical_load: PhysicalLoad::CreateTemporaryAsSelect,
    temp_auto_drop: false,
    session_temp_tables: false,
    null_sentinel: None,
    identifier_quote: '"',
};

pub static DUCKDB: DialectProfile = DialectProfile {
    dialect: Dialect::DuckDb,
    inline_size_limit: None,
    null_literal: NullLiteral::Plain,
    struct_literal: StructLiteral::Unsupported,
    temporal_literal: TemporalLiteral::Keyword {
        timestamp_separator: 'T',
    },
    string_escape: StringEscape::Standard,
    array_literal: ArrayLiteral::Brackets,
    map_literal: MapLiteral::Braces,
    cte_style: CteStyle::Values,
    physical_load: PhysicalLoad::CreateThenInsert,
    temp_auto_drop: false,
    session_temp_tables: true,
    null_sentinel: None,
    identifier_quote: '"',
};

impl DialectProfile {
    pub fn name(&self) -> &'static str {
        self.dialect.name()
    }

    pub fn encode_literal(&self, value: &SqlValue, ty: &TypeDescriptor) -> Result<String> {
        encode_literal(value, ty, self)
    }

    pub fn decode_value(&self, raw: &JsonValue, ty: &TypeDescriptor) -> Result<SqlValue> {
        decode_value(raw, ty, self)
    }

    pub fn quote_identifier(&self, name: &str) -> String {
        let q = self.identifier_quote;
        let doubled: String = [q, q].iter().collect();
        format!("{q}{}{q}", name.replace(q, &doubled))
    }

    /// Column or struct field name for generated SQL. Plain names stay bare so
    /// engines that fold case still match the caller's query.
    pub fn column_identifier<'a>(&self, name: &'a str) -> Cow<'a, str> {
        if needs_quoting(name) {
            Cow::Owned(self.quote_identifier(name))
        } else {
            Cow::Borrowed(name)
        }
    }
}
