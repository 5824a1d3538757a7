use std::ops::ControlFlow;

use sqlparser::ast::{visit_relations, ObjectName, Query, Statement, Visit, Visitor};
use sqlparser::parser::Parser;

use crate::dialect::Dialect;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct ParsedQuery {
    pub statement: Statement,
    /// Distinct table references in order of first appearance, CTE names excluded.
    pub table_refs: Vec<String>,
    pub cte_names: Vec<String>,
    /// The top-level query opens with its own WITH clause.
    pub has_leading_with: bool,
}

pub fn object_name_text(name: &ObjectName) -> String {
    name.0
        .iter()
        .map(|ident| ident.value.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

struct CteCollector {
    names: Vec<String>,
}

impl Visitor for CteCollector {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.names.push(cte.alias.name.value.clone());
            }
        }
        ControlFlow::Continue(())
    }
}

pub(crate) fn is_cte_reference(name: &ObjectName, cte_names: &[String]) -> bool {
    name.0.len() == 1
        && cte_names
            .iter()
            .any(|cte| cte.eq_ignore_ascii_case(&name.0[0].value))
}

pub fn parse_query(query: &str, dialect: Dialect) -> Result<ParsedQuery> {
    let parse_error = |message: String| Error::Parse {
        query: query.to_string(),
        message,
    };

    if query.trim().is_empty() {
        return Err(parse_error("SQL cannot be empty".to_string()));
    }

    let parser_dialect = dialect.parser_dialect();
    let mut statements =
        Parser::parse_sql(parser_dialect.as_ref(), query).map_err(|e| parse_error(e.to_string()))?;

    if statements.len() != 1 {
        return Err(parse_error(format!(
            "Expected a single statement, found {}",
            statements.len()
        )));
    }
    let statement = statements.remove(0);

    let mut collector = CteCollector { names: Vec::new() };
    let _ = statement.visit(&mut collector);
    let cte_names = collector.names;

    let mut table_refs: Vec<String> = Vec::new();
    let _ = visit_relations(&statement, |name| {
        if !is_cte_reference(name, &cte_names) {
            let text = object_name_text(name);
            if !table_refs.contains(&text) {
                table_refs.push(text);
            }
        }
        ControlFlow::<()>::Continue(())
    });

    let has_leading_with = matches!(&statement, Statement::Query(q) if q.with.is_some());

    Ok(ParsedQuery {
        statement,
        table_refs,
        cte_names,
        has_leading_with,
    })
}
