use std::ops::ControlFlow;

use sqlparser::ast::{visit_relations_mut, Ident, ObjectName, Statement};

use crate::error::{Error, Result};
use crate::parser::{is_cte_reference, object_name_text, ParsedQuery};

/// Replacement target for one query reference.
#[derive(Debug, Clone)]
pub(crate) struct Replacement {
    pub reference: String,
    pub target: ObjectName,
}

pub(crate) fn object_name_for(path_parts: &[&str], quote: Option<char>) -> ObjectName {
    match quote {
        Some(q) => ObjectName(vec![Ident::with_quote(q, path_parts.join("."))]),
        None => ObjectName(path_parts.iter().map(|p| Ident::new(*p)).collect()),
    }
}

/// Points every matching relation at its replacement. References to the
/// query's own CTEs are left alone.
pub(crate) fn replace_relations(
    statement: &mut Statement,
    replacements: &[Replacement],
    cte_names: &[String],
) {
    let _ = visit_relations_mut(statement, |name: &mut ObjectName| {
        if !is_cte_reference(name, cte_names) {
            let text = object_name_text(name);
            if let Some(r) = replacements
                .iter()
                .find(|r| r.reference.eq_ignore_ascii_case(&text))
            {
                *name = r.target.clone();
            }
        }
        ControlFlow::<()>::Continue(())
    });
}

/// Renders the final SQL: relations rewritten, generated CTEs placed ahead of
/// any existing ones inside a single WITH clause.
pub(crate) fn assemble_query(
    parsed: &ParsedQuery,
    replacements: &[Replacement],
    ctes: &[String],
) -> Result<String> {
    let mut statement = parsed.statement.clone();
    replace_relations(&mut statement, replacements, &parsed.cte_names);

    if ctes.is_empty() {
        return Ok(statement.to_string());
    }

    let Statement::Query(mut query) = statement else {
        return Err(Error::InvalidRequest(
            "Inline mock tables require a query statement; use physical tables instead".into(),
        ));
    };

    let generated = ctes.join(",\n");
    let leading_with = if parsed.has_leading_with {
        query.with.take()
    } else {
        None
    };
    match leading_with {
        Some(with) => {
            let existing = with
                .cte_tables
                .iter()
                .map(|cte| cte.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let recursive = if with.recursive { "RECURSIVE " } else { "" };
            Ok(format!("WITH {}{},\n{}\n{}", recursive, generated, existing, query))
        }
        None => Ok(format!("WITH {}\n{}", generated, query)),
    }
}
