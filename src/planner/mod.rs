mod rewrite;
mod sql_builder;

use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use crate::dialect::{Dialect, DialectProfile};
use crate::domain::MockTable;
use crate::error::{Error, Result};
use crate::metrics;
use crate::parser::ParsedQuery;
use crate::resolver::ResolvedTable;

use rewrite::{assemble_query, object_name_for, Replacement};
use sql_builder::{build_create_statements, build_cte, build_drop_sql, render_table_path};

pub use sql_builder::estimate_inline_size;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Inline,
    Physical,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Inline => "inline",
            Strategy::Physical => "physical",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanOptions {
    pub force_physical: bool,
    pub allow_physical_fallback: bool,
    /// Overrides the dialect's inline limit when set.
    pub size_limit: Option<usize>,
}

/// Per-run identifier scheme. Every synthesized name carries a piece of the
/// run id so concurrent runs never collide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunNames {
    tag: String,
    suffix: String,
}

impl RunNames {
    pub fn from_run_id(run_id: Uuid) -> Self {
        let suffix = run_id.simple().to_string();
        Self {
            tag: suffix[..8].to_string(),
            suffix,
        }
    }

    pub fn cte_alias(&self, table: &MockTable) -> String {
        table.cte_alias(&self.tag)
    }

    pub fn physical_table(&self, table: &MockTable) -> String {
        format!("temp_{}_{}", table.table_name(), self.suffix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePlan {
    pub qualified_name: String,
    pub references: Vec<String>,
    pub strategy: Strategy,
    /// CTE alias or physical table path substituted into the query.
    pub target: String,
    pub inline_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalTable {
    pub path: String,
    pub setup: Vec<String>,
    pub teardown: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewritePlan {
    pub tables: Vec<TablePlan>,
    pub final_query: String,
    pub physical_tables: Vec<PhysicalTable>,
}

impl RewritePlan {
    pub fn setup_statements(&self) -> impl Iterator<Item = &str> {
        self.physical_tables
            .iter()
            .flat_map(|t| t.setup.iter().map(String::as_str))
    }

    pub fn teardown_statements(&self) -> impl Iterator<Item = &str> {
        self.physical_tables
            .iter()
            .filter_map(|t| t.teardown.as_deref())
    }

    pub fn strategy_for(&self, qualified_name: &str) -> Option<Strategy> {
        self.tables
            .iter()
            .find(|t| t.qualified_name == qualified_name)
            .map(|t| t.strategy)
    }
}

struct Candidate<'a> {
    mock: &'a MockTable,
    references: Vec<String>,
    cte: String,
    inline_size: usize,
    strategy: Strategy,
}

fn size_error(actual_size: usize, limit: usize, dialect: Dialect) -> Error {
    Error::SizeLimitExceeded {
        actual_size,
        limit,
        dialect: dialect.name().to_string(),
    }
}

/// Chooses inline or physical per mock table and renders the final query.
pub fn plan(
    parsed: &ParsedQuery,
    resolved: &[ResolvedTable<'_>],
    profile: &DialectProfile,
    options: &PlanOptions,
    names: &RunNames,
) -> Result<RewritePlan> {
    let limit = options.size_limit.or(profile.inline_size_limit);

    // Several references may resolve to one mock; it gets one CTE or table.
    let mut candidates: Vec<Candidate<'_>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for r in resolved {
        if let Some(&i) = index.get(&r.qualified_name.to_lowercase()) {
            candidates[i].references.push(r.reference.clone());
            continue;
        }
        let alias = names.cte_alias(r.mock);
        let cte = build_cte(&alias, r.mock, profile)?;
        let inline_size = estimate_inline_size(r.mock, profile)?;
        metrics::record_inline_bytes(inline_size);

        let strategy = match limit {
            _ if options.force_physical => Strategy::Physical,
            Some(limit) if inline_size > limit => {
                if !options.allow_physical_fallback {
                    return Err(size_error(inline_size, limit, profile.dialect));
                }
                Strategy::Physical
            }
            _ => Strategy::Inline,
        };
        debug!(
            table = %r.qualified_name,
            strategy = strategy.as_str(),
            bytes = inline_size,
            "Planned mock table"
        );

        index.insert(r.qualified_name.to_lowercase(), candidates.len());
        candidates.push(Candidate {
            mock: r.mock,
            references: vec![r.reference.clone()],
            cte,
            inline_size,
            strategy,
        });
    }

    loop {
        let (final_query, targets) = render(parsed, &candidates, profile, names)?;
        let limit = match limit {
            Some(limit) if final_query.len() > limit => limit,
            _ => return finish(candidates, final_query, targets, profile, names),
        };
        if !options.allow_physical_fallback {
            return Err(size_error(final_query.len(), limit, profile.dialect));
        }
        let largest = candidates
            .iter_mut()
            .filter(|c| c.strategy == Strategy::Inline)
            .max_by_key(|c| c.inline_size);
        match largest {
            Some(candidate) => {
                debug!(
                    table = %candidate.mock.qualified_name(),
                    bytes = candidate.inline_size,
                    query_bytes = final_query.len(),
                    "Final query over limit, moving largest inline table to physical"
                );
                candidate.strategy = Strategy::Physical;
            }
            None => return Err(size_error(final_query.len(), limit, profile.dialect)),
        }
    }
}

fn physical_path(mock: &MockTable, profile: &DialectProfile, names: &RunNames) -> (String, Vec<String>) {
    let name = names.physical_table(mock);
    let parts: Vec<String> = if profile.session_temp_tables {
        vec![name]
    } else {
        vec![mock.database().to_string(), name]
    };
    let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
    (render_table_path(&refs, profile), parts)
}

fn render(
    parsed: &ParsedQuery,
    candidates: &[Candidate<'_>],
    profile: &DialectProfile,
    names: &RunNames,
) -> Result<(String, Vec<(String, Strategy)>)> {
    let mut replacements = Vec::new();
    let mut targets = Vec::with_capacity(candidates.len());
    let mut ctes = Vec::new();
    let quote = (profile.dialect == Dialect::BigQuery).then_some(profile.identifier_quote);

    for c in candidates {
        let (target_text, target) = match c.strategy {
            Strategy::Inline => {
                ctes.push(c.cte.clone());
                let alias = names.cte_alias(c.mock);
                (alias.clone(), object_name_for(&[alias.as_str()], None))
            }
            Strategy::Physical => {
                let (path, parts) = physical_path(c.mock, profile, names);
                let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
                (path, object_name_for(&refs, quote))
            }
        };
        for reference in &c.references {
            replacements.push(Replacement {
                reference: reference.clone(),
                target: target.clone(),
            });
        }
        targets.push((target_text, c.strategy));
    }

    let final_query = assemble_query(parsed, &replacements, &ctes)?;
    Ok((final_query, targets))
}

fn finish(
    candidates: Vec<Candidate<'_>>,
    final_query: String,
    targets: Vec<(String, Strategy)>,
    profile: &DialectProfile,
    names: &RunNames,
) -> Result<RewritePlan> {
    let mut tables = Vec::with_capacity(candidates.len());
    let mut physical_tables = Vec::new();

    for (c, (target, strategy)) in candidates.into_iter().zip(targets) {
        if strategy == Strategy::Physical {
            let (path, _) = physical_path(c.mock, profile, names);
            let setup = build_create_statements(&path, c.mock, profile)?;
            let teardown = (!profile.temp_auto_drop).then(|| build_drop_sql(&path));
            metrics::record_physical_table(profile.dialect);
            physical_tables.push(PhysicalTable {
                path,
                setup,
                teardown,
            });
        }
        tables.push(TablePlan {
            qualified_name: c.mock.qualified_name(),
            references: c.references,
            strategy,
            target,
            inline_size: c.inline_size,
        });
    }

    Ok(RewritePlan {
        tables,
        final_query,
        physical_tables,
    })
}
