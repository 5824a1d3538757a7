use tracing::debug;

use crate::domain::MockTable;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct ResolvedTable<'a> {
    /// Reference text as written in the query.
    pub reference: String,
    pub qualified_name: String,
    pub mock: &'a MockTable,
}

fn qualify(reference: &str, namespace: &str) -> String {
    format!("{}.{}", namespace, reference)
}

/// Names a reference may stand for: an unqualified name lives in the
/// execution namespace; a qualified one is either complete as written or
/// relative to the namespace (`schema.table` under a `catalog` namespace).
fn candidates(reference: &str, namespace: &str) -> Vec<String> {
    if reference.contains('.') {
        vec![reference.to_string(), qualify(reference, namespace)]
    } else {
        vec![qualify(reference, namespace)]
    }
}

pub fn resolve<'a>(
    table_refs: &[String],
    mock_tables: &'a [MockTable],
    namespace: &str,
) -> Result<Vec<ResolvedTable<'a>>> {
    let available: Vec<String> = mock_tables.iter().map(MockTable::qualified_name).collect();

    for (i, name) in available.iter().enumerate() {
        if available[..i].iter().any(|n| n.eq_ignore_ascii_case(name)) {
            return Err(Error::InvalidRequest(format!(
                "Duplicate mock table: {}",
                name
            )));
        }
    }

    let mut resolved = Vec::with_capacity(table_refs.len());
    for reference in table_refs {
        let names = candidates(reference, namespace);
        let found = names.iter().find_map(|candidate| {
            available
                .iter()
                .position(|n| n.eq_ignore_ascii_case(candidate))
                .map(|idx| (candidate.clone(), idx))
        });
        match found {
            Some((qualified_name, idx)) => {
                debug!(reference = %reference, table = %qualified_name, "Resolved table reference");
                resolved.push(ResolvedTable {
                    reference: reference.clone(),
                    qualified_name,
                    mock: &mock_tables[idx],
                });
            }
            None => {
                let table = names.into_iter().next().unwrap_or_else(|| reference.clone());
                return Err(Error::TableNotFound { table, available });
            }
        }
    }
    Ok(resolved)
}
