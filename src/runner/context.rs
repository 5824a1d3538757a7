use tracing::{debug, warn};
use uuid::Uuid;

use crate::metrics;
use crate::planner::{PhysicalTable, RunNames};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Resolve,
    Plan,
    Setup,
    Execute,
    Decode,
    Cleanup,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Parse => "parse",
            Stage::Resolve => "resolve",
            Stage::Plan => "plan",
            Stage::Setup => "setup",
            Stage::Execute => "execute",
            Stage::Decode => "decode",
            Stage::Cleanup => "cleanup",
        }
    }
}

/// A physical table the warehouse acknowledged creating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTable {
    pub path: String,
    /// None when the warehouse drops the table itself at session end.
    pub teardown: Option<String>,
}

/// Per-run mutable state. Never shared between runs.
///
/// Dropping a context that still holds tables awaiting a DROP (the run future
/// was cancelled before cleanup) logs those tables at `warn` and counts them.
#[derive(Debug)]
pub struct RunContext {
    run_id: Uuid,
    names: RunNames,
    stage: Stage,
    created: Vec<CreatedTable>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::with_run_id(Uuid::new_v4())
    }

    pub fn with_run_id(run_id: Uuid) -> Self {
        Self {
            run_id,
            names: RunNames::from_run_id(run_id),
            stage: Stage::Parse,
            created: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn names(&self) -> &RunNames {
        &self.names
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn enter(&mut self, stage: Stage) {
        debug!(run_id = %self.run_id, stage = stage.as_str(), "Entering stage");
        self.stage = stage;
    }

    pub fn record_created(&mut self, table: &PhysicalTable) {
        if self.created.iter().any(|c| c.path == table.path) {
            return;
        }
        self.created.push(CreatedTable {
            path: table.path.clone(),
            teardown: table.teardown.clone(),
        });
    }

    pub fn created_tables(&self) -> &[CreatedTable] {
        &self.created
    }

    /// Paths of created tables whose DROP has not been issued yet.
    pub fn pending_drops(&self) -> Vec<&str> {
        self.created
            .iter()
            .filter(|c| c.teardown.is_some())
            .map(|c| c.path.as_str())
            .collect()
    }

    /// Drains the teardown statements for every created table, in creation
    /// order. A second call returns nothing.
    pub fn take_teardown(&mut self) -> Vec<String> {
        std::mem::take(&mut self.created)
            .into_iter()
            .filter_map(|c| c.teardown)
            .collect()
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RunContext {
    fn drop(&mut self) {
        let leaked = self.pending_drops();
        if leaked.is_empty() {
            return;
        }
        warn!(
            run_id = %self.run_id,
            stage = self.stage.as_str(),
            tables = ?leaked,
            "Run ended before cleanup, physical tables left behind"
        );
        metrics::record_leaked_tables(leaked.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn physical(path: &str, teardown: bool) -> PhysicalTable {
        PhysicalTable {
            path: path.to_string(),
            setup: vec![format!("CREATE TABLE {} AS SELECT 1 AS id", path)],
            teardown: teardown.then(|| format!("DROP TABLE IF EXISTS {}", path)),
        }
    }

    #[test]
    fn test_new_contexts_are_unique() {
        let a = RunContext::new();
        let b = RunContext::new();
        assert_ne!(a.run_id(), b.run_id());
        assert_ne!(a.names(), b.names());
    }

    #[test]
    fn test_record_created_once() {
        let mut ctx = RunContext::new();
        let table = physical("db.t1", true);
        ctx.record_created(&table);
        ctx.record_created(&table);
        assert_eq!(ctx.created_tables().len(), 1);
    }

    #[test]
    fn test_take_teardown_skips_auto_dropped() {
        let mut ctx = RunContext::new();
        ctx.record_created(&physical("db.t1", true));
        ctx.record_created(&physical("t2", false));
        ctx.record_created(&physical("db.t3", true));
        assert_eq!(
            ctx.take_teardown(),
            vec!["DROP TABLE IF EXISTS db.t1", "DROP TABLE IF EXISTS db.t3"]
        );
        assert!(ctx.take_teardown().is_empty());
        assert!(ctx.created_tables().is_empty());
    }

    #[test]
    fn test_pending_drops_until_teardown_taken() {
        let mut ctx = RunContext::new();
        ctx.record_created(&physical("db.t1", true));
        ctx.record_created(&physical("t2", false));
        assert_eq!(ctx.pending_drops(), vec!["db.t1"]);
        ctx.take_teardown();
        assert!(ctx.pending_drops().is_empty());
    }

    #[test]
    fn test_stage_transitions() {
        let mut ctx = RunContext::new();
        assert_eq!(ctx.stage(), Stage::Parse);
        ctx.enter(Stage::Execute);
        assert_eq!(ctx.stage(), Stage::Execute);
        assert_eq!(ctx.stage().as_str(), "execute");
    }
}
