//! Change-set and apply-report types

use groundflow_core::{Address, AttrValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of change planned for a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Create a new resource
    Create,
    /// Update the resource in place
    Update,
    /// Destroy and recreate (an immutable attribute changed)
    Replace,
    /// Destroy a resource no longer declared
    Destroy,
    /// No changes needed
    NoOp,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Create => write!(f, "create"),
            ChangeKind::Update => write!(f, "update"),
            ChangeKind::Replace => write!(f, "replace"),
            ChangeKind::Destroy => write!(f, "destroy"),
            ChangeKind::NoOp => write!(f, "no-op"),
        }
    }
}

/// One planned change for one resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEntry {
    /// Resource address
    pub address: Address,

    /// Type of change to perform
    pub kind: ChangeKind,

    /// Provider responsible for this resource
    pub provider: String,

    /// Provider-assigned id, present when the resource already exists
    pub provider_id: Option<String>,

    /// Last-applied attribute snapshot (None for Create)
    pub before: Option<BTreeMap<String, serde_json::Value>>,

    /// Desired attributes; references stay symbolic until apply
    /// (None for Destroy)
    pub desired: Option<BTreeMap<String, AttrValue>>,

    /// Names of attributes that differ from the applied snapshot
    pub changed: Vec<String>,

    /// Resource-level dependencies: graph dependencies for live
    /// entries, state-recorded dependencies for destroy entries
    pub depends_on: Vec<Address>,

    /// Scheduling predecessors in the combined execution order. For
    /// destroy entries the dependency direction is inverted here
    /// (dependents precede their dependencies).
    pub sequence_after: Vec<Address>,
}

impl ChangeEntry {
    pub fn is_change(&self) -> bool {
        self.kind != ChangeKind::NoOp
    }
}

/// Ordered change-set produced by one planning cycle
///
/// The sequence is a valid linearization of the combined dependency
/// graph: create/update/replace in forward dependency order, destroy
/// in reverse. Consumed by the executor and discarded after apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Entries in execution order
    pub entries: Vec<ChangeEntry>,

    /// Serial of the state document the plan was computed against
    pub state_serial: u64,
}

impl ChangeSet {
    pub fn new(entries: Vec<ChangeEntry>, state_serial: u64) -> Self {
        Self {
            entries,
            state_serial,
        }
    }

    pub fn has_changes(&self) -> bool {
        self.entries.iter().any(|e| e.is_change())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get entries by kind
    pub fn entries_by_kind(&self, kind: ChangeKind) -> Vec<&ChangeEntry> {
        self.entries.iter().filter(|e| e.kind == kind).collect()
    }

    /// Summary of the change-set
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.entries_by_kind(ChangeKind::Create).len(),
            update: self.entries_by_kind(ChangeKind::Update).len(),
            replace: self.entries_by_kind(ChangeKind::Replace).len(),
            destroy: self.entries_by_kind(ChangeKind::Destroy).len(),
            no_change: self.entries_by_kind(ChangeKind::NoOp).len(),
        }
    }
}

/// Summary of planned changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub replace: usize,
    pub destroy: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to replace, {} to destroy, {} unchanged",
            self.create, self.update, self.replace, self.destroy, self.no_change
        )
    }
}

/// Outcome of one node in an apply run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeOutcome {
    /// The change was applied and committed to state
    Applied,
    /// The provider rejected the change
    Failed,
    /// Not attempted because a dependency failed or the run was cancelled
    Skipped,
    /// Nothing to do
    NoOp,
}

impl std::fmt::Display for NodeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeOutcome::Applied => write!(f, "applied"),
            NodeOutcome::Failed => write!(f, "failed"),
            NodeOutcome::Skipped => write!(f, "skipped"),
            NodeOutcome::NoOp => write!(f, "no-op"),
        }
    }
}

/// Per-node result in the apply report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResult {
    pub address: Address,
    pub kind: ChangeKind,
    pub outcome: NodeOutcome,

    /// Error message for failed nodes, skip reason for skipped ones
    pub message: Option<String>,
}

/// Result of an apply run
///
/// Lists every node of the change-set exactly once; nothing is
/// silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyReport {
    pub results: Vec<NodeResult>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyReport {
    pub fn new(results: Vec<NodeResult>, duration_ms: u64) -> Self {
        Self {
            results,
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.results
            .iter()
            .all(|r| matches!(r.outcome, NodeOutcome::Applied | NodeOutcome::NoOp))
    }

    pub fn outcome_of(&self, address: &Address) -> Option<NodeOutcome> {
        self.results
            .iter()
            .find(|r| &r.address == address)
            .map(|r| r.outcome)
    }

    pub fn count(&self, outcome: NodeOutcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: ChangeKind) -> ChangeEntry {
        ChangeEntry {
            address: Address::new("vpc", "main"),
            kind,
            provider: "aws".to_string(),
            provider_id: None,
            before: None,
            desired: Some(BTreeMap::new()),
            changed: vec![],
            depends_on: vec![],
            sequence_after: vec![],
        }
    }

    #[test]
    fn test_summary_counts() {
        let changeset = ChangeSet::new(
            vec![
                entry(ChangeKind::Create),
                entry(ChangeKind::Update),
                entry(ChangeKind::NoOp),
            ],
            0,
        );

        let summary = changeset.summary();
        assert_eq!(summary.create, 1);
        assert_eq!(summary.update, 1);
        assert_eq!(summary.no_change, 1);
        assert_eq!(
            summary.to_string(),
            "1 to create, 1 to update, 0 to replace, 0 to destroy, 1 unchanged"
        );
    }

    #[test]
    fn test_has_changes() {
        let noop_only = ChangeSet::new(vec![entry(ChangeKind::NoOp)], 3);
        assert!(!noop_only.has_changes());

        let with_create = ChangeSet::new(vec![entry(ChangeKind::Create)], 3);
        assert!(with_create.has_changes());
    }

    #[test]
    fn test_report_success() {
        let report = ApplyReport::new(
            vec![NodeResult {
                address: Address::new("vpc", "main"),
                kind: ChangeKind::Create,
                outcome: NodeOutcome::Applied,
                message: None,
            }],
            12,
        );
        assert!(report.is_success());
        assert_eq!(
            report.outcome_of(&Address::new("vpc", "main")),
            Some(NodeOutcome::Applied)
        );
    }
}
