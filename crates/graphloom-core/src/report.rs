//! Load reports
//!
//! Every skipped record is counted and the first few reasons are kept, so a run
//! never drops data without leaving a trace.

use serde::Serialize;

use crate::store::ConstraintOutcome;

/// Number of skip reasons retained per type
pub const SKIP_SAMPLE_LIMIT: usize = 10;

/// One retained skip reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub line: u64,
    pub reason: String,
}

/// Count of skipped records plus the first [`SKIP_SAMPLE_LIMIT`] reasons
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkipLog {
    pub count: u64,
    pub samples: Vec<SkippedRecord>,
}

impl SkipLog {
    pub fn record(&mut self, line: u64, reason: impl Into<String>) {
        self.count += 1;
        if self.samples.len() < SKIP_SAMPLE_LIMIT {
            self.samples.push(SkippedRecord {
                line,
                reason: reason.into(),
            });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Constraint installation result for one node type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintReport {
    pub label: String,
    pub property: String,
    /// `None` when the store rejected the constraint
    pub outcome: Option<ConstraintOutcome>,
    pub conflict: Option<String>,
}

/// Result of loading one node type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeLoadReport {
    pub label: String,
    pub records_read: u64,
    pub created: u64,
    /// Records whose identity matched an existing node, which was overwritten
    pub updated: u64,
    pub skipped: SkipLog,
    /// Not loaded because its uniqueness constraint could not be installed
    pub blocked: bool,
}

impl NodeLoadReport {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn blocked(label: impl Into<String>) -> Self {
        Self {
            blocked: true,
            ..Self::new(label)
        }
    }
}

/// Result of loading one relationship type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelationshipLoadReport {
    pub rel_type: String,
    pub records_read: u64,
    pub created: u64,
    /// Edge already present between the same ordered pair
    pub existing: u64,
    /// Records naming an endpoint that is not in the store
    pub unresolved: u64,
    /// Records whose join keys could not be read
    pub skipped: SkipLog,
    /// Not loaded because an endpoint type is blocked
    pub blocked: bool,
}

impl RelationshipLoadReport {
    pub fn new(rel_type: impl Into<String>) -> Self {
        Self {
            rel_type: rel_type.into(),
            ..Self::default()
        }
    }

    pub fn blocked(rel_type: impl Into<String>) -> Self {
        Self {
            blocked: true,
            ..Self::new(rel_type)
        }
    }
}

/// Outcome of a successful [`LoadOrchestrator::run`](crate::LoadOrchestrator::run)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Attempts made, including the successful one
    pub attempts: u32,
    pub constraints: Vec<ConstraintReport>,
    pub nodes: Vec<NodeLoadReport>,
    pub relationships: Vec<RelationshipLoadReport>,
}

impl LoadReport {
    /// False when any type was blocked by a schema conflict
    pub fn is_complete(&self) -> bool {
        !self.nodes.iter().any(|n| n.blocked) && !self.relationships.iter().any(|r| r.blocked)
    }

    pub fn node(&self, label: &str) -> Option<&NodeLoadReport> {
        self.nodes.iter().find(|n| n.label == label)
    }

    pub fn relationship(&self, rel_type: &str) -> Option<&RelationshipLoadReport> {
        self.relationships.iter().find(|r| r.rel_type == rel_type)
    }

    pub fn total_skipped(&self) -> u64 {
        self.nodes.iter().map(|n| n.skipped.count).sum::<u64>()
            + self
                .relationships
                .iter()
                .map(|r| r.skipped.count)
                .sum::<u64>()
    }

    pub fn total_unresolved(&self) -> u64 {
        self.relationships.iter().map(|r| r.unresolved).sum()
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &ConstraintReport> {
        self.constraints.iter().filter(|c| c.conflict.is_some())
    }
}
