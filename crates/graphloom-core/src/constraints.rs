//! Constraint Installer
//!
//! Puts a uniqueness constraint on the identity key of every node type before
//! any data is written.

use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::report::ConstraintReport;
use crate::schema::{NodeType, SchemaRegistry};
use crate::store::{ConstraintOutcome, GraphStore};

/// Idempotently install the uniqueness constraint for one node type
pub async fn ensure_uniqueness(store: &dyn GraphStore, node_type: &NodeType) -> StoreResult<ConstraintOutcome> {
    store
        .ensure_unique_constraint(node_type.label(), &node_type.identity().target)
        .await
}

/// Install constraints for every node type in declaration order
///
/// Schema conflicts are recorded per type and do not stop the remaining
/// installations; any other store error aborts.
pub async fn install_constraints(store: &dyn GraphStore, registry: &SchemaRegistry) -> StoreResult<Vec<ConstraintReport>> {
    let mut reports = Vec::with_capacity(registry.node_types().len());

    for node_type in registry.node_types() {
        let property = node_type.identity().target.clone();
        let report = match ensure_uniqueness(store, node_type).await {
            Ok(outcome) => {
                debug!(label = node_type.label(), %property, ?outcome, "Uniqueness constraint ready");
                ConstraintReport {
                    label: node_type.label().to_string(),
                    property,
                    outcome: Some(outcome),
                    conflict: None,
                }
            }
            Err(StoreError::SchemaConflict { reason, .. }) => {
                warn!(
                    label = node_type.label(),
                    %property,
                    "Constraint rejected, node type will not be loaded: {}",
                    reason
                );
                ConstraintReport {
                    label: node_type.label().to_string(),
                    property,
                    outcome: None,
                    conflict: Some(reason),
                }
            }
            Err(other) => return Err(other),
        };
        reports.push(report);
    }

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{ConstraintKind, InMemoryGraphStore};

    #[tokio::test]
    async fn test_installs_every_node_type_and_reruns_cleanly() {
        let registry = SchemaRegistry::northwind().unwrap();
        let store = InMemoryGraphStore::new();

        let first = install_constraints(&store, &registry).await.unwrap();
        assert_eq!(first.len(), 6);
        assert!(first
            .iter()
            .all(|c| c.outcome == Some(ConstraintOutcome::Created)));

        let second = install_constraints(&store, &registry).await.unwrap();
        assert!(second
            .iter()
            .all(|c| c.outcome == Some(ConstraintOutcome::AlreadyPresent)));
        assert_eq!(
            store.constraint("Customer", "id"),
            Some(ConstraintKind::Unique)
        );
    }

    #[tokio::test]
    async fn test_conflict_is_reported_per_type() {
        let registry = SchemaRegistry::northwind().unwrap();
        let store = InMemoryGraphStore::new();
        store.define_constraint("Supplier", "id", ConstraintKind::Existence);

        let reports = install_constraints(&store, &registry).await.unwrap();
        let supplier = reports.iter().find(|c| c.label == "Supplier").unwrap();
        assert!(supplier.outcome.is_none());
        assert!(supplier.conflict.is_some());

        let others = reports.iter().filter(|c| c.conflict.is_none()).count();
        assert_eq!(others, 5);
    }
}
