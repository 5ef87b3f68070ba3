//! Relationship Loader

use tracing::{debug, info, warn};

use crate::error::{LoadError, SchemaError, SourceError};
use crate::record::RecordStream;
use crate::report::RelationshipLoadReport;
use crate::schema::{RelationshipType, SchemaRegistry};
use crate::store::{GraphStore, NodeRef, UpsertOutcome};

/// Create one edge of `rel` per record whose endpoints both exist
///
/// Join keys are coerced the way each endpoint type coerces its identity.
/// Records naming a missing endpoint create nothing and are counted as
/// unresolved; records whose join keys cannot be read are skipped.
pub async fn load_relationships(
    store: &dyn GraphStore,
    registry: &SchemaRegistry,
    rel: &RelationshipType,
    records: RecordStream,
) -> Result<RelationshipLoadReport, LoadError> {
    let name = rel.name();
    let (from_type, to_type) = registry.endpoints(rel).ok_or_else(|| SchemaError::UnknownEndpoint {
        rel_type: name.to_string(),
        label: format!("{} or {}", rel.from().label, rel.to().label),
    })?;
    let mut report = RelationshipLoadReport::new(name);

    for item in records {
        let record = match item {
            Ok(record) => record,
            Err(err) if err.is_record_level() => {
                report.records_read += 1;
                warn!(rel_type = name, "Skipping unreadable row: {}", err);
                let line = match &err {
                    SourceError::Row { line, .. } => *line,
                    _ => 0,
                };
                report.skipped.record(line, err.to_string());
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        report.records_read += 1;

        let keys = from_type
            .key_from_field(&record, &rel.from().join_field)
            .and_then(|from| Ok((from, to_type.key_from_field(&record, &rel.to().join_field)?)));
        let (from_key, to_key) = match keys {
            Ok(keys) => keys,
            Err(err) => {
                warn!(rel_type = name, line = record.line(), "Skipping record: {}", err);
                report.skipped.record(record.line(), err.to_string());
                continue;
            }
        };

        let from = NodeRef::new(from_type.label(), &from_key);
        let to = NodeRef::new(to_type.label(), &to_key);

        if !store.node_exists(from.label, from.key).await? || !store.node_exists(to.label, to.key).await? {
            debug!(rel_type = name, %from, %to, "Endpoint not found, no edge created");
            report.unresolved += 1;
            continue;
        }

        match store.upsert_relationship(name, from, to).await? {
            UpsertOutcome::Created => report.created += 1,
            UpsertOutcome::Matched => report.existing += 1,
        }
    }

    info!(
        rel_type = name,
        read = report.records_read,
        created = report.created,
        existing = report.existing,
        unresolved = report.unresolved,
        skipped = report.skipped.count,
        "Loaded relationships"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryGraphStore;
    use crate::record::{InMemoryRecordSource, RecordSource};
    use crate::value::{NodeKey, Properties};

    async fn seed(store: &InMemoryGraphStore, label: &str, keys: &[NodeKey]) {
        for key in keys {
            store.upsert_node(label, key, &Properties::new()).await.unwrap();
        }
    }

    fn orders() -> InMemoryRecordSource {
        InMemoryRecordSource::new().with_table(
            "orders",
            &["orderID", "customerID", "productID"],
            &[
                &["1", "C1", "11"],
                &["1", "C1", "42"],
                &["2", "C9", "11"],
                &["3", "C2", "11"],
            ],
        )
    }

    #[tokio::test]
    async fn test_only_resolvable_records_create_edges() {
        let registry = SchemaRegistry::northwind().unwrap();
        let purchased = registry.relationship_type("PURCHASED").unwrap();
        let store = InMemoryGraphStore::new();
        seed(&store, "Customer", &["C1".into(), "C2".into(), "C3".into()]).await;
        seed(&store, "Order", &[NodeKey::Integer(1), NodeKey::Integer(2)]).await;

        let report = load_relationships(&store, &registry, purchased, orders().open("orders").unwrap())
            .await
            .unwrap();

        // (C1, 1) twice, C9 does not exist, order 3 does not exist
        assert_eq!(report.records_read, 4);
        assert_eq!(report.created, 1);
        assert_eq!(report.existing, 1);
        assert_eq!(report.unresolved, 2);
        assert_eq!(
            store.relationships("PURCHASED"),
            vec![(NodeKey::from("C1"), NodeKey::Integer(1))]
        );
    }

    #[tokio::test]
    async fn test_empty_store_resolves_nothing() {
        let registry = SchemaRegistry::northwind().unwrap();
        let orders_rel = registry.relationship_type("ORDERS").unwrap();
        let store = InMemoryGraphStore::new();

        let report = load_relationships(&store, &registry, orders_rel, orders().open("orders").unwrap())
            .await
            .unwrap();

        assert_eq!(report.created, 0);
        assert_eq!(report.unresolved, 4);
        assert_eq!(store.relationship_count("ORDERS").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_join_keys_use_endpoint_identity_coercion() {
        let registry = SchemaRegistry::northwind().unwrap();
        let supplies = registry.relationship_type("SUPPLIES").unwrap();
        let store = InMemoryGraphStore::new();
        seed(&store, "Supplier", &[NodeKey::Integer(1)]).await;
        seed(&store, "Product", &[NodeKey::Integer(1)]).await;

        let source = InMemoryRecordSource::new().with_table(
            "products",
            &["productID", "supplierID"],
            &[&["1.0", "1"], &["x", "1"], &["1", ""]],
        );
        let report = load_relationships(&store, &registry, supplies, source.open("products").unwrap())
            .await
            .unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(report.skipped.count, 2);
        assert_eq!(report.unresolved, 0);
    }
}
