//! End-to-end load scenarios against the in-memory graph store
//!
//! Covers the properties a load must keep across runs: idempotence, identity
//! uniqueness, referential integrity, and recovery by whole-run retry.

use std::collections::HashMap;
use std::sync::Arc;

use graphloom_core::test_support::{
    northwind_locations, northwind_sample, CancellingConnector, FailingConnector, UnavailableConnector,
};
use graphloom_core::{
    Coercion, Endpoint, GraphStore, InMemoryGraphStore, InMemoryRecordSource, LoadOrchestrator,
    LoadError, NodeKey, NodeRef, NodeType, PropertyValue, RelationshipType, RetryPolicy,
    SchemaRegistry, StoreConnector,
};
use tokio_util::sync::CancellationToken;

fn northwind_orchestrator(connector: Arc<dyn StoreConnector>) -> LoadOrchestrator {
    LoadOrchestrator::new(
        Arc::new(SchemaRegistry::northwind().unwrap()),
        connector,
        Arc::new(northwind_sample()),
        northwind_locations(),
    )
    .unwrap()
    .with_retry(RetryPolicy::immediate(5))
}

/// Customers and orders only, enough for the PURCHASED scenario
fn purchases_registry() -> SchemaRegistry {
    let customer = NodeType::builder("Customer", "customers")
        .identity("customerID", "id", Coercion::String)
        .property("companyName", "company_name", Coercion::String)
        .build()
        .unwrap();
    let order = NodeType::builder("Order", "orders")
        .identity("orderID", "id", Coercion::Integer)
        .property("orderDate", "order_date", Coercion::DateOrNull)
        .build()
        .unwrap();
    let purchased = RelationshipType::new(
        "PURCHASED",
        "orders",
        Endpoint::new("Customer", "customerID"),
        Endpoint::new("Order", "orderID"),
    );

    SchemaRegistry::new(vec![customer, order], vec![purchased]).unwrap()
}

/// Fresh load: three customers, two orders, one of them for an unknown customer
#[tokio::test]
async fn test_fresh_load_skips_unknown_customer() {
    let source = InMemoryRecordSource::new()
        .with_table(
            "customers",
            &["customerID", "companyName"],
            &[&["C1", "Alfreds"], &["C2", "Ana Trujillo"], &["C3", "Antonio Moreno"]],
        )
        .with_table(
            "orders",
            &["orderID", "customerID", "orderDate"],
            &[&["1", "C1", "01/15/2013"], &["2", "C9", ""]],
        );
    let locations: HashMap<String, String> = [("customers", "customers"), ("orders", "orders")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let store = InMemoryGraphStore::new();

    let report = LoadOrchestrator::new(
        Arc::new(purchases_registry()),
        Arc::new(store.clone()),
        Arc::new(source),
        locations,
    )
    .unwrap()
    .run()
    .await
    .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.attempts, 1);
    assert_eq!(store.node_count("Customer").await.unwrap(), 3);
    assert_eq!(store.node_count("Order").await.unwrap(), 2);
    assert_eq!(store.relationship_count("PURCHASED").await.unwrap(), 1);
    assert_eq!(
        store.relationships("PURCHASED"),
        vec![(NodeKey::from("C1"), NodeKey::Integer(1))]
    );

    let purchased = report.relationship("PURCHASED").unwrap();
    assert_eq!(purchased.unresolved, 1);
    assert!(purchased.skipped.is_empty());

    let order = store.node("Order", &NodeKey::Integer(1)).await.unwrap().unwrap();
    assert_eq!(
        order.properties["order_date"].as_date(),
        chrono::NaiveDate::from_ymd_opt(2013, 1, 15)
    );
    let undated = store.node("Order", &NodeKey::Integer(2)).await.unwrap().unwrap();
    assert!(!undated.properties.contains_key("order_date"));
}

/// Running the full load twice leaves the same graph behind
#[tokio::test]
async fn test_second_run_is_a_no_op() {
    let store = InMemoryGraphStore::new();

    let first = northwind_orchestrator(Arc::new(store.clone())).run().await.unwrap();
    let after_first = store.totals();
    let second = northwind_orchestrator(Arc::new(store.clone())).run().await.unwrap();

    assert_eq!(after_first, (18, 15));
    assert_eq!(store.totals(), after_first);

    assert_eq!(first.node("Customer").unwrap().created, 3);
    assert_eq!(second.node("Customer").unwrap().created, 0);
    assert_eq!(second.node("Customer").unwrap().updated, 3);
    assert!(second.relationships.iter().all(|r| r.created == 0));
    assert!(second
        .constraints
        .iter()
        .all(|c| c.outcome == Some(graphloom_core::ConstraintOutcome::AlreadyPresent)));
}

/// Duplicate identities collapse into one node carrying the later record
#[tokio::test]
async fn test_later_record_wins() {
    let store = InMemoryGraphStore::new();
    let report = northwind_orchestrator(Arc::new(store.clone())).run().await.unwrap();

    let orders = report.node("Order").unwrap();
    assert_eq!(orders.records_read, 4);
    assert_eq!(orders.created, 3);
    assert_eq!(orders.updated, 1);

    let order = store.node("Order", &NodeKey::Integer(10248)).await.unwrap().unwrap();
    // 9.8 truncates toward zero
    assert_eq!(order.properties["unit_price"], PropertyValue::Integer(9));
    assert_eq!(order.properties["quantity"], PropertyValue::Integer(10));
}

/// Every edge connects two nodes that exist
#[tokio::test]
async fn test_no_dangling_relationships() {
    let store = InMemoryGraphStore::new();
    let registry = SchemaRegistry::northwind().unwrap();
    let report = northwind_orchestrator(Arc::new(store.clone())).run().await.unwrap();

    for rel in registry.relationship_types() {
        let (from_type, to_type) = registry.endpoints(rel).unwrap();
        for (from, to) in store.relationships(rel.name()) {
            assert!(store.node_exists(from_type.label(), &from).await.unwrap());
            assert!(store.node_exists(to_type.label(), &to).await.unwrap());
            assert!(store
                .relationship_exists(
                    rel.name(),
                    NodeRef::new(from_type.label(), &from),
                    NodeRef::new(to_type.label(), &to),
                )
                .await
                .unwrap());
        }
    }

    assert_eq!(report.total_unresolved(), 3);
    assert_eq!(report.relationship("PART_OF").unwrap().unresolved, 1);
    assert_eq!(report.relationship("WRITES").unwrap().unresolved, 1);
    assert_eq!(report.relationship("PURCHASED").unwrap().existing, 1);
}

/// Store refuses the first two connections, the third attempt loads everything
#[tokio::test]
async fn test_retry_on_unavailable_store() {
    let store = InMemoryGraphStore::new();
    let connector = Arc::new(UnavailableConnector::new(store.clone(), 2));

    let report = northwind_orchestrator(connector.clone()).run().await.unwrap();

    assert_eq!(report.attempts, 3);
    assert_eq!(connector.attempts(), 3);
    assert_eq!(store.totals(), (18, 15));
    assert_eq!(store.node_count("Customer").await.unwrap(), 3);
}

/// A connection lost mid-run leaves a partial graph that the retry completes
#[tokio::test]
async fn test_partial_run_resumes_without_duplicates() {
    let store = InMemoryGraphStore::new();
    let connector = Arc::new(FailingConnector::new(store.clone(), 10));

    let report = northwind_orchestrator(connector.clone()).run().await.unwrap();

    assert_eq!(report.attempts, 2);
    assert_eq!(connector.connections(), 2);
    assert_eq!(store.totals(), (18, 15));
    // The retried run finds the nodes written before the failure
    assert!(report.nodes.iter().map(|n| n.updated).sum::<u64>() >= 10);
}

/// Cancelling mid-run stops at the next step boundary and still closes the store
#[tokio::test]
async fn test_cancel_between_steps_then_rerun() {
    let store = InMemoryGraphStore::new();
    let cancel = CancellationToken::new();
    // Three customers, then the first order write fires the token
    let connector = Arc::new(CancellingConnector::new(store.clone(), cancel.clone(), 4));
    let orchestrator = northwind_orchestrator(connector.clone());

    let err = orchestrator.run_with_cancel(cancel).await.unwrap_err();

    assert!(matches!(err, LoadError::Cancelled));
    assert_eq!(connector.closes(), 1);
    // The order step in flight finished; nothing after it ran
    assert_eq!(store.node_count("Customer").await.unwrap(), 3);
    assert_eq!(store.node_count("Order").await.unwrap(), 3);
    assert_eq!(store.node_count("Product").await.unwrap(), 0);
    assert_eq!(store.totals(), (6, 0));

    let report = orchestrator.run().await.unwrap();
    assert_eq!(report.attempts, 1);
    assert_eq!(connector.closes(), 2);
    assert_eq!(store.totals(), (18, 15));
}

/// Relationship loading before any node load resolves nothing
#[tokio::test]
async fn test_relationships_before_nodes_resolve_nothing() {
    let registry = SchemaRegistry::northwind().unwrap();
    let source = northwind_sample();
    let store = InMemoryGraphStore::new();

    for rel in registry.relationship_types() {
        let records = graphloom_core::RecordSource::open(&source, rel.source()).unwrap();
        let report = graphloom_core::load_relationships(&store, &registry, rel, records)
            .await
            .unwrap();
        assert_eq!(report.created, 0);
        assert_eq!(report.unresolved, report.records_read);
    }
    assert_eq!(store.totals(), (0, 0));
}
