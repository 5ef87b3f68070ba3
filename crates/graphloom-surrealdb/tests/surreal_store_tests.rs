//! SurrealDB graph store tests against the embedded in-memory engine

use std::sync::Arc;

use chrono::NaiveDate;
use graphloom_core::test_support::{northwind_locations, northwind_sample};
use graphloom_core::{
    ConstraintOutcome, GraphStore, LoadOrchestrator, NodeKey, NodeRef, Properties, PropertyValue,
    RetryPolicy, SchemaRegistry, StoreError, UpsertOutcome,
};
use graphloom_surrealdb::{SurrealConfig, SurrealConnector, SurrealGraphStore};

async fn memory_store() -> (SurrealConnector, SurrealGraphStore) {
    let connector = SurrealConnector::new(SurrealConfig::memory("graphloom", "test"));
    let store = connector.open().await.unwrap();
    (connector, store)
}

fn props(pairs: Vec<(&str, PropertyValue)>) -> Properties {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

#[tokio::test]
async fn test_constraint_is_idempotent() {
    let (_connector, store) = memory_store().await;

    assert_eq!(
        store.ensure_unique_constraint("Order", "id").await.unwrap(),
        ConstraintOutcome::Created
    );
    assert_eq!(
        store.ensure_unique_constraint("Order", "id").await.unwrap(),
        ConstraintOutcome::AlreadyPresent
    );
}

#[tokio::test]
async fn test_non_unique_index_is_a_conflict() {
    let (_connector, store) = memory_store().await;
    store
        .client()
        .query("DEFINE INDEX Supplier_id_unique ON TABLE Supplier FIELDS key")
        .await
        .unwrap()
        .check()
        .unwrap();

    let err = store
        .ensure_unique_constraint("Supplier", "id")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::SchemaConflict { ref label, .. } if label == "Supplier"));
}

#[tokio::test]
async fn test_node_upsert_overwrites_and_keeps_types() {
    let (_connector, store) = memory_store().await;
    store.ensure_unique_constraint("Order", "id").await.unwrap();
    let key = NodeKey::Integer(10248);
    let date = NaiveDate::from_ymd_opt(1996, 7, 4).unwrap();

    let first = store
        .upsert_node(
            "Order",
            &key,
            &props(vec![
                ("order_date", PropertyValue::Date(date)),
                ("ship_city", PropertyValue::String("Reims".to_string())),
                ("freight", PropertyValue::String("32.38".to_string())),
            ]),
        )
        .await
        .unwrap();
    let second = store
        .upsert_node(
            "Order",
            &key,
            &props(vec![
                ("order_date", PropertyValue::Date(date)),
                ("ship_city", PropertyValue::String("Lyon".to_string())),
                ("discount", PropertyValue::Float(0.25)),
            ]),
        )
        .await
        .unwrap();

    assert_eq!(first, UpsertOutcome::Created);
    assert_eq!(second, UpsertOutcome::Matched);
    assert_eq!(store.node_count("Order").await.unwrap(), 1);

    let node = store.node("Order", &key).await.unwrap().unwrap();
    assert_eq!(node.properties["order_date"], PropertyValue::Date(date));
    assert_eq!(node.properties["ship_city"], PropertyValue::String("Lyon".to_string()));
    assert_eq!(node.properties["discount"], PropertyValue::Float(0.25));
    assert!(!node.properties.contains_key("freight"));

    assert!(store.node("Order", &NodeKey::Integer(1)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_timestamp_like_text_reads_back_as_text() {
    let (_connector, store) = memory_store().await;
    let key = NodeKey::from("C1");
    let date = NaiveDate::from_ymd_opt(1996, 7, 4).unwrap();
    store
        .upsert_node(
            "Customer",
            &key,
            &props(vec![
                ("fax", PropertyValue::String("1996-07-04T00:00:00Z".to_string())),
                ("first_order", PropertyValue::Date(date)),
                ("company_name", PropertyValue::String("Alfreds Futterkiste".to_string())),
            ]),
        )
        .await
        .unwrap();

    let node = store.node("Customer", &key).await.unwrap().unwrap();
    assert_eq!(node.properties["fax"], PropertyValue::String("1996-07-04T00:00:00Z".to_string()));
    assert_eq!(node.properties["first_order"], PropertyValue::Date(date));

    // Identities are matched through the indexed `key` field
    let names: Vec<String> = store
        .query(
            "SELECT VALUE company_name FROM Customer WHERE key = $key",
            vec![("key".to_string(), serde_json::json!("C1"))],
        )
        .await
        .unwrap();
    assert_eq!(names, vec!["Alfreds Futterkiste"]);
}

#[tokio::test]
async fn test_relationship_dedup_and_dangling_rejection() {
    let (_connector, store) = memory_store().await;
    let c1 = NodeKey::from("C1");
    let o1 = NodeKey::Integer(1);
    store.upsert_node("Customer", &c1, &Properties::new()).await.unwrap();
    store.upsert_node("Order", &o1, &Properties::new()).await.unwrap();
    let from = NodeRef::new("Customer", &c1);
    let to = NodeRef::new("Order", &o1);

    assert_eq!(
        store.upsert_relationship("PURCHASED", from, to).await.unwrap(),
        UpsertOutcome::Created
    );
    assert_eq!(
        store.upsert_relationship("PURCHASED", from, to).await.unwrap(),
        UpsertOutcome::Matched
    );
    assert_eq!(store.relationship_count("PURCHASED").await.unwrap(), 1);
    assert!(store.relationship_exists("PURCHASED", from, to).await.unwrap());
    assert!(!store.relationship_exists("PURCHASED", to, from).await.unwrap());

    let missing = NodeKey::Integer(9);
    assert!(store
        .upsert_relationship("PURCHASED", from, NodeRef::new("Order", &missing))
        .await
        .is_err());
    assert_eq!(store.relationship_count("PURCHASED").await.unwrap(), 1);
}

#[tokio::test]
async fn test_full_load_is_idempotent_and_queryable() {
    let connector = Arc::new(SurrealConnector::new(SurrealConfig::memory("graphloom", "northwind")));
    let orchestrator = LoadOrchestrator::new(
        Arc::new(SchemaRegistry::northwind().unwrap()),
        connector.clone(),
        Arc::new(northwind_sample()),
        northwind_locations(),
    )
    .unwrap()
    .with_retry(RetryPolicy::no_retry());

    let first = orchestrator.run().await.unwrap();
    let second = orchestrator.run().await.unwrap();
    assert!(first.is_complete());
    assert!(second.relationships.iter().all(|r| r.created == 0));

    let store = connector.open().await.unwrap();
    let registry = SchemaRegistry::northwind().unwrap();
    let mut nodes = 0;
    for node_type in registry.node_types() {
        nodes += store.node_count(node_type.label()).await.unwrap();
    }
    let mut edges = 0;
    for rel in registry.relationship_types() {
        edges += store.relationship_count(rel.name()).await.unwrap();
    }
    assert_eq!((nodes, edges), (18, 15));

    let mut buyers: Vec<String> = store
        .query(
            "SELECT VALUE company_name FROM Customer WHERE count(->PURCHASED->Order) > 0",
            Vec::new(),
        )
        .await
        .unwrap();
    buyers.sort();
    assert_eq!(buyers, vec!["Alfreds Futterkiste", "Ana Trujillo Emparedados"]);
}

#[tokio::test]
async fn test_close_keeps_embedded_data_for_next_connection() {
    let (connector, store) = memory_store().await;
    store
        .upsert_node("Category", &NodeKey::Integer(1), &Properties::new())
        .await
        .unwrap();

    store.close().await.unwrap();
    drop(store);

    let reopened = connector.open().await.unwrap();
    assert_eq!(reopened.node_count("Category").await.unwrap(), 1);
}
