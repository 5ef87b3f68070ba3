//! SurrealDB-backed Graph Store
//!
//! ## Layout
//!
//! - Each node type is a table named after its label. A node is the record
//!   `Label:⟨identity⟩`; the identity is also kept in a `key` field guarded by
//!   a `UNIQUE` index, which is the persisted uniqueness constraint. The index
//!   is named after the schema's identity property (`Order_id_unique`) but
//!   covers `key`, so queries match identities with `WHERE key = ..`.
//! - Each relationship type is a relation table named after the type, filled
//!   with `RELATE`. A `UNIQUE` index on `(in, out)` keeps one edge per ordered
//!   pair.
//!
//! Record ids give upsert-by-identity for free: writing the same identity twice
//! addresses the same record.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use graphloom_core::{
    ConstraintOutcome, GraphStore, Node, NodeKey, NodeRef, Properties, StoreError, StoreResult,
    UpsertOutcome,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use surrealdb::engine::any::Any;
use surrealdb::{Response, Surreal};
use tracing::debug;

use crate::convert::{bindings, content_object, key_param, rows_from_tagged};

/// Name of the uniqueness index for a node type's identity
///
/// Named after the identity property; the indexed field is always `key`.
pub fn node_index_name(label: &str, property: &str) -> String {
    format!("{}_{}_unique", label, property)
}

/// Name of the `(in, out)` index for a relationship type
pub fn edge_index_name(rel_type: &str) -> String {
    format!("{}_in_out_unique", rel_type)
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: u64,
}

/// [`GraphStore`] over one SurrealDB connection
///
/// Cloning is cheap and shares the connection.
#[derive(Clone)]
pub struct SurrealGraphStore {
    db: Surreal<Any>,
    /// Relationship tables whose `(in, out)` index is known to exist
    edge_indexes: Arc<Mutex<HashSet<String>>>,
}

impl std::fmt::Debug for SurrealGraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurrealGraphStore")
            .field("edge_indexes", &self.edge_indexes.lock().len())
            .finish()
    }
}

impl SurrealGraphStore {
    /// Wrap a connection that already has its namespace and database selected
    pub fn from_client(db: Surreal<Any>) -> Self {
        Self {
            db,
            edge_indexes: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Get the underlying database client
    pub fn client(&self) -> &Surreal<Any> {
        &self.db
    }

    /// Run a SurrealQL statement and deserialise the rows of its first result
    ///
    /// This is the read interface for consumers of the finished graph, e.g.
    /// `SELECT company_name, ->PURCHASED->Order.id AS orders FROM Customer`.
    /// Node identities live in the `key` field (the record id carries them
    /// too), so filter with `WHERE key = ..`, not on `id`.
    pub async fn query<T: DeserializeOwned>(&self, surql: &str, params: Vec<(String, Value)>) -> StoreResult<Vec<T>> {
        self.run(surql, params)
            .await?
            .take(0)
            .map_err(|e| StoreError::Serialization(format!("Failed to read query results: {}", e)))
    }

    /// First result as SurrealDB-typed JSON, tags included
    async fn query_tagged(&self, surql: &str, params: Vec<(String, Value)>) -> StoreResult<Value> {
        let result: surrealdb::Value = self
            .run(surql, params)
            .await?
            .take(0)
            .map_err(|e| StoreError::Serialization(format!("Failed to read query results: {}", e)))?;

        serde_json::to_value(&result)
            .map_err(|e| StoreError::Serialization(format!("Failed to serialize SurrealDB value: {}", e)))
    }

    /// Run statements whose results are not needed
    async fn execute(&self, surql: &str, params: Vec<(String, Value)>) -> StoreResult<()> {
        self.run(surql, params).await.map(|_| ())
    }

    async fn run(&self, surql: &str, params: Vec<(String, Value)>) -> StoreResult<Response> {
        debug!(statement = surql, "Executing");
        self.db
            .query(surql)
            .bind(bindings(params))
            .await
            .map_err(|e| StoreError::query(format!("Query execution failed: {}", e)))?
            .check()
            .map_err(|e| StoreError::query(format!("Query returned error: {}", e)))
    }

    async fn count(&self, surql: &str, params: Vec<(String, Value)>) -> StoreResult<u64> {
        let rows: Vec<CountRow> = self.query(surql, params).await?;
        Ok(rows.first().map_or(0, |row| row.count))
    }

    /// Index definitions on `table`, keyed by index name
    async fn table_indexes(&self, table: &str) -> StoreResult<serde_json::Map<String, Value>> {
        let info: Vec<Value> = self
            .query(&format!("INFO FOR TABLE `{}`", table), Vec::new())
            .await?;

        Ok(info
            .into_iter()
            .next()
            .and_then(|info| match info {
                Value::Object(mut fields) => match fields.remove("indexes") {
                    Some(Value::Object(indexes)) => Some(indexes),
                    _ => None,
                },
                _ => None,
            })
            .unwrap_or_default())
    }

    async fn ensure_edge_index(&self, rel_type: &str) -> StoreResult<()> {
        if self.edge_indexes.lock().contains(rel_type) {
            return Ok(());
        }

        self.execute(
            &format!(
                "DEFINE INDEX IF NOT EXISTS {} ON TABLE `{}` FIELDS in, out UNIQUE",
                edge_index_name(rel_type),
                rel_type
            ),
            Vec::new(),
        )
        .await?;
        self.edge_indexes.lock().insert(rel_type.to_string());
        Ok(())
    }
}

fn endpoint_params(from: NodeRef<'_>, to: NodeRef<'_>) -> Vec<(String, Value)> {
    vec![
        ("from_table".to_string(), Value::String(from.label.to_string())),
        ("from_key".to_string(), key_param(from.key)),
        ("to_table".to_string(), Value::String(to.label.to_string())),
        ("to_key".to_string(), key_param(to.key)),
    ]
}

fn node_params(label: &str, key: &NodeKey) -> Vec<(String, Value)> {
    vec![
        ("table".to_string(), Value::String(label.to_string())),
        ("key".to_string(), key_param(key)),
    ]
}

#[async_trait]
impl GraphStore for SurrealGraphStore {
    async fn ensure_unique_constraint(&self, label: &str, property: &str) -> StoreResult<ConstraintOutcome> {
        let name = node_index_name(label, property);
        self.execute(&format!("DEFINE TABLE IF NOT EXISTS `{}` SCHEMALESS", label), Vec::new())
            .await?;

        if let Some(definition) = self.table_indexes(label).await?.get(&name) {
            let definition = definition.as_str().unwrap_or_default();
            if definition.contains("UNIQUE") {
                return Ok(ConstraintOutcome::AlreadyPresent);
            }
            return Err(StoreError::SchemaConflict {
                label: label.to_string(),
                property: property.to_string(),
                reason: format!("index {} exists but is not unique: {}", name, definition),
            });
        }

        // The index builds over existing data, so duplicate keys already in
        // the table make the statement fail; transport errors stay retryable
        let statement = format!("DEFINE INDEX IF NOT EXISTS {} ON TABLE `{}` FIELDS key UNIQUE", name, label);
        debug!(statement = %statement, "Executing");
        self.db
            .query(statement)
            .await
            .map_err(|e| StoreError::query(format!("Query execution failed: {}", e)))?
            .check()
            .map_err(|e| StoreError::SchemaConflict {
                label: label.to_string(),
                property: property.to_string(),
                reason: e.to_string(),
            })?;

        Ok(ConstraintOutcome::Created)
    }

    async fn upsert_node(&self, label: &str, key: &NodeKey, properties: &Properties) -> StoreResult<UpsertOutcome> {
        let existed = self.node_exists(label, key).await?;

        let (content, mut params) = content_object(properties);
        params.extend(node_params(label, key));
        self.execute(
            &format!("UPSERT type::thing($table, $key) CONTENT {} RETURN NONE", content),
            params,
        )
        .await?;

        Ok(if existed {
            UpsertOutcome::Matched
        } else {
            UpsertOutcome::Created
        })
    }

    async fn node(&self, label: &str, key: &NodeKey) -> StoreResult<Option<Node>> {
        let result = self
            .query_tagged("SELECT * OMIT id, key FROM type::thing($table, $key)", node_params(label, key))
            .await?;

        Ok(rows_from_tagged(result)?.into_iter().next().map(|properties| Node {
            label: label.to_string(),
            key: key.clone(),
            properties,
        }))
    }

    async fn node_exists(&self, label: &str, key: &NodeKey) -> StoreResult<bool> {
        let count = self
            .count(
                "SELECT count() AS count FROM type::thing($table, $key) GROUP ALL",
                node_params(label, key),
            )
            .await?;
        Ok(count > 0)
    }

    async fn upsert_relationship(&self, rel_type: &str, from: NodeRef<'_>, to: NodeRef<'_>) -> StoreResult<UpsertOutcome> {
        for end in [from, to] {
            if !self.node_exists(end.label, end.key).await? {
                return Err(StoreError::query(format!(
                    "cannot create {} edge: endpoint {} does not exist",
                    rel_type, end
                )));
            }
        }

        self.ensure_edge_index(rel_type).await?;
        if self.relationship_exists(rel_type, from, to).await? {
            return Ok(UpsertOutcome::Matched);
        }

        self.execute(
            &format!(
                "LET $from_node = type::thing($from_table, $from_key); \
                 LET $to_node = type::thing($to_table, $to_key); \
                 RELATE $from_node->`{}`->$to_node RETURN NONE",
                rel_type
            ),
            endpoint_params(from, to),
        )
        .await?;
        Ok(UpsertOutcome::Created)
    }

    async fn relationship_exists(&self, rel_type: &str, from: NodeRef<'_>, to: NodeRef<'_>) -> StoreResult<bool> {
        let mut params = endpoint_params(from, to);
        params.push(("rel".to_string(), Value::String(rel_type.to_string())));

        let count = self
            .count(
                "SELECT count() AS count FROM type::table($rel) \
                 WHERE in = type::thing($from_table, $from_key) \
                 AND out = type::thing($to_table, $to_key) GROUP ALL",
                params,
            )
            .await?;
        Ok(count > 0)
    }

    async fn node_count(&self, label: &str) -> StoreResult<u64> {
        self.count(
            "SELECT count() AS count FROM type::table($table) GROUP ALL",
            vec![("table".to_string(), Value::String(label.to_string()))],
        )
        .await
    }

    async fn relationship_count(&self, rel_type: &str) -> StoreResult<u64> {
        self.count(
            "SELECT count() AS count FROM type::table($rel) GROUP ALL",
            vec![("rel".to_string(), Value::String(rel_type.to_string()))],
        )
        .await
    }

    /// Nothing to flush: every statement is committed as it runs. The
    /// connection itself is released when the last clone of this store (and
    /// of its connector, for `mem://`) is dropped.
    async fn close(&self) -> StoreResult<()> {
        debug!("Releasing SurrealDB connection");
        Ok(())
    }
}
