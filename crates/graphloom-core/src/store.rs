//! Graph store abstraction
//!
//! The loader writes through [`GraphStore`] and obtains stores through a
//! [`StoreConnector`], one connection per load attempt. Backends implement both;
//! the in-memory store lives in [`crate::memory`], SurrealDB in its own crate.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::StoreResult;
use crate::value::{NodeKey, Properties};

/// Result of an idempotent constraint installation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintOutcome {
    Created,
    AlreadyPresent,
}

/// Result of an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Nothing with this identity existed before
    Created,
    /// An existing node or edge was matched (and, for nodes, overwritten)
    Matched,
}

/// Address of a node: its type label and identity value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRef<'a> {
    pub label: &'a str,
    pub key: &'a NodeKey,
}

impl<'a> NodeRef<'a> {
    pub fn new(label: &'a str, key: &'a NodeKey) -> Self {
        Self { label, key }
    }
}

impl std::fmt::Display for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.label, self.key)
    }
}

/// A node as read back from the store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub label: String,
    pub key: NodeKey,
    pub properties: Properties,
}

/// Write and read operations the loader needs from a property graph
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Create a uniqueness constraint on `property` of `label` if none exists
    ///
    /// Must be safe to call repeatedly. A store that already holds an
    /// incompatible constraint returns [`StoreError::SchemaConflict`](crate::StoreError::SchemaConflict).
    async fn ensure_unique_constraint(&self, label: &str, property: &str) -> StoreResult<ConstraintOutcome>;

    /// Create or overwrite the node identified by `key`
    ///
    /// On a match the stored properties are replaced by `properties`
    /// wholesale; old properties absent from the new set are removed.
    async fn upsert_node(&self, label: &str, key: &NodeKey, properties: &Properties) -> StoreResult<UpsertOutcome>;

    async fn node(&self, label: &str, key: &NodeKey) -> StoreResult<Option<Node>>;

    async fn node_exists(&self, label: &str, key: &NodeKey) -> StoreResult<bool> {
        Ok(self.node(label, key).await?.is_some())
    }

    /// Create the directed edge `from -[rel_type]-> to` unless it already exists
    ///
    /// Callers resolve both endpoints first; backends reject a missing endpoint
    /// with an error rather than creating a dangling edge.
    async fn upsert_relationship(&self, rel_type: &str, from: NodeRef<'_>, to: NodeRef<'_>) -> StoreResult<UpsertOutcome>;

    async fn relationship_exists(&self, rel_type: &str, from: NodeRef<'_>, to: NodeRef<'_>) -> StoreResult<bool>;

    async fn node_count(&self, label: &str) -> StoreResult<u64>;

    async fn relationship_count(&self, rel_type: &str) -> StoreResult<u64>;

    /// Release the connection; called on every exit path of a load attempt
    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Opens store connections
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> StoreResult<Box<dyn GraphStore>>;

    /// Human-readable target, for logs
    fn describe(&self) -> String;
}
