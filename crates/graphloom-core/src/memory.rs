//! In-memory graph store
//!
//! Holds nodes per label keyed by identity and edges per relationship type as a
//! set of ordered endpoint pairs, so uniqueness and edge deduplication follow
//! from the data structures themselves. Clones share state, which lets one
//! store play the part of a persistent backend across several connections.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{StoreError, StoreResult};
use crate::store::{
    ConstraintOutcome, GraphStore, Node, NodeRef, StoreConnector, UpsertOutcome,
};
use crate::value::{NodeKey, Properties};

/// Kind of a constraint held by the in-memory store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    /// Property must be present; incompatible with a uniqueness request
    Existence,
}

type Endpoint = (String, NodeKey);

#[derive(Debug, Default)]
struct GraphState {
    constraints: HashMap<(String, String), ConstraintKind>,
    nodes: HashMap<String, BTreeMap<NodeKey, Properties>>,
    edges: HashMap<String, BTreeSet<(Endpoint, Endpoint)>>,
}

impl GraphState {
    fn contains(&self, node: NodeRef<'_>) -> bool {
        self.nodes
            .get(node.label)
            .is_some_and(|nodes| nodes.contains_key(node.key))
    }
}

/// Shared-state in-memory [`GraphStore`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryGraphStore {
    state: Arc<Mutex<GraphState>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a constraint directly, bypassing the loader
    pub fn define_constraint(&self, label: &str, property: &str, kind: ConstraintKind) {
        self.state
            .lock()
            .constraints
            .insert((label.to_string(), property.to_string()), kind);
    }

    pub fn constraint(&self, label: &str, property: &str) -> Option<ConstraintKind> {
        self.state
            .lock()
            .constraints
            .get(&(label.to_string(), property.to_string()))
            .copied()
    }

    /// Every edge of a type as `(from key, to key)` pairs
    pub fn relationships(&self, rel_type: &str) -> Vec<(NodeKey, NodeKey)> {
        self.state
            .lock()
            .edges
            .get(rel_type)
            .map(|edges| {
                edges
                    .iter()
                    .map(|((_, from), (_, to))| (from.clone(), to.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total nodes and edges across all types
    pub fn totals(&self) -> (usize, usize) {
        let state = self.state.lock();
        (
            state.nodes.values().map(BTreeMap::len).sum(),
            state.edges.values().map(BTreeSet::len).sum(),
        )
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn ensure_unique_constraint(&self, label: &str, property: &str) -> StoreResult<ConstraintOutcome> {
        let mut state = self.state.lock();
        let slot = (label.to_string(), property.to_string());

        match state.constraints.get(&slot) {
            Some(ConstraintKind::Unique) => Ok(ConstraintOutcome::AlreadyPresent),
            Some(other) => Err(StoreError::SchemaConflict {
                label: label.to_string(),
                property: property.to_string(),
                reason: format!("existing {:?} constraint on the same property", other),
            }),
            None => {
                state.constraints.insert(slot, ConstraintKind::Unique);
                Ok(ConstraintOutcome::Created)
            }
        }
    }

    async fn upsert_node(&self, label: &str, key: &NodeKey, properties: &Properties) -> StoreResult<UpsertOutcome> {
        let mut state = self.state.lock();
        let previous = state
            .nodes
            .entry(label.to_string())
            .or_default()
            .insert(key.clone(), properties.clone());

        Ok(match previous {
            Some(_) => UpsertOutcome::Matched,
            None => UpsertOutcome::Created,
        })
    }

    async fn node(&self, label: &str, key: &NodeKey) -> StoreResult<Option<Node>> {
        let state = self.state.lock();
        Ok(state
            .nodes
            .get(label)
            .and_then(|nodes| nodes.get(key))
            .map(|properties| Node {
                label: label.to_string(),
                key: key.clone(),
                properties: properties.clone(),
            }))
    }

    async fn upsert_relationship(&self, rel_type: &str, from: NodeRef<'_>, to: NodeRef<'_>) -> StoreResult<UpsertOutcome> {
        let mut state = self.state.lock();
        for end in [from, to] {
            if !state.contains(end) {
                return Err(StoreError::query(format!(
                    "cannot create {} edge: endpoint {} does not exist",
                    rel_type, end
                )));
            }
        }

        let edge = (
            (from.label.to_string(), from.key.clone()),
            (to.label.to_string(), to.key.clone()),
        );
        let created = state
            .edges
            .entry(rel_type.to_string())
            .or_default()
            .insert(edge);

        Ok(if created {
            UpsertOutcome::Created
        } else {
            UpsertOutcome::Matched
        })
    }

    async fn relationship_exists(&self, rel_type: &str, from: NodeRef<'_>, to: NodeRef<'_>) -> StoreResult<bool> {
        let state = self.state.lock();
        let edge = (
            (from.label.to_string(), from.key.clone()),
            (to.label.to_string(), to.key.clone()),
        );
        Ok(state
            .edges
            .get(rel_type)
            .is_some_and(|edges| edges.contains(&edge)))
    }

    async fn node_count(&self, label: &str) -> StoreResult<u64> {
        Ok(self
            .state
            .lock()
            .nodes
            .get(label)
            .map_or(0, |nodes| nodes.len() as u64))
    }

    async fn relationship_count(&self, rel_type: &str) -> StoreResult<u64> {
        Ok(self
            .state
            .lock()
            .edges
            .get(rel_type)
            .map_or(0, |edges| edges.len() as u64))
    }
}

#[async_trait]
impl StoreConnector for InMemoryGraphStore {
    async fn connect(&self) -> StoreResult<Box<dyn GraphStore>> {
        Ok(Box::new(self.clone()))
    }

    fn describe(&self) -> String {
        "in-memory graph".to_string()
    }
}
