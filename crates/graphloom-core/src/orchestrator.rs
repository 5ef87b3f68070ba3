//! Load Orchestrator
//!
//! Runs constraint installation, every node load, then every relationship load
//! against one store connection, and restarts the whole sequence after a fixed
//! delay when an attempt fails with a retryable error. Restarting from the top
//! is safe because every step is an idempotent upsert.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::constraints::install_constraints;
use crate::error::LoadError;
use crate::loader::{load_nodes, load_relationships};
use crate::record::{RecordSource, RecordStream};
use crate::report::{LoadReport, NodeLoadReport, RelationshipLoadReport};
use crate::retry::RetryPolicy;
use crate::schema::SchemaRegistry;
use crate::store::{GraphStore, StoreConnector};

/// Drives a full load of a [`SchemaRegistry`] into a graph store
pub struct LoadOrchestrator {
    registry: Arc<SchemaRegistry>,
    connector: Arc<dyn StoreConnector>,
    source: Arc<dyn RecordSource>,
    locations: HashMap<String, String>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for LoadOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadOrchestrator")
            .field("store", &self.connector.describe())
            .field("locations", &self.locations)
            .field("retry", &self.retry)
            .finish()
    }
}

impl LoadOrchestrator {
    /// Create an orchestrator
    ///
    /// `locations` maps every source name used by the registry to a location
    /// understood by `source`. A missing entry is a configuration error.
    pub fn new(
        registry: Arc<SchemaRegistry>,
        connector: Arc<dyn StoreConnector>,
        source: Arc<dyn RecordSource>,
        locations: HashMap<String, String>,
    ) -> Result<Self, LoadError> {
        let missing: Vec<&str> = registry
            .source_names()
            .into_iter()
            .filter(|name| !locations.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            return Err(LoadError::Configuration(format!(
                "no location configured for record source(s): {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            registry,
            connector,
            source,
            locations,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Run to completion, retrying per the configured policy
    pub async fn run(&self) -> Result<LoadReport, LoadError> {
        self.run_with_cancel(CancellationToken::new()).await
    }

    /// Like [`run`](Self::run), aborting with [`LoadError::Cancelled`] once
    /// `cancel` fires
    ///
    /// Cancellation is observed between steps and while waiting to retry; a
    /// step already in progress finishes first.
    pub async fn run_with_cancel(&self, cancel: CancellationToken) -> Result<LoadReport, LoadError> {
        let max_attempts = self.retry.max_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;
            if cancel.is_cancelled() {
                return Err(LoadError::Cancelled);
            }

            info!(
                attempt,
                max_attempts,
                store = %self.connector.describe(),
                "Starting load attempt"
            );

            let err = match self.attempt(&cancel).await {
                Ok(mut report) => {
                    report.attempts = attempt;
                    info!(attempt, complete = report.is_complete(), "Load finished");
                    return Ok(report);
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                error!(attempt, "Load failed: {}", err);
                return Err(err);
            }

            if attempt >= max_attempts {
                error!(attempt, "Load failed, no attempts left: {}", err);
                return Err(LoadError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            warn!(
                attempt,
                max_attempts,
                "Load attempt failed, retrying in {:?}: {}",
                self.retry.delay,
                err
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(LoadError::Cancelled),
                _ = tokio::time::sleep(self.retry.delay) => {}
            }
        }
    }

    /// One full pass over a fresh connection, closing it whatever happens
    async fn attempt(&self, cancel: &CancellationToken) -> Result<LoadReport, LoadError> {
        let store = self
            .connector
            .connect()
            .await
            .map_err(LoadError::Connectivity)?;

        let result = self.load_all(store.as_ref(), cancel).await;

        if let Err(err) = store.close().await {
            warn!("Failed to close store connection: {}", err);
        }
        result
    }

    async fn load_all(&self, store: &dyn GraphStore, cancel: &CancellationToken) -> Result<LoadReport, LoadError> {
        let registry = self.registry.as_ref();

        info!("Installing uniqueness constraints");
        let constraints = install_constraints(store, registry).await?;
        let blocked: HashSet<String> = constraints
            .iter()
            .filter(|c| c.conflict.is_some())
            .map(|c| c.label.clone())
            .collect();

        let mut report = LoadReport {
            attempts: 0,
            constraints,
            nodes: Vec::with_capacity(registry.node_types().len()),
            relationships: Vec::with_capacity(registry.relationship_types().len()),
        };

        for node_type in registry.node_types() {
            check_cancelled(cancel)?;
            if blocked.contains(node_type.label()) {
                warn!(label = node_type.label(), "Skipping node type blocked by constraint conflict");
                report.nodes.push(NodeLoadReport::blocked(node_type.label()));
                continue;
            }

            info!(label = node_type.label(), source = node_type.source(), "Loading nodes");
            let records = self.open(node_type.source())?;
            report.nodes.push(load_nodes(store, node_type, records).await?);
        }

        for rel in registry.relationship_types() {
            check_cancelled(cancel)?;
            if blocked.iter().any(|label| rel.touches(label)) {
                warn!(rel_type = rel.name(), "Skipping relationship type with a blocked endpoint");
                report.relationships.push(RelationshipLoadReport::blocked(rel.name()));
                continue;
            }

            info!(rel_type = rel.name(), source = rel.source(), "Loading relationships");
            let records = self.open(rel.source())?;
            report
                .relationships
                .push(load_relationships(store, registry, rel, records).await?);
        }

        Ok(report)
    }

    fn open(&self, source_name: &str) -> Result<RecordStream, LoadError> {
        let location = self.locations.get(source_name).ok_or_else(|| {
            LoadError::Configuration(format!("no location configured for record source {}", source_name))
        })?;
        Ok(self.source.open(location)?)
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), LoadError> {
    if cancel.is_cancelled() {
        return Err(LoadError::Cancelled);
    }
    Ok(())
}
