//! Graph bulk-loading engine
//!
//! Turns flat record sources into a property graph under identity-key
//! uniqueness constraints. Node and relationship types are declared as data in
//! a [`SchemaRegistry`]; two generic loaders apply those declarations, and the
//! [`LoadOrchestrator`] sequences constraints, nodes and relationships inside a
//! bounded whole-run retry.
//!
//! ```no_run
//! use std::sync::Arc;
//! use graphloom_core::{CsvRecordSource, InMemoryGraphStore, LoadOrchestrator, SchemaRegistry};
//!
//! # async fn example(locations: std::collections::HashMap<String, String>) -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = LoadOrchestrator::new(
//!     Arc::new(SchemaRegistry::northwind()?),
//!     Arc::new(InMemoryGraphStore::new()),
//!     Arc::new(CsvRecordSource::new()),
//!     locations,
//! )?;
//! let report = orchestrator.run().await?;
//! println!("complete: {}", report.is_complete());
//! # Ok(())
//! # }
//! ```

pub mod constraints;
pub mod error;
pub mod loader;
pub mod memory;
pub mod orchestrator;
pub mod record;
pub mod report;
pub mod retry;
pub mod schema;
pub mod store;
pub mod value;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use constraints::{ensure_uniqueness, install_constraints};
pub use error::{LoadError, RecordError, SchemaError, SourceError, StoreError, StoreResult};
pub use loader::{load_nodes, load_relationships};
pub use memory::InMemoryGraphStore;
pub use orchestrator::LoadOrchestrator;
pub use record::{CsvRecordSource, InMemoryRecordSource, Record, RecordSource, RecordStream};
pub use report::{ConstraintReport, LoadReport, NodeLoadReport, RelationshipLoadReport, SkipLog, SkippedRecord};
pub use retry::RetryPolicy;
pub use schema::{Endpoint, NodeType, PropertyMapping, RelationshipType, SchemaRegistry};
pub use store::{ConstraintOutcome, GraphStore, Node, NodeRef, StoreConnector, UpsertOutcome};
pub use value::{Coercion, NodeKey, Properties, PropertyValue};
