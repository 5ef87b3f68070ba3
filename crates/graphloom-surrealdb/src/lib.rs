//! SurrealDB backend for graphloom
//!
//! Implements [`GraphStore`](graphloom_core::GraphStore) on SurrealDB, either
//! embedded (`mem://`) or against a server (`ws://`, `http://`). The loaded
//! graph can be read back with SurrealQL through [`SurrealGraphStore::query`].
//! A node's identity is stored in its `key` field, which carries the unique
//! index; filter on `key` (e.g. `SELECT * FROM Customer WHERE key = 'ALFKI'`).
//!
//! ```no_run
//! use graphloom_surrealdb::{SurrealConfig, SurrealConnector};
//!
//! # async fn example() -> Result<(), graphloom_core::StoreError> {
//! let connector = SurrealConnector::new(
//!     SurrealConfig::new("ws://localhost:8000", "graphloom", "northwind")
//!         .with_credentials("root", "root"),
//! );
//! let store = connector.open().await?;
//! let rows: Vec<serde_json::Value> = store
//!     .query("SELECT company_name, ->PURCHASED->Order.id AS orders FROM Customer", Vec::new())
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod connector;
mod convert;
mod store;

pub use config::{Credentials, SurrealConfig};
pub use connector::{connect_client, SurrealConnector};
pub use store::{edge_index_name, node_index_name, SurrealGraphStore};
