//! Opening SurrealDB connections

use async_trait::async_trait;
use graphloom_core::{GraphStore, StoreConnector, StoreError, StoreResult};
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::SurrealConfig;
use crate::store::SurrealGraphStore;

/// Connect, authenticate and select the namespace and database
pub async fn connect_client(config: &SurrealConfig) -> StoreResult<Surreal<Any>> {
    let db = any::connect(config.endpoint.as_str())
        .await
        .map_err(|e| StoreError::connection(format!("Failed to connect to {}: {}", config.endpoint, e)))?;

    if let Some(credentials) = &config.credentials {
        db.signin(Root {
            username: &credentials.username,
            password: &credentials.password,
        })
        .await
        .map_err(|e| StoreError::Authentication(format!("Failed to sign in as {}: {}", credentials.username, e)))?;
    }

    db.use_ns(&config.namespace)
        .use_db(&config.database)
        .await
        .map_err(|e| {
            StoreError::connection(format!(
                "Failed to use namespace '{}' and database '{}': {}",
                config.namespace, config.database, e
            ))
        })?;

    Ok(db)
}

/// [`StoreConnector`] for a configured SurrealDB endpoint
///
/// Every `connect` opens a fresh connection to a server. An embedded `mem://`
/// database only lives as long as its handle, so it is created once and shared
/// by every connection from this connector.
pub struct SurrealConnector {
    config: SurrealConfig,
    embedded: OnceCell<Surreal<Any>>,
}

impl std::fmt::Debug for SurrealConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurrealConnector")
            .field("config", &self.config)
            .field("embedded_open", &self.embedded.initialized())
            .finish()
    }
}

impl SurrealConnector {
    pub fn new(config: SurrealConfig) -> Self {
        Self {
            config,
            embedded: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &SurrealConfig {
        &self.config
    }

    /// Open a store directly, outside of a load run
    pub async fn open(&self) -> StoreResult<SurrealGraphStore> {
        let db = if self.config.is_embedded() {
            self.embedded
                .get_or_try_init(|| connect_client(&self.config))
                .await?
                .clone()
        } else {
            connect_client(&self.config).await?
        };

        info!(store = %self.config, "Connected to SurrealDB");
        Ok(SurrealGraphStore::from_client(db))
    }
}

#[async_trait]
impl StoreConnector for SurrealConnector {
    async fn connect(&self) -> StoreResult<Box<dyn GraphStore>> {
        Ok(Box::new(self.open().await?))
    }

    fn describe(&self) -> String {
        self.config.to_string()
    }
}

/// An already open store hands out clones of itself
#[async_trait]
impl StoreConnector for SurrealGraphStore {
    async fn connect(&self) -> StoreResult<Box<dyn GraphStore>> {
        debug!("Reusing open SurrealDB connection");
        Ok(Box::new(self.clone()))
    }

    fn describe(&self) -> String {
        "SurrealDB (shared connection)".to_string()
    }
}
