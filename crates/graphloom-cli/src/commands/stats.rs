use std::collections::BTreeMap;

use anyhow::{Context, Result};
use graphloom_core::{GraphStore, SchemaRegistry};
use graphloom_surrealdb::SurrealConnector;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::config::{surreal_config, CliConfig};
use crate::output;

/// Count nodes and relationships per declared type; a single attempt, no retry
pub async fn execute(config: CliConfig, format: OutputFormat) -> Result<()> {
    let registry = SchemaRegistry::northwind()?;
    let connector = SurrealConnector::new(surreal_config(&config.loader.store));
    let store = connector
        .open()
        .await
        .with_context(|| format!("Failed to connect to {}", connector.config()))?;

    let mut nodes = Vec::new();
    for node_type in registry.node_types() {
        nodes.push((node_type.label().to_string(), store.node_count(node_type.label()).await?));
    }
    let mut relationships = Vec::new();
    for rel in registry.relationship_types() {
        relationships.push((rel.name().to_string(), store.relationship_count(rel.name()).await?));
    }
    store.close().await?;

    match format {
        OutputFormat::Json => {
            let value = json!({
                "nodes": nodes.iter().cloned().collect::<BTreeMap<_, _>>(),
                "relationships": relationships.iter().cloned().collect::<BTreeMap<_, _>>(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Table => {
            println!("{}", output::stats_table("Node type", &nodes));
            println!("{}", output::stats_table("Relationship", &relationships));
        }
    }

    Ok(())
}
