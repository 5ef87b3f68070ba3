//! CLI configuration: the only place process environment is read

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use graphloom_config::{LoaderConfig, RetryConfig, StoreConfig};
use graphloom_core::RetryPolicy;
use graphloom_surrealdb::SurrealConfig;

/// Configuration resolved for one CLI invocation
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub loader: LoaderConfig,
    /// Relative source locations resolve against the config file's directory
    pub base_dir: Option<PathBuf>,
}

impl CliConfig {
    /// Defaults, then the config file, then process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, std::env::vars())
    }

    pub fn load_with_env<I>(path: Option<&Path>, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut loader = LoaderConfig::load(path).context("Failed to load configuration")?;
        loader
            .apply_env_from(vars)
            .context("Invalid environment override")?;

        let base_dir = path
            .and_then(Path::parent)
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf);

        Ok(Self { loader, base_dir })
    }
}

pub fn surreal_config(store: &StoreConfig) -> SurrealConfig {
    let config = SurrealConfig::new(&store.endpoint, &store.namespace, &store.database);
    match store.credentials() {
        Some((username, password)) => config.with_credentials(username, password),
        None => config,
    }
}

pub fn retry_policy(retry: &RetryConfig) -> RetryPolicy {
    RetryPolicy::new(retry.max_attempts, retry.delay())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_store_config_maps_to_surreal_config() {
        let mut store = StoreConfig::default();
        store.username = Some("root".to_string());
        store.password = Some("secret".to_string());

        let surreal = surreal_config(&store);
        assert_eq!(surreal.endpoint, "mem://");
        assert_eq!(surreal.database, "northwind");
        assert_eq!(surreal.credentials.map(|c| c.username), Some("root".to_string()));
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = retry_policy(&RetryConfig {
            max_attempts: 7,
            delay_secs: 3,
        });
        assert_eq!(policy, RetryPolicy::new(7, Duration::from_secs(3)));
    }

    #[test]
    fn test_base_dir_follows_config_file() {
        let config = CliConfig::load_with_env(None, Vec::new()).unwrap();
        assert!(config.base_dir.is_none());

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("graphloom.toml");
        std::fs::write(&path, "[sources]\norders = \"orders.csv\"\n").unwrap();

        let config = CliConfig::load_with_env(Some(&path), Vec::new()).unwrap();
        assert_eq!(config.base_dir.as_deref(), Some(dir.path()));
        assert_eq!(config.loader.sources.get("orders"), Some("orders.csv"));
    }

    #[test]
    #[serial_test::serial]
    fn test_process_environment_overrides_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("graphloom.toml");
        std::fs::write(&path, "[retry]\nmax_attempts = 5\n").unwrap();

        std::env::set_var("GRAPH_LOAD_MAX_ATTEMPTS", "2");
        std::env::set_var("ORDERS_CSV_PATH", "/data/orders.csv");
        let config = CliConfig::load(Some(&path));
        std::env::remove_var("GRAPH_LOAD_MAX_ATTEMPTS");
        std::env::remove_var("ORDERS_CSV_PATH");

        let config = config.unwrap();
        assert_eq!(config.loader.retry.max_attempts, 2);
        assert_eq!(config.loader.sources.get("orders"), Some("/data/orders.csv"));
    }
}
