use std::path::Path;
use std::str::FromStr;

use tracing::{debug, info};

use crate::config::LoaderConfig;
use crate::error::{ConfigError, ConfigResult};

/// Suffix of per-source location variables, e.g. `CUSTOMERS_CSV_PATH`
pub const SOURCE_PATH_SUFFIX: &str = "_CSV_PATH";
pub const ENV_STORE_URI: &str = "GRAPH_STORE_URI";
pub const ENV_STORE_USERNAME: &str = "GRAPH_STORE_USERNAME";
pub const ENV_STORE_PASSWORD: &str = "GRAPH_STORE_PASSWORD";
pub const ENV_STORE_NAMESPACE: &str = "GRAPH_STORE_NAMESPACE";
pub const ENV_STORE_DATABASE: &str = "GRAPH_STORE_DATABASE";
pub const ENV_MAX_ATTEMPTS: &str = "GRAPH_LOAD_MAX_ATTEMPTS";
pub const ENV_RETRY_DELAY_SECS: &str = "GRAPH_LOAD_RETRY_DELAY_SECS";

impl LoaderConfig {
    /// Defaults, overlaid with `path` when given
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse TOML; absent tables and keys keep their defaults
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply environment-style overrides
    ///
    /// Recognises `<SOURCE>_CSV_PATH` for every source plus the `GRAPH_STORE_*`
    /// and `GRAPH_LOAD_*` variables. Unrelated variables and empty values are
    /// ignored.
    pub fn apply_env_from<I, K, V>(&mut self, vars: I) -> ConfigResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let key = key.as_ref();
            let value: String = value.into();
            if value.trim().is_empty() {
                continue;
            }

            match key {
                ENV_STORE_URI => self.store.endpoint = value,
                ENV_STORE_USERNAME => self.store.username = Some(value),
                ENV_STORE_PASSWORD => self.store.password = Some(value),
                ENV_STORE_NAMESPACE => self.store.namespace = value,
                ENV_STORE_DATABASE => self.store.database = value,
                ENV_MAX_ATTEMPTS => self.retry.max_attempts = parse_env(key, &value)?,
                ENV_RETRY_DELAY_SECS => self.retry.delay_secs = parse_env(key, &value)?,
                _ => match key.strip_suffix(SOURCE_PATH_SUFFIX) {
                    Some(source) if !source.is_empty() => {
                        self.sources.insert(source.to_ascii_lowercase(), value);
                    }
                    _ => continue,
                },
            }
            debug!(variable = key, "Applied environment override");
        }
        Ok(())
    }

    /// Check everything needed before a connection is attempted
    pub fn validate(&self, required_sources: &[&str]) -> ConfigResult<()> {
        let store = &self.store;
        for (field, value) in [
            ("store.endpoint", &store.endpoint),
            ("store.namespace", &store.namespace),
            ("store.database", &store.database),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingValue {
                    field: field.to_string(),
                });
            }
        }

        match (&store.username, &store.password) {
            (Some(_), None) => {
                return Err(ConfigError::MissingValue {
                    field: "store.password".to_string(),
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::MissingValue {
                    field: "store.username".to_string(),
                })
            }
            _ => {}
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_attempts".to_string(),
                value: "0".to_string(),
            });
        }

        for source in required_sources {
            match self.sources.get(source) {
                Some(location) if !location.trim().is_empty() => {}
                _ => {
                    return Err(ConfigError::MissingSource {
                        name: source.to_string(),
                    })
                }
            }
        }

        Ok(())
    }
}

fn parse_env<T: FromStr>(field: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_ENDPOINT, DEFAULT_MAX_ATTEMPTS};
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;
    use test_case::test_case;

    const NORTHWIND_SOURCES: &[&str] = &["customers", "orders", "products", "suppliers", "categories", "reviews"];

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::load(None).unwrap();
        assert_eq!(config.store.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.store.namespace, "graphloom");
        assert_eq!(config.store.database, "northwind");
        assert_eq!(config.retry.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(config.retry.delay(), Duration::from_secs(10));
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_file_overlays_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[store]
endpoint = "ws://localhost:8000"
username = "root"
password = "secret"

[sources]
customers = "data/customers.csv"

[retry]
max_attempts = 3
"#
        )
        .unwrap();

        let config = LoaderConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.store.endpoint, "ws://localhost:8000");
        assert_eq!(config.store.database, "northwind");
        assert_eq!(config.store.credentials(), Some(("root", "secret")));
        assert_eq!(config.sources.get("customers"), Some("data/customers.csv"));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.delay_secs, 10);
    }

    #[test]
    fn test_missing_file_and_bad_toml() {
        let err = LoaderConfig::load(Some(Path::new("/nonexistent/graphloom.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let err = LoaderConfig::from_toml_str("[retry]\nmax_attempts = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = LoaderConfig::from_toml_str("[sources]\ncustomers = \"old.csv\"").unwrap();
        config
            .apply_env_from(env(&[
                ("CUSTOMERS_CSV_PATH", "/data/customers.csv"),
                ("ORDERS_CSV_PATH", "file:///data/orders.csv"),
                ("GRAPH_STORE_URI", "ws://graph:8000"),
                ("GRAPH_STORE_USERNAME", "root"),
                ("GRAPH_STORE_PASSWORD", "root"),
                ("GRAPH_LOAD_MAX_ATTEMPTS", "5"),
                ("GRAPH_LOAD_RETRY_DELAY_SECS", "2"),
                ("GRAPH_STORE_DATABASE", ""),
                ("HOME", "/root"),
                ("_CSV_PATH", "ignored"),
            ]))
            .unwrap();

        assert_eq!(config.sources.get("customers"), Some("/data/customers.csv"));
        assert_eq!(config.sources.get("orders"), Some("file:///data/orders.csv"));
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.store.endpoint, "ws://graph:8000");
        assert_eq!(config.store.database, "northwind");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.delay(), Duration::from_secs(2));
    }

    #[test_case("GRAPH_LOAD_MAX_ATTEMPTS", "lots" ; "non numeric attempts")]
    #[test_case("GRAPH_LOAD_MAX_ATTEMPTS", "-1" ; "negative attempts")]
    #[test_case("GRAPH_LOAD_RETRY_DELAY_SECS", "1.5" ; "fractional delay")]
    fn test_invalid_env_numbers(key: &str, value: &str) {
        let mut config = LoaderConfig::default();
        let err = config.apply_env_from(env(&[(key, value)])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == key));
    }

    #[test]
    fn test_validate_requires_every_source() {
        let mut config = LoaderConfig::default();
        for source in &NORTHWIND_SOURCES[..5] {
            config.sources.insert(*source, format!("{}.csv", source));
        }

        let err = config.validate(NORTHWIND_SOURCES).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSource { ref name } if name == "reviews"));

        config.sources.insert("reviews", "reviews.csv");
        config.validate(NORTHWIND_SOURCES).unwrap();
    }

    #[test]
    fn test_validate_rejects_half_credentials() {
        let mut config = LoaderConfig::default();
        config.store.username = Some("root".to_string());
        let err = config.validate(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingValue { ref field } if field == "store.password"));

        config.store.password = Some("root".to_string());
        config.validate(&[]).unwrap();
    }

    #[test]
    fn test_validate_rejects_empty_endpoint_and_zero_attempts() {
        let mut config = LoaderConfig::default();
        config.store.endpoint = " ".to_string();
        assert!(matches!(
            config.validate(&[]),
            Err(ConfigError::MissingValue { .. })
        ));

        let mut config = LoaderConfig::default();
        config.retry.max_attempts = 0;
        assert!(matches!(
            config.validate(&[]),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_password_not_in_debug_output() {
        let mut config = LoaderConfig::default();
        config.store.username = Some("root".to_string());
        config.store.password = Some("hunter2".to_string());
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
