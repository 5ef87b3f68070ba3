use std::path::PathBuf;

/// Errors raised while loading or validating configuration
///
/// Every variant is fatal at startup and never retried.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`LoaderConfig`](crate::LoaderConfig)
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required value is empty or absent
    #[error("missing configuration value: {field}")]
    MissingValue { field: String },

    /// No location configured for a record source the schema reads from
    #[error("no location configured for record source '{name}'")]
    MissingSource { name: String },

    /// A value was present but unusable
    #[error("invalid value for {field}: {value:?}")]
    InvalidValue { field: String, value: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
