//! # Graphloom Configuration
//!
//! The explicit configuration structure handed to the loader: where the graph
//! store lives, where every record source can be read from, and how long to
//! keep retrying.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment overrides. The environment is passed in as an iterator, so
//! nothing in this crate reads process state on its own.
//!
//! ```rust,no_run
//! use graphloom_config::LoaderConfig;
//!
//! # fn main() -> Result<(), graphloom_config::ConfigError> {
//! let mut config = LoaderConfig::load(Some("graphloom.toml".as_ref()))?;
//! config.apply_env_from(std::env::vars())?;
//! config.validate(&["customers", "orders"])?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod loader;

pub use config::*;
pub use error::*;
pub use loader::*;
