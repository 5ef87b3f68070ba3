//! Error Types
//!
//! The loader distinguishes five classes of failure:
//!
//! - **Configuration / schema** problems are fatal at startup and never retried.
//! - **Connectivity** problems (store unreachable, transient auth failures) are
//!   retried at whole-run granularity by the orchestrator.
//! - **Record-level** problems skip the offending row and are counted.
//! - **Unresolved references** are not errors at all; they are counted in the
//!   relationship report.
//! - **Schema conflicts** block a single node type and are reported separately.

use thiserror::Error;

use crate::value::Coercion;

/// Errors raised by a [`GraphStore`](crate::store::GraphStore) backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Constraint on {label}.{property} rejected by store: {reason}")]
    SchemaConflict {
        label: String,
        property: String,
        reason: String,
    },

    #[error("Query error: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Create a connection error
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a query error
    pub fn query<S: Into<String>>(msg: S) -> Self {
        Self::Query(msg.into())
    }

    /// Check if a whole-run retry could plausibly clear this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Authentication(_) | Self::Query(_)
        )
    }

    /// Check if the error means the store could not be reached at all
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Authentication(_))
    }
}

/// Errors raised while opening or reading a record source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Unsupported record source location: {0}")]
    Unsupported(String),

    #[error("Failed to open record source {location}: {reason}")]
    Open { location: String, reason: String },

    #[error("Failed to read record source {location}: {reason}")]
    Read { location: String, reason: String },

    /// A single row could not be decoded; the rest of the source is still readable
    #[error("Malformed row in {location} at line {line}: {reason}")]
    Row {
        location: String,
        line: u64,
        reason: String,
    },
}

impl SourceError {
    /// Row-level failures skip one record instead of aborting the load
    pub fn is_record_level(&self) -> bool {
        matches!(self, Self::Row { .. })
    }
}

/// Record-level errors: the offending record is skipped and counted
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("identity field '{field}' is empty or missing")]
    MissingIdentity { field: String },

    #[error("field '{field}' value {value:?} is not a valid {coercion}: {reason}")]
    Coercion {
        field: String,
        coercion: Coercion,
        value: String,
        reason: String,
    },
}

/// Startup-fatal problems in the declarative catalog
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("invalid identifier {0:?}: expected [A-Za-z_][A-Za-z0-9_]*")]
    InvalidIdentifier(String),

    #[error("node type {0} declares no identity key")]
    MissingIdentity(String),

    #[error("node type {label} uses {coercion} for its identity key; only string or integer keys are supported")]
    UnsupportedIdentity { label: String, coercion: Coercion },

    #[error("{owner} maps property {property} more than once")]
    DuplicateProperty { owner: String, property: String },

    #[error("duplicate node type {0}")]
    DuplicateNodeType(String),

    #[error("duplicate relationship type {0}")]
    DuplicateRelationshipType(String),

    #[error("relationship type {rel_type} references unknown node type {label}")]
    UnknownEndpoint { rel_type: String, label: String },

    #[error("{0} has an empty record source name")]
    MissingSource(String),
}

/// Errors surfaced by the load orchestrator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Store unreachable: {0}")]
    Connectivity(StoreError),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Record source error: {0}")]
    Source(#[from] SourceError),

    #[error("Load cancelled")]
    Cancelled,

    #[error("Load failed after {attempts} attempt(s): {last}")]
    RetriesExhausted { attempts: u32, last: Box<LoadError> },
}

impl From<StoreError> for LoadError {
    fn from(err: StoreError) -> Self {
        if err.is_connectivity() {
            Self::Connectivity(err)
        } else {
            Self::Store(err)
        }
    }
}

impl LoadError {
    /// Whether the orchestrator should restart the whole run after this error
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connectivity(_) => true,
            Self::Store(err) => err.is_retryable(),
            Self::Source(err) => !err.is_record_level(),
            Self::Configuration(_)
            | Self::Schema(_)
            | Self::Cancelled
            | Self::RetriesExhausted { .. } => false,
        }
    }

    /// Number of attempts made before this error became final, if known
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::RetriesExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}
