use std::fmt;

/// Connection settings for a SurrealDB graph store
#[derive(Clone, PartialEq, Eq)]
pub struct SurrealConfig {
    /// `mem://` for an embedded database, or `ws://`/`http://` for a server
    pub endpoint: String,
    pub namespace: String,
    pub database: String,
    /// Root credentials, required by most servers
    pub credentials: Option<Credentials>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl SurrealConfig {
    pub fn new(endpoint: impl Into<String>, namespace: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            namespace: namespace.into(),
            database: database.into(),
            credentials: None,
        }
    }

    /// Embedded in-memory database
    pub fn memory(namespace: impl Into<String>, database: impl Into<String>) -> Self {
        Self::new("mem://", namespace, database)
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Whether the endpoint is an in-process engine rather than a server
    pub fn is_embedded(&self) -> bool {
        self.endpoint.starts_with("mem://") || self.endpoint == "memory"
    }
}

impl fmt::Debug for SurrealConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurrealConfig")
            .field("endpoint", &self.endpoint)
            .field("namespace", &self.namespace)
            .field("database", &self.database)
            .field(
                "username",
                &self.credentials.as_ref().map(|c| c.username.as_str()),
            )
            .finish()
    }
}

impl fmt::Display for SurrealConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}/{})", self.endpoint, self.namespace, self.database)
    }
}
