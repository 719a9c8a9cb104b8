use crate::driver::DriverError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Binding error: {0}")]
    Binding(String),

    #[error("Query '{0}' expected at most one row")]
    TooManyResults(String),

    #[error("Mapping error: {0}")]
    Mapping(String),

    #[error("Execution error in query '{query}' (invocation {invocation}): {source}")]
    Execution {
        query: String,
        invocation: Uuid,
        #[source]
        source: DriverError,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, RepoError>;

impl RepoError {
    /// Wraps a driver failure with the query and invocation it belongs to.
    ///
    /// The driver error is carried as the source, never reinterpreted.
    pub fn execution(query: impl Into<String>, invocation: Uuid, source: DriverError) -> Self {
        Self::Execution {
            query: query.into(),
            invocation,
            source,
        }
    }

    pub fn is_binding(&self) -> bool {
        matches!(self, Self::Binding(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
