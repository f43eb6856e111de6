//! Error types for rapport-core

use thiserror::Error;

use crate::models::Source;

/// Result type alias using rapport-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in rapport-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Contact, conflict, or sync cursor not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed record or missing resolution payload
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Conflict was already resolved
    #[error("Conflict {0} is already resolved")]
    AlreadyResolved(i64),

    /// Source sync was disconnected for this owner
    #[error("{0} sync is disabled for this owner")]
    SourceDisabled(Source),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error came from the underlying store and may succeed on retry.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Database(_) | Self::LibSql(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_are_transient() {
        assert!(Error::Database("disk I/O error".to_string()).is_transient());
        assert!(!Error::NotFound("conflict 7".to_string()).is_transient());
        assert!(!Error::AlreadyResolved(7).is_transient());
    }

    #[test]
    fn source_disabled_names_the_source() {
        let message = Error::SourceDisabled(Source::Google).to_string();
        assert_eq!(message, "google sync is disabled for this owner");
    }
}
