//! Error types for the storage layer.

use thiserror::Error;

/// A result type using `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with the same key already exists.
    #[error("record already exists: {0}")]
    AlreadyExists(String),

    /// The table has not been created.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Returns true if this error might be resolved by retrying.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_database_errors_are_retriable() {
        assert!(StoreError::Database("busy".into()).is_retriable());
        assert!(!StoreError::AlreadyExists("e1".into()).is_retriable());
        assert!(!StoreError::TableNotFound("config".into()).is_retriable());
        assert!(!StoreError::Serialization("eof".into()).is_retriable());
    }
}
