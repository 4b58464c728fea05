//! Error types for the persistence layer.

use thiserror::Error;

/// Errors that can occur in the persistence layer.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// A data store operation failed, usually because the store is
    /// unavailable.
    #[error("A data store operation failed: {0}")]
    OperationFailed(String),

    /// A stored value could not be converted to or from its model.
    #[error("Failed to serialize or deserialize data: {0}")]
    SerializationError(String),

    /// An error occurred during a database migration.
    #[error("A data migration failed: {0}")]
    MigrationError(String),

    /// Required input was missing or out of range. Nothing was written.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
