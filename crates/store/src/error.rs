use domain::{DirectoryError, RepositoryError};
use thiserror::Error;

/// Errors raised by the PostgreSQL adapters before they are mapped onto the
/// domain ports.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The stored group state could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row held a value the domain does not accept.
    #[error("Invalid row: {0}")]
    InvalidRow(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        RepositoryError::Storage(Box::new(err))
    }
}

impl From<StoreError> for DirectoryError {
    fn from(err: StoreError) -> Self {
        DirectoryError::Unavailable(err.to_string())
    }
}
