//! Error types for the state store.

use thiserror::Error;

/// Store operation result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Store errors.
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error (connection, query, etc.)
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// IO error (creating the database directory)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No record for the given path
    #[error("Not found: {0}")]
    NotFound(String),

    /// A record for the given path already exists
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// A value cannot be represented in the store
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

impl DbError {
    /// Create a not found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a duplicate key error.
    pub fn duplicate_key(path: impl Into<String>) -> Self {
        Self::DuplicateKey(path.into())
    }

    /// True for [`DbError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// True for [`DbError::DuplicateKey`].
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey(_))
    }
}
