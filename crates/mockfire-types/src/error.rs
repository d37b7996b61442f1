use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("invalid priority: {0}")]
    InvalidPriority(String),

    #[error("invalid user: {0}")]
    InvalidUser(String),
}

/// Result alias for type operations.
pub type TypeResult<T> = Result<T, TypeError>;
