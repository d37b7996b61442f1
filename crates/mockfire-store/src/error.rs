use mockfire_types::{DbPath, TypeError};

/// Errors from data tree operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A key or priority inside a written value is invalid.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// The written value cannot be stored at the given path.
    #[error("invalid value at {path}: {reason}")]
    InvalidValue { path: DbPath, reason: String },

    /// An update names both a path and one of its descendants.
    #[error("update path {ancestor} is an ancestor of {descendant}")]
    OverlappingUpdate { ancestor: DbPath, descendant: DbPath },
}

/// Result alias for data tree operations.
pub type StoreResult<T> = Result<T, StoreError>;
