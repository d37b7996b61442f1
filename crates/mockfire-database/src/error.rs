use mockfire_rules::{Evaluation, OperationKind, RulesError};
use mockfire_types::{DbPath, TypeError};

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// The rules refused the operation. Nothing was applied.
    #[error("{operation} denied at {path} (permitted: {permitted}, validated: {validated})")]
    Denied {
        operation: OperationKind,
        path: DbPath,
        permitted: bool,
        validated: bool,
        reason: Option<String>,
    },

    /// `child_added` was requested on a leaf value.
    #[error("value at {path} is not a collection")]
    NotACollection { path: DbPath },

    /// `child_added` was requested where nothing is stored.
    #[error("no children at {path}")]
    NoChildren { path: DbPath },

    #[error(transparent)]
    InvalidPath(#[from] TypeError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Rules(#[from] RulesError),
}

impl DatabaseError {
    /// The denial error for a refused evaluation.
    pub fn denied(evaluation: &Evaluation) -> Self {
        Self::Denied {
            operation: evaluation.operation,
            path: evaluation.path.clone(),
            permitted: evaluation.permitted,
            validated: evaluation.validated,
            reason: evaluation.denial_reason(),
        }
    }

    /// Returns `true` for a rules denial.
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied { .. })
    }
}

/// Result alias for database operations.
pub type DatabaseResult<T> = Result<T, DatabaseError>;
