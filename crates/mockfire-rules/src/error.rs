use std::fmt;

use mockfire_store::StoreError;

/// Errors that can occur while loading rules or evaluating an operation.
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    /// The rules document is malformed.
    #[error("invalid rules at {location}: {reason}")]
    Parse { location: String, reason: String },

    /// A rule expression failed to parse.
    #[error("syntax error in {expression:?} at offset {offset}: {reason}")]
    Syntax {
        expression: String,
        offset: usize,
        reason: String,
    },

    /// A rule expression failed at runtime. Callers treat this as a denial.
    #[error("evaluation error: {0}")]
    Eval(String),

    /// The staged write could not be applied to the data tree.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stage returned an unexpected error.
    #[error("stage error in '{stage}': {message}")]
    Stage { stage: String, message: String },
}

impl RulesError {
    /// Create a parse error for a rules location.
    pub fn parse(location: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::Parse {
            location: location.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a stage error with a name and message.
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

/// Result alias for rule operations.
pub type RulesResult<T> = Result<T, RulesError>;
