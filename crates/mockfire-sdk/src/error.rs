use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("no app has been initialized")]
    NotInitialized,

    #[error("an app named {0:?} already exists")]
    DuplicateApp(String),

    #[error("no app named {0:?}")]
    AppNotFound(String),

    #[error("invalid config {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("rules error: {0}")]
    Rules(#[from] mockfire_rules::RulesError),

    #[error("database error: {0}")]
    Database(#[from] mockfire_database::DatabaseError),

    #[error("auth error: {0}")]
    Auth(#[from] mockfire_auth::AuthError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type SdkResult<T> = Result<T, SdkError>;
