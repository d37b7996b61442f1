use mockfire_types::TypeError;

/// Boxed error raised by a sign-in handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during identity operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A sign-in method was called before its handler was configured.
    #[error("no handler defined for {method}")]
    NoHandler { method: &'static str },

    /// The configured sign-in handler failed; passed through unchanged.
    #[error(transparent)]
    Handler(HandlerError),

    /// The handler returned a profile that cannot become a user.
    #[error(transparent)]
    InvalidUser(#[from] TypeError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias for identity operations.
pub type AuthResult<T> = Result<T, AuthError>;
