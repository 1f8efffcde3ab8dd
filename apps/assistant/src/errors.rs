use thiserror::Error;

/// Application-level error type.
/// Every user action returns `Result<T, AppError>`; the console renders
/// `user_message()` and the session stays usable afterwards.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Text shown to the user for this error. Remote and internal details
    /// are logged here and replaced by a generic message.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                msg.clone()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal error occurred".to_string()
            }
        }
    }
}
