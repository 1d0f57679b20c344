use crate::domain::ChatKey;

/// Core error type.
///
/// `Syntax` and `InvalidChat` are the two query failures surfaced to users;
/// `NotFound`/`Forbidden` are raised by membership providers and translated into
/// `InvalidChat` by the executor.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("invalid chat ID {key}: {reason}")]
    InvalidChat { key: ChatKey, reason: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    pub fn invalid_chat(key: ChatKey, reason: impl Into<String>) -> Self {
        Self::InvalidChat {
            key,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
