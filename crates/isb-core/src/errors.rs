use std::path::PathBuf;

/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the conversation
/// layer can decide between a user-facing notice and a log line.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {path}: {reason}")]
    Storage { path: PathBuf, reason: String },

    #[error("unknown identity: {0}")]
    UnknownIdentity(i64),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn storage(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Storage {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
