use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentorError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration file {path} is unreadable: {reason}")]
    ConfigUnreadable { path: PathBuf, reason: String },

    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Run cancelled")]
    Cancelled,
}

impl DocumentorError {
    /// Fatal errors stop the run before any later stage executes.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DocumentorError::ConfigUnreadable { .. }
                | DocumentorError::InvalidConfigValue { .. }
                | DocumentorError::Auth { .. }
                | DocumentorError::Cancelled
        )
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            DocumentorError::Http { status, .. } => Some(*status),
            DocumentorError::ApiError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

pub type Result<T> = std::result::Result<T, DocumentorError>;
