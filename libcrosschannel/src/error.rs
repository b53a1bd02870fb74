//! Error types for Cross-Channel

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CrossChannelError>;

#[derive(Error, Debug)]
pub enum CrossChannelError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CrossChannelError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CrossChannelError::InvalidInput(_) => 3,
            CrossChannelError::Platform(PlatformError::Authentication(_)) => 2,
            CrossChannelError::Platform(_) => 1,
            CrossChannelError::Session(_) => 2,
            CrossChannelError::Config(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Home directory could not be determined")]
    HomeDirUnavailable,
}

/// Failures reading or writing a persisted platform session
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No session found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("Session file {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("Session I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Posting failed: {message}")]
    Posting {
        message: String,
        raw: Option<serde_json::Value>,
    },

    #[error("Permission denied: {message}. {hint}")]
    Permission {
        message: String,
        hint: String,
        raw: Option<serde_json::Value>,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("timeout")]
    Timeout,
}

impl PlatformError {
    /// Shorthand for a posting failure with no server payload attached
    pub fn posting(message: impl Into<String>) -> Self {
        PlatformError::Posting {
            message: message.into(),
            raw: None,
        }
    }

    /// Structured payload returned by the platform, if any
    pub fn raw(&self) -> Option<&serde_json::Value> {
        match self {
            PlatformError::Posting { raw, .. } | PlatformError::Permission { raw, .. } => {
                raw.as_ref()
            }
            _ => None,
        }
    }
}

impl From<SessionError> for PlatformError {
    /// A missing or unreadable session means the platform needs
    /// (re-)authentication.
    fn from(error: SessionError) -> Self {
        PlatformError::Authentication(error.to_string())
    }
}

impl From<reqwest::Error> for PlatformError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            PlatformError::Timeout
        } else {
            PlatformError::Network(error.to_string())
        }
    }
}
