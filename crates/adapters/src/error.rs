use adportal_core::Platform;
use thiserror::Error;

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Tagged outcome of a failed platform call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// Credential invalid or expired; needs re-authorization.
    #[error("{platform} authentication failed: {message}")]
    Auth { platform: Platform, message: String },

    /// The platform rejected the payload.
    #[error("{platform} rejected the request: {message}")]
    Validation { platform: Platform, message: String },

    /// Network, 5xx or rate limiting. `timed_out` means the remote outcome is unknown.
    #[error("{platform} transient failure: {message}")]
    Transient {
        platform: Platform,
        message: String,
        timed_out: bool,
    },
}

impl AdapterError {
    pub fn auth(platform: Platform, message: impl Into<String>) -> Self {
        AdapterError::Auth { platform, message: message.into() }
    }

    pub fn validation(platform: Platform, message: impl Into<String>) -> Self {
        AdapterError::Validation { platform, message: message.into() }
    }

    pub fn transient(platform: Platform, message: impl Into<String>) -> Self {
        AdapterError::Transient {
            platform,
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timeout(platform: Platform, message: impl Into<String>) -> Self {
        AdapterError::Transient {
            platform,
            message: message.into(),
            timed_out: true,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AdapterError::Transient { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AdapterError::Transient { timed_out: true, .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AdapterError::Auth { .. } => "auth",
            AdapterError::Validation { .. } => "validation",
            AdapterError::Transient { .. } => "transient",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AdapterError::Auth { message, .. }
            | AdapterError::Validation { message, .. }
            | AdapterError::Transient { message, .. } => message,
        }
    }
}
