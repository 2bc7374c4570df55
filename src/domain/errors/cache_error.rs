//! Cache error types.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Errors raised by the image cache and its collaborators.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum CacheError {
    #[error("io error: {message}")]
    Io { message: String },

    #[error("request to {url} failed: {message}")]
    RequestFailed { url: String, message: String },

    #[error("request to {url} returned status {status}")]
    BadStatus { url: String, status: u16 },

    #[error("prewarm timed out with {pending} of {total} downloads outstanding")]
    Timeout { pending: usize, total: usize },

    #[error("download queue is closed")]
    QueueClosed,

    #[error("failed to decode catalog: {message}")]
    Decode { message: String },
}

impl CacheError {
    /// Creates an I/O error.
    #[must_use]
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a transport failure.
    #[must_use]
    pub fn request_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates an unexpected status error.
    #[must_use]
    pub fn bad_status(url: impl Into<String>, status: u16) -> Self {
        Self::BadStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Returns whether a later attempt may succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RequestFailed { .. } | Self::BadStatus { .. } | Self::Timeout { .. }
        )
    }

    /// Returns whether the error came from the network.
    #[must_use]
    pub const fn is_network_error(&self) -> bool {
        matches!(self, Self::RequestFailed { .. } | Self::BadStatus { .. })
    }

    /// Returns the HTTP status for `BadStatus` errors.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::BadStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}
