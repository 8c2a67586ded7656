use thiserror::Error;

/// Errors a repository sync service can report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// The node could not be reached at all.
    #[error("Node unreachable: {message}")]
    Unreachable { message: String },

    /// The node answered with an error status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The addressed repository or job does not exist.
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Credentials were rejected.
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    /// The response could not be decoded.
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// Unexpected/internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ServiceError {
    #[inline]
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    #[inline]
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    #[inline]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    #[inline]
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    #[inline]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    #[inline]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Extract a short error message suitable for display.
///
/// Takes the first line of an error message, which keeps progress lines and
/// log fields readable when a server returns a multi-line body.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
