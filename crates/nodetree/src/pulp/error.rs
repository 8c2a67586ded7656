//! Error types for Pulp API operations.

use thiserror::Error;

use crate::service::ServiceError;

/// Errors that can occur when talking to a Pulp node.
#[derive(Debug, Error)]
pub enum PulpError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A sync call was accepted but spawned no task.
    #[error("sync of repository '{0}' spawned no task")]
    NoSpawnedTask(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<PulpError> for ServiceError {
    fn from(err: PulpError) -> Self {
        match err {
            PulpError::Http(message) => ServiceError::unreachable(message),
            PulpError::Json(e) => ServiceError::decode(format!("JSON parse error: {}", e)),
            PulpError::Api { status, message } => {
                if status == 401 || status == 403 {
                    ServiceError::auth(message)
                } else if status == 404 {
                    ServiceError::not_found(message)
                } else {
                    ServiceError::api(status, message)
                }
            }
            e @ PulpError::NoSpawnedTask(_) => ServiceError::api(202, e.to_string()),
            PulpError::Config(message) => ServiceError::internal(message),
        }
    }
}
