//! Error types for gateway operations.
//!
//! Framework-level errors (user errors, registry errors) are defined in
//! `cubebot-framework`.

use thiserror::Error;

// =============================================================================
// API Errors
// =============================================================================

/// Error type for calls made through a [`Gateway`](crate::Gateway).
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The gateway is not connected to the platform.
    #[error("gateway is not connected")]
    NotConnected,
    /// The platform did not answer in time.
    #[error("API call timed out")]
    Timeout,
    /// The platform rejected the call.
    #[error("API error ({status}): {message}")]
    Rejected { status: u16, message: String },
    /// The interaction was already acknowledged or its token expired.
    #[error("interaction '{interaction_id}' can no longer be answered")]
    InteractionExpired { interaction_id: String },
    /// Failed to serialize/deserialize a payload.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// I/O error on the underlying connection.
    #[error("I/O error: {0}")]
    Io(String),
    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl ApiError {
    /// Creates a rejection error.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for gateway calls.
pub type ApiResult<T> = Result<T, ApiError>;
