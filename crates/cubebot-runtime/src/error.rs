//! Runtime error types.

use cubebot_core::ApiError;
use cubebot_framework::{InitError, RegistryError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that abort startup or end the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Module registration produced an invalid registry.
    #[error("Failed to build handler registry: {0}")]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Init(#[from] InitError),

    /// `build()` was called without a gateway.
    #[error("No gateway configured")]
    MissingGateway,

    /// The gateway connection failed.
    #[error("Gateway error: {0}")]
    Gateway(#[from] ApiError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
