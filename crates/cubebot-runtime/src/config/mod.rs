//! Configuration module for the Cubebot runtime.
//!
//! Configuration is layered with figment: built-in defaults, then
//! `cubebot.toml`, then `CUBE_*` environment variables.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use schema::{
    BotConfig, CubeConfig, InteractionConfig, LogFormat, LogLevel, LogOutput, LoggingConfig,
    SpanEventConfig, StorageConfig,
};
pub use validation::validate_config;
