//! Cubebot Runtime - process orchestration for the Cubebot framework.
//!
//! This crate provides:
//! - Layered configuration (`cubebot.toml` + `CUBE_*` environment variables)
//! - Logging setup on `tracing-subscriber`
//! - The [`CubeRuntime`] startup sequence: registry, initializers, deploy,
//!   connect and dispatch
//! - [`StdioGateway`], a JSON-lines gateway for running a bot locally
//!
//! ```rust,ignore
//! use cubebot_runtime::{ConfigLoader, CubeRuntime, StartMode, StdioGateway, logging};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().load()?;
//!     logging::init_from_config(&config.logging);
//!
//!     CubeRuntime::builder()
//!         .config(config)
//!         .module(&FEATURES)
//!         .gateway(StdioGateway::new())
//!         .build()?
//!         .run(StartMode::Connect)
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, CubeConfig, validate_config};
pub use error::{RuntimeError, RuntimeResult};
pub use gateway::StdioGateway;
pub use runtime::{CubeRuntime, RuntimeBuilder, StartMode, wait_for_shutdown};
