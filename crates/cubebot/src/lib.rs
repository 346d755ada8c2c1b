//! # Cubebot
//!
//! An interaction-driven community bot and the framework it is built on.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐  Interaction  ┌────────────┐  route  ┌───────────────────────┐
//! │   Gateway   │──────────────▶│ Dispatcher │────────▶│ Handler (own task)    │
//! │ (platform)  │◀──────────────│            │◀────────│ command / menu /      │
//! └─────────────┘ reply, modal  └────────────┘  result │ button / modal        │
//!                                                      └───────────────────────┘
//! ```
//!
//! - **Core**: interactions, payloads and the [`Gateway`](core::Gateway) trait
//! - **Framework**: handler registry, dispatcher, run contract and modals
//! - **Runtime**: configuration, logging and the startup sequence
//! - **Modules**: the bot's features (`anon`, `suggestions`, `rules`)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cubebot::prelude::*;
//!
//! pub static PING: ModuleDescriptor = ModuleDescriptor::new("ping", |builder| {
//!     builder.handler(command(CommandSpec::new("ping", "Ping the bot")).run(pong));
//!     Ok(())
//! });
//!
//! async fn pong(ctx: Arc<InteractionContext>) -> HandlerResult {
//!     ctx.reply("Pong!").await?;
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().load()?;
//!     CubeRuntime::builder()
//!         .config(config)
//!         .module(&PING)
//!         .gateway(StdioGateway::new())
//!         .build()?
//!         .run(StartMode::Connect)
//!         .await?;
//!     Ok(())
//! }
//! ```

pub use cubebot_core as core;
pub use cubebot_framework as framework;
pub use cubebot_modules as modules;
pub use cubebot_runtime as runtime;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use cubebot_framework::prelude::*;

    // Runtime - main entry point
    pub use cubebot_runtime::{
        ConfigLoader, CubeConfig, CubeRuntime, RuntimeBuilder, StartMode, StdioGateway,
    };

    // Feature modules
    pub use cubebot_modules::FEATURES;
}
