//! # Cubebot Framework
//!
//! Interaction dispatch for chat-platform bots.
//!
//! - **Handlers**: [`command`], [`context_menu`], [`button`] and [`modal`]
//!   builders produce [`HandlerDescriptor`]s with an async callback and an
//!   [`EphemeralPolicy`].
//! - **Registry**: feature modules ([`ModuleDescriptor`]) register handlers
//!   and [`Initializer`]s into one [`HandlerRegistry`].
//! - **Dispatcher**: routes each [`Interaction`](cubebot_core::Interaction) to
//!   its handler and runs it under the run contract ([`run_handler`]).
//! - **Modals**: await a modal inline ([`InteractionContext::await_modal`]) or
//!   correlate submissions with stored state ([`ModalConstructor`]).
//! - **Config**: JSON-file backed module configuration ([`ConfigBag`]).
//!
//! ```rust,ignore
//! use cubebot_framework::prelude::*;
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
//! ```

pub mod config_bag;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod initializer;
pub mod modal;
pub mod registry;
pub mod run;
pub mod waiter;

pub use config_bag::{ConfigBag, RESERVED_KEYS};
pub use context::{
    DEFAULT_MODAL_TIMEOUT, InteractionContext, MODAL_TIMEOUT_MESSAGE, ReplyState, Session,
};
pub use dispatcher::{DispatchOutcome, Dispatcher, REMOVED_MESSAGE, classify, modal_route_key};
pub use error::{
    BoxError, ConfigBagError, HandlerPanic, HandlerResult, InitError, ModalError, RegistryError,
    RegistryResult, UserError,
};
pub use handler::{
    BoxFuture, BoxedHandler, DONE_MESSAGE, EphemeralPolicy, Handler, HandlerBuilder,
    HandlerDescriptor, HandlerKind, HandlerMetadata, SUBMITTED_MESSAGE, button, capitalize,
    command, context_menu, into_handler, modal,
};
pub use initializer::{InitContext, Initializer, InitializerChain};
pub use modal::{EXPIRED_SUBMISSION_MESSAGE, INVALID_SUBMISSION_MESSAGE, ModalConstructor};
pub use registry::{HandlerRegistry, ModuleDescriptor, RegistryBuilder, RouteKey};
pub use run::{GENERIC_ERROR_MESSAGE, RunOutcome, run_handler};
pub use waiter::ModalWaiters;

/// Commonly used types for writing feature modules.
pub mod prelude {
    pub use std::sync::Arc;

    pub use cubebot_core::{
        ActionRow, ButtonSpec, ButtonStyle, CommandSpec, ContextMenuSpec, Embed, ModalSpec,
        OptionSpec, ReplyOptions, TextInputSpec, TextInputStyle,
    };

    pub use crate::{
        BoxError, ConfigBag, HandlerResult, InteractionContext, ModalConstructor,
        ModuleDescriptor, RegistryBuilder, RegistryResult, UserError, button, command,
        context_menu, modal, user_err, user_error,
    };
}
