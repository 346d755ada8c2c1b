//! # Cubebot Core
//!
//! The platform-neutral vocabulary of the Cubebot framework.
//!
//! - **Interactions**: the inbound event model ([`Interaction`], [`InteractionKind`])
//! - **Payloads**: replies, embeds and components ([`ReplyOptions`], [`Embed`], [`ModalSpec`])
//! - **Descriptors**: command declarations projected to wire JSON ([`CommandSpec`], [`ContextMenuSpec`])
//! - **Gateway**: the collaborator that talks to the platform ([`Gateway`])
//!
//! ```text
//! ┌──────────┐  Interaction  ┌────────────┐  route  ┌──────────┐
//! │ Gateway  │──────────────▶│ Dispatcher │────────▶│ Handler  │
//! │          │◀──────────────│ (framework)│◀────────│          │
//! └──────────┘ reply / defer └────────────┘         └──────────┘
//! ```
//!
//! Enable the `testing` feature for [`testing::RecordingGateway`].

pub mod command;
pub mod component;
pub mod error;
pub mod gateway;
pub mod interaction;
pub mod reply;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use command::{
    CommandSpec, ContextMenuKind, ContextMenuSpec, OptionKind, OptionSpec, permissions,
};
pub use component::{
    ActionRow, ButtonSpec, ButtonStyle, Component, ModalSpec, TextInputSpec, TextInputStyle,
};
pub use error::{ApiError, ApiResult};
pub use gateway::{BoxedGateway, Gateway};
pub use interaction::{
    Attachment, CommandData, CommandOption, ComponentData, ContextMenuData, ContextMenuTarget,
    Interaction, InteractionKind, Member, Message, ModalField, ModalSubmitData, OptionValue, User,
};
pub use reply::{DEFAULT_EMBED_COLOR, Embed, EmbedField, FilePayload, ReplyOptions};
