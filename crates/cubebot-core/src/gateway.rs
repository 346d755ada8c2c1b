//! The platform gateway abstraction.
//!
//! A [`Gateway`] is the only thing the framework knows about the chat
//! platform. It answers interactions, posts channel messages, registers
//! command descriptors, and streams inbound interactions into a channel.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::component::ModalSpec;
use crate::error::ApiResult;
use crate::interaction::Interaction;
use crate::reply::ReplyOptions;

/// Connection to a chat platform.
///
/// Response methods take the interaction being answered; implementations use
/// its id and token to address the platform. Ordering rules (a deferred
/// interaction must be edited, a replied one followed up) are enforced by the
/// framework's reply state machine, not here.
#[async_trait]
pub trait Gateway: Send + Sync + 'static {
    /// Sends the initial response to an interaction.
    async fn reply(&self, interaction: &Interaction, payload: ReplyOptions) -> ApiResult<()>;

    /// Acknowledges an interaction with a "thinking" indicator.
    async fn defer(&self, interaction: &Interaction, ephemeral: bool) -> ApiResult<()>;

    /// Replaces the initial (possibly deferred) response.
    async fn edit_reply(&self, interaction: &Interaction, payload: ReplyOptions)
    -> ApiResult<()>;

    /// Sends an additional message after the initial response.
    async fn follow_up(&self, interaction: &Interaction, payload: ReplyOptions) -> ApiResult<()>;

    /// Deletes the initial response.
    async fn delete_reply(&self, interaction: &Interaction) -> ApiResult<()>;

    /// Opens a modal form as the initial response.
    async fn show_modal(&self, interaction: &Interaction, modal: ModalSpec) -> ApiResult<()>;

    /// Posts a regular message to a channel, returning the new message id.
    async fn send_message(&self, channel_id: &str, payload: ReplyOptions) -> ApiResult<String>;

    /// Replaces the registered command set, returning how many were accepted.
    ///
    /// When `guild_id` is set the commands are registered for that guild only.
    async fn register_commands(
        &self,
        commands: Vec<Value>,
        guild_id: Option<&str>,
    ) -> ApiResult<usize>;

    /// Streams inbound interactions into `events` until the connection ends.
    async fn connect(&self, events: mpsc::Sender<Interaction>) -> ApiResult<()>;

    /// Gateway name used in logs.
    fn name(&self) -> &'static str {
        "gateway"
    }
}

/// A shared, type-erased gateway.
pub type BoxedGateway = Arc<dyn Gateway>;
