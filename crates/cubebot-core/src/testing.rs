//! Test doubles for code that talks to a [`Gateway`].
//!
//! [`RecordingGateway`] records every outbound call instead of talking to a
//! platform, and can feed interactions into a connected event stream.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{Notify, mpsc};

use crate::component::ModalSpec;
use crate::error::{ApiError, ApiResult};
use crate::gateway::Gateway;
use crate::interaction::{
    CommandData, CommandOption, ComponentData, ContextMenuData, ContextMenuTarget, Interaction,
    InteractionKind, Message, ModalField, ModalSubmitData, User,
};
use crate::reply::ReplyOptions;

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Reply {
        interaction_id: String,
        payload: ReplyOptions,
    },
    Defer {
        interaction_id: String,
        ephemeral: bool,
    },
    EditReply {
        interaction_id: String,
        payload: ReplyOptions,
    },
    FollowUp {
        interaction_id: String,
        payload: ReplyOptions,
    },
    DeleteReply {
        interaction_id: String,
    },
    ShowModal {
        interaction_id: String,
        modal: ModalSpec,
    },
    SendMessage {
        channel_id: String,
        payload: ReplyOptions,
    },
    RegisterCommands {
        commands: Vec<Value>,
        guild_id: Option<String>,
    },
}

impl GatewayCall {
    /// Returns the payload for calls that carry one.
    pub fn payload(&self) -> Option<&ReplyOptions> {
        match self {
            Self::Reply { payload, .. }
            | Self::EditReply { payload, .. }
            | Self::FollowUp { payload, .. }
            | Self::SendMessage { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// Returns the text content for calls that carry one.
    pub fn content(&self) -> Option<&str> {
        self.payload().and_then(|p| p.content.as_deref())
    }
}

/// A gateway that records calls instead of sending them.
#[derive(Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<GatewayCall>>,
    fail: AtomicBool,
    sent: AtomicUsize,
    inbound: Mutex<Option<mpsc::Sender<Interaction>>>,
    queued: Mutex<Vec<Interaction>>,
    closed: Notify,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with [`ApiError::NotConnected`].
    pub fn fail_calls(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Returns a snapshot of all recorded calls.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().clone()
    }

    /// Returns the most recent recorded call.
    pub fn last_call(&self) -> Option<GatewayCall> {
        self.calls.lock().last().cloned()
    }

    /// Clears recorded calls.
    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    /// Feeds an interaction into the connected event stream, or queues it
    /// until [`Gateway::connect`] is called.
    pub async fn inject(&self, interaction: Interaction) {
        let sender = self.inbound.lock().clone();
        match sender {
            Some(tx) => {
                let _ = tx.send(interaction).await;
            }
            None => self.queued.lock().push(interaction),
        }
    }

    /// Ends a pending [`Gateway::connect`] call.
    pub fn close(&self) {
        self.inbound.lock().take();
        self.closed.notify_one();
    }

    fn record(&self, call: GatewayCall) -> ApiResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ApiError::NotConnected);
        }
        self.calls.lock().push(call);
        Ok(())
    }
}

#[async_trait]
impl Gateway for RecordingGateway {
    async fn reply(&self, interaction: &Interaction, payload: ReplyOptions) -> ApiResult<()> {
        self.record(GatewayCall::Reply {
            interaction_id: interaction.id.clone(),
            payload,
        })
    }

    async fn defer(&self, interaction: &Interaction, ephemeral: bool) -> ApiResult<()> {
        self.record(GatewayCall::Defer {
            interaction_id: interaction.id.clone(),
            ephemeral,
        })
    }

    async fn edit_reply(
        &self,
        interaction: &Interaction,
        payload: ReplyOptions,
    ) -> ApiResult<()> {
        self.record(GatewayCall::EditReply {
            interaction_id: interaction.id.clone(),
            payload,
        })
    }

    async fn follow_up(&self, interaction: &Interaction, payload: ReplyOptions) -> ApiResult<()> {
        self.record(GatewayCall::FollowUp {
            interaction_id: interaction.id.clone(),
            payload,
        })
    }

    async fn delete_reply(&self, interaction: &Interaction) -> ApiResult<()> {
        self.record(GatewayCall::DeleteReply {
            interaction_id: interaction.id.clone(),
        })
    }

    async fn show_modal(&self, interaction: &Interaction, modal: ModalSpec) -> ApiResult<()> {
        self.record(GatewayCall::ShowModal {
            interaction_id: interaction.id.clone(),
            modal,
        })
    }

    async fn send_message(&self, channel_id: &str, payload: ReplyOptions) -> ApiResult<String> {
        self.record(GatewayCall::SendMessage {
            channel_id: channel_id.to_string(),
            payload,
        })?;
        let n = self.sent.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("message-{n}"))
    }

    async fn register_commands(
        &self,
        commands: Vec<Value>,
        guild_id: Option<&str>,
    ) -> ApiResult<usize> {
        let count = commands.len();
        self.record(GatewayCall::RegisterCommands {
            commands,
            guild_id: guild_id.map(str::to_string),
        })?;
        Ok(count)
    }

    async fn connect(&self, events: mpsc::Sender<Interaction>) -> ApiResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ApiError::NotConnected);
        }
        let queued: Vec<Interaction> = std::mem::take(&mut *self.queued.lock());
        for interaction in queued {
            if events.send(interaction).await.is_err() {
                return Ok(());
            }
        }
        *self.inbound.lock() = Some(events);
        self.closed.notified().await;
        self.inbound.lock().take();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Builds interactions for tests.
pub mod fixtures {
    use super::*;

    pub fn user(id: &str) -> User {
        User::new(id, format!("user-{id}"))
    }

    fn interaction(id: &str, user_id: &str, kind: InteractionKind) -> Interaction {
        Interaction::new(id, user(user_id), kind).in_channel("guild-1", "channel-1")
    }

    pub fn command(id: &str, name: &str, options: Vec<CommandOption>) -> Interaction {
        interaction(
            id,
            "user-1",
            InteractionKind::ChatCommand(CommandData {
                name: name.to_string(),
                options,
            }),
        )
    }

    pub fn message_menu(id: &str, name: &str, target: Message) -> Interaction {
        interaction(
            id,
            "user-1",
            InteractionKind::ContextMenu(ContextMenuData {
                name: name.to_string(),
                target: ContextMenuTarget::Message(target),
            }),
        )
    }

    pub fn button(id: &str, custom_id: &str) -> Interaction {
        interaction(
            id,
            "user-1",
            InteractionKind::Button(ComponentData {
                custom_id: custom_id.to_string(),
                values: Vec::new(),
            }),
        )
    }

    pub fn modal_submit(id: &str, custom_id: &str, fields: &[(&str, &str)]) -> Interaction {
        modal_submit_from(id, "user-1", custom_id, fields)
    }

    pub fn modal_submit_from(
        id: &str,
        user_id: &str,
        custom_id: &str,
        fields: &[(&str, &str)],
    ) -> Interaction {
        interaction(
            id,
            user_id,
            InteractionKind::ModalSubmit(ModalSubmitData {
                custom_id: custom_id.to_string(),
                fields: fields
                    .iter()
                    .map(|(k, v)| ModalField {
                        custom_id: k.to_string(),
                        value: v.to_string(),
                    })
                    .collect(),
            }),
        )
    }

    pub fn message(id: &str, channel_id: &str, content: &str) -> Message {
        Message {
            id: id.to_string(),
            channel_id: channel_id.to_string(),
            author: user("author"),
            content: content.to_string(),
        }
    }
}
