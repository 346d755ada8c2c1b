//! Per-interaction context.
//!
//! [`InteractionContext`] is created by the dispatcher for every routed
//! interaction and handed to the handler callback. It wraps the interaction,
//! the [`Session`] (gateway handle and shared waiters) and a reply state
//! machine that picks the right gateway call for each reply:
//!
//! ```text
//!            defer              edit_reply / reply
//!   Fresh ───────────▶ Deferred ──────────────────▶ Replied
//!     │                                                ▲
//!     └──────────── reply / show_modal ────────────────┘
//! ```

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use cubebot_core::{
    ApiResult, Attachment, BoxedGateway, CommandData, ContextMenuTarget, Interaction,
    InteractionKind, Member, Message, ModalSpec, OptionValue, ReplyOptions, User,
};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::UserError;
use crate::waiter::ModalWaiters;

/// Default time a handler waits for an awaited modal.
pub const DEFAULT_MODAL_TIMEOUT: Duration = Duration::from_secs(300);

/// Reply sent when an awaited modal is not submitted in time.
pub const MODAL_TIMEOUT_MESSAGE: &str = "Modal timed out!";

// =============================================================================
// Session
// =============================================================================

/// State shared by every context of one running bot.
#[derive(Clone)]
pub struct Session {
    gateway: BoxedGateway,
    waiters: Arc<ModalWaiters>,
    modal_timeout: Duration,
}

impl Session {
    pub fn new(gateway: BoxedGateway) -> Self {
        Self {
            gateway,
            waiters: Arc::new(ModalWaiters::new()),
            modal_timeout: DEFAULT_MODAL_TIMEOUT,
        }
    }

    /// Sets how long awaited modals stay open.
    pub fn with_modal_timeout(mut self, timeout: Duration) -> Self {
        self.modal_timeout = timeout;
        self
    }

    pub fn gateway(&self) -> &BoxedGateway {
        &self.gateway
    }

    pub fn waiters(&self) -> &ModalWaiters {
        &self.waiters
    }

    pub fn modal_timeout(&self) -> Duration {
        self.modal_timeout
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("gateway", &self.gateway.name())
            .field("waiters", &self.waiters)
            .field("modal_timeout", &self.modal_timeout)
            .finish()
    }
}

// =============================================================================
// Reply state
// =============================================================================

/// Where an interaction is in its response lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyState {
    /// Nothing has been sent yet.
    Fresh,
    /// A deferred acknowledgement was sent; the next reply edits it.
    Deferred,
    /// An initial response exists; further replies are follow-ups.
    Replied,
}

// =============================================================================
// InteractionContext
// =============================================================================

/// The context a handler callback runs in.
pub struct InteractionContext {
    interaction: Arc<Interaction>,
    session: Session,
    state: Mutex<ReplyState>,
    ephemeral: OnceLock<Option<bool>>,
    followers: Mutex<Vec<Arc<InteractionContext>>>,
}

impl InteractionContext {
    pub fn new(interaction: impl Into<Arc<Interaction>>, session: Session) -> Self {
        Self {
            interaction: interaction.into(),
            session,
            state: Mutex::new(ReplyState::Fresh),
            ephemeral: OnceLock::new(),
            followers: Mutex::new(Vec::new()),
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn user(&self) -> &User {
        &self.interaction.user
    }

    pub fn member(&self) -> Option<&Member> {
        self.interaction.member.as_ref()
    }

    pub fn guild_id(&self) -> Option<&str> {
        self.interaction.guild_id.as_deref()
    }

    pub fn channel_id(&self) -> Option<&str> {
        self.interaction.channel_id.as_deref()
    }

    pub fn custom_id(&self) -> Option<&str> {
        self.interaction.custom_id()
    }

    pub fn command_name(&self) -> Option<&str> {
        self.interaction.command_name()
    }

    fn command_data(&self) -> Option<&CommandData> {
        match &self.interaction.kind {
            InteractionKind::ChatCommand(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the invoked subcommand path, if any.
    pub fn subcommand(&self) -> Option<String> {
        self.command_data().and_then(CommandData::subcommand)
    }

    /// Returns a raw command option.
    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.command_data().and_then(|data| data.option(name))
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        match self.option(name) {
            Some(OptionValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.option(name) {
            Some(OptionValue::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.option(name) {
            Some(OptionValue::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    /// Returns a channel option as a channel id.
    pub fn channel(&self, name: &str) -> Option<&str> {
        match self.option(name) {
            Some(OptionValue::Channel(id)) => Some(id),
            _ => None,
        }
    }

    /// Returns a user option as a user id.
    pub fn user_option(&self, name: &str) -> Option<&str> {
        match self.option(name) {
            Some(OptionValue::User(id)) => Some(id),
            _ => None,
        }
    }

    pub fn attachment(&self, name: &str) -> Option<&Attachment> {
        match self.option(name) {
            Some(OptionValue::Attachment(a)) => Some(a),
            _ => None,
        }
    }

    pub fn required_string(&self, name: &str) -> Result<&str, UserError> {
        self.string(name)
            .ok_or_else(|| missing_option(name))
    }

    pub fn required_integer(&self, name: &str) -> Result<i64, UserError> {
        self.integer(name).ok_or_else(|| missing_option(name))
    }

    pub fn required_channel(&self, name: &str) -> Result<&str, UserError> {
        self.channel(name).ok_or_else(|| missing_option(name))
    }

    /// Returns a submitted text input of a modal submission.
    pub fn field(&self, custom_id: &str) -> Option<&str> {
        match &self.interaction.kind {
            InteractionKind::ModalSubmit(data) => data.field(custom_id),
            _ => None,
        }
    }

    pub fn required_field(&self, custom_id: &str) -> Result<&str, UserError> {
        self.field(custom_id)
            .ok_or_else(|| UserError::ephemeral(format!("Missing field `{custom_id}`")))
    }

    /// Returns the message a message context menu was invoked on.
    pub fn target_message(&self) -> Option<&Message> {
        match &self.interaction.kind {
            InteractionKind::ContextMenu(data) => match &data.target {
                ContextMenuTarget::Message(message) => Some(message),
                ContextMenuTarget::User(_) => None,
            },
            _ => None,
        }
    }

    /// Returns the user a user context menu was invoked on.
    pub fn target_user(&self) -> Option<&User> {
        match &self.interaction.kind {
            InteractionKind::ContextMenu(data) => match &data.target {
                ContextMenuTarget::User(user) => Some(user),
                ContextMenuTarget::Message(_) => None,
            },
            _ => None,
        }
    }

    // ─── Ephemeral policy ────────────────────────────────────────────────────

    /// The handler's ephemeral policy as resolved for this interaction.
    pub fn ephemeral_policy(&self) -> Option<bool> {
        self.ephemeral.get().copied().flatten()
    }

    pub(crate) fn set_ephemeral_policy(&self, policy: Option<bool>) {
        let _ = self.ephemeral.set(policy);
    }

    // ─── Reply state machine ─────────────────────────────────────────────────

    pub fn reply_state(&self) -> ReplyState {
        *self.state.lock()
    }

    pub fn is_deferred(&self) -> bool {
        self.reply_state() == ReplyState::Deferred
    }

    pub fn is_replied(&self) -> bool {
        self.reply_state() == ReplyState::Replied
    }

    fn transition(&self, to: ReplyState) {
        *self.state.lock() = to;
    }

    /// Replies using whichever call the current state allows.
    ///
    /// Fresh interactions get an initial reply, deferred ones have their
    /// placeholder edited, and replied ones receive a follow-up.
    pub async fn reply(&self, payload: impl Into<ReplyOptions>) -> ApiResult<()> {
        let payload = payload.into().with_default_colors();
        let gateway = self.session.gateway();
        match self.reply_state() {
            ReplyState::Fresh => gateway.reply(&self.interaction, payload).await?,
            ReplyState::Deferred => gateway.edit_reply(&self.interaction, payload).await?,
            ReplyState::Replied => gateway.follow_up(&self.interaction, payload).await?,
        }
        self.transition(ReplyState::Replied);
        Ok(())
    }

    /// Replies with a message only the invoking user can see.
    pub async fn reply_ephemeral(&self, payload: impl Into<ReplyOptions>) -> ApiResult<()> {
        self.reply(payload.into().ephemeral(true)).await
    }

    /// Acknowledges the interaction publicly. No-op unless fresh.
    pub async fn defer(&self) -> ApiResult<()> {
        self.defer_with(false).await
    }

    /// Acknowledges the interaction privately. No-op unless fresh.
    pub async fn defer_ephemeral(&self) -> ApiResult<()> {
        self.defer_with(true).await
    }

    async fn defer_with(&self, ephemeral: bool) -> ApiResult<()> {
        if self.reply_state() != ReplyState::Fresh {
            debug!(interaction = %self.interaction.id, "Ignoring defer on answered interaction");
            return Ok(());
        }
        self.session
            .gateway()
            .defer(&self.interaction, ephemeral)
            .await?;
        self.transition(ReplyState::Deferred);
        Ok(())
    }

    /// Replaces the initial response.
    pub async fn edit_reply(&self, payload: impl Into<ReplyOptions>) -> ApiResult<()> {
        let payload = payload.into().with_default_colors();
        self.session
            .gateway()
            .edit_reply(&self.interaction, payload)
            .await?;
        self.transition(ReplyState::Replied);
        Ok(())
    }

    /// Sends a follow-up message regardless of state.
    pub async fn follow_up(&self, payload: impl Into<ReplyOptions>) -> ApiResult<()> {
        let payload = payload.into().with_default_colors();
        self.session
            .gateway()
            .follow_up(&self.interaction, payload)
            .await
    }

    /// Deletes the initial response.
    pub async fn delete_reply(&self) -> ApiResult<()> {
        self.session.gateway().delete_reply(&self.interaction).await
    }

    /// Opens a modal as the initial response.
    pub async fn show_modal(&self, modal: ModalSpec) -> ApiResult<()> {
        self.session
            .gateway()
            .show_modal(&self.interaction, modal)
            .await?;
        self.transition(ReplyState::Replied);
        Ok(())
    }

    /// Shows a modal and waits for the same user to submit it.
    ///
    /// Returns the submission's context, or `None` after telling the user the
    /// modal timed out. The submission becomes this context's follower, so
    /// the run contract finalizes it once the handler returns.
    pub async fn await_modal(
        &self,
        modal: ModalSpec,
        timeout: Option<Duration>,
    ) -> ApiResult<Option<Arc<InteractionContext>>> {
        let timeout = timeout.unwrap_or(self.session.modal_timeout());
        let custom_id = modal.custom_id.clone();
        let user_id = self.user().id.clone();
        let waiters = self.session.waiters();

        let rx = waiters.register(custom_id.clone(), user_id.clone());
        if let Err(e) = self.show_modal(modal).await {
            waiters.cancel(&custom_id, &user_id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(submission)) => {
                let ctx = Arc::new(InteractionContext::new(submission, self.session.clone()));
                ctx.set_ephemeral_policy(self.ephemeral_policy());
                self.followers.lock().push(Arc::clone(&ctx));
                Ok(Some(ctx))
            }
            Ok(Err(_)) | Err(_) => {
                waiters.cancel(&custom_id, &user_id);
                debug!(custom_id = %custom_id, user = %user_id, "Awaited modal timed out");
                self.reply_ephemeral(MODAL_TIMEOUT_MESSAGE).await?;
                Ok(None)
            }
        }
    }

    /// Returns the latest awaited submission that has not been answered.
    pub fn pending_follower(&self) -> Option<Arc<InteractionContext>> {
        self.followers
            .lock()
            .iter()
            .rev()
            .find(|f| !f.is_replied())
            .cloned()
    }

    /// Posts a regular message to a channel.
    pub async fn send_message(
        &self,
        channel_id: &str,
        payload: impl Into<ReplyOptions>,
    ) -> ApiResult<String> {
        let payload = payload.into().with_default_colors();
        self.session
            .gateway()
            .send_message(channel_id, payload)
            .await
    }
}

impl std::fmt::Debug for InteractionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionContext")
            .field("interaction", &self.interaction.id)
            .field("kind", &self.interaction.kind.name())
            .field("state", &self.reply_state())
            .finish()
    }
}

fn missing_option(name: &str) -> UserError {
    UserError::ephemeral(format!("Missing option `{name}`"))
}
