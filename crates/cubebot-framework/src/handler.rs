//! Handler definitions.
//!
//! Every interaction handler, whatever it reacts to, is described by one
//! [`HandlerDescriptor`]: a kind, a routing key, presentation metadata, an
//! ephemeral policy, and an async callback. Descriptors are built with the
//! [`command`], [`context_menu`], [`button`] and [`modal`] builders:
//!
//! ```rust,ignore
//! use cubebot_framework::prelude::*;
//!
//! async fn anon(ctx: Arc<InteractionContext>) -> HandlerResult {
//!     let message = ctx.required_string("message")?;
//!     ctx.send_message(ctx.required_channel("channel")?, message).await?;
//!     Ok(())
//! }
//!
//! let descriptor = command(CommandSpec::new("anon", "Send an anonymous message"))
//!     .ephemeral_always(true)
//!     .run(anon);
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use cubebot_core::{ButtonSpec, CommandSpec, ContextMenuSpec, ModalSpec};
use serde_json::Value;

use crate::context::InteractionContext;
use crate::error::HandlerResult;

/// A type alias for a boxed, pinned future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Done message for commands, context menus and buttons.
pub const DONE_MESSAGE: &str = "Done";

/// Done message for modal submissions.
pub const SUBMITTED_MESSAGE: &str = "Submitted";

// ============================================================================
// Handler Trait
// ============================================================================

/// An async interaction callback.
///
/// Implemented for every `Fn(Arc<InteractionContext>) -> impl Future<Output =
/// HandlerResult>`, so plain `async fn`s and closures both work.
pub trait Handler: Send + Sync + 'static {
    /// Runs the callback.
    fn call(&self, ctx: Arc<InteractionContext>) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Arc<InteractionContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, ctx: Arc<InteractionContext>) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self)(ctx))
    }
}

/// A type-erased handler that can be stored in the registry.
pub type BoxedHandler = Arc<dyn Handler>;

/// Converts a handler into a [`BoxedHandler`].
pub fn into_handler<H: Handler>(handler: H) -> BoxedHandler {
    Arc::new(handler)
}

// ============================================================================
// Ephemeral policy
// ============================================================================

type PolicyFn = Arc<dyn Fn(&InteractionContext) -> Option<bool> + Send + Sync>;

/// Decides, per interaction, whether automatic replies are private.
///
/// Evaluated once per dispatch, before the callback runs. `None` means "no
/// preference"; the run contract then treats the reply as public.
#[derive(Clone, Default)]
pub struct EphemeralPolicy(Option<PolicyFn>);

impl EphemeralPolicy {
    /// No preference.
    pub fn unset() -> Self {
        Self(None)
    }

    /// Always the same answer.
    pub fn always(ephemeral: bool) -> Self {
        Self(Some(Arc::new(move |_| Some(ephemeral))))
    }

    /// Computed from the interaction.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&InteractionContext) -> Option<bool> + Send + Sync + 'static,
    {
        Self(Some(Arc::new(f)))
    }

    /// Evaluates the policy.
    pub fn resolve(&self, ctx: &InteractionContext) -> Option<bool> {
        self.0.as_ref().and_then(|f| f(ctx))
    }
}

impl fmt::Debug for EphemeralPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("EphemeralPolicy(fn)"),
            None => f.write_str("EphemeralPolicy(unset)"),
        }
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// The interaction family a handler reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HandlerKind {
    Command,
    ContextMenu,
    Button,
    Modal,
}

impl HandlerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::ContextMenu => "context menu",
            Self::Button => "button",
            Self::Modal => "modal",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific declaration carried by a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerMetadata {
    Command(CommandSpec),
    ContextMenu(ContextMenuSpec),
    Button(ButtonSpec),
    Modal(ModalSpec),
}

/// A fully defined interaction handler.
#[derive(Clone)]
pub struct HandlerDescriptor {
    pub kind: HandlerKind,
    /// Routing key: command name or component custom id.
    pub key: String,
    /// Human-readable name, defaulting to the capitalized key.
    pub display_name: String,
    /// Longer description shown in help listings.
    pub detail: Option<String>,
    pub ephemeral: EphemeralPolicy,
    /// Sent when the callback succeeds without replying.
    pub done_message: String,
    pub callback: BoxedHandler,
    pub metadata: HandlerMetadata,
}

impl HandlerDescriptor {
    /// Wire descriptor for deploy; `None` for buttons and modals.
    pub fn data(&self) -> Option<Value> {
        match &self.metadata {
            HandlerMetadata::Command(spec) => Some(spec.data()),
            HandlerMetadata::ContextMenu(spec) => Some(spec.data()),
            HandlerMetadata::Button(_) | HandlerMetadata::Modal(_) => None,
        }
    }

    /// Returns `true` for handlers registered with the platform at deploy.
    pub fn is_deployable(&self) -> bool {
        matches!(self.kind, HandlerKind::Command | HandlerKind::ContextMenu)
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("kind", &self.kind)
            .field("key", &self.key)
            .field("display_name", &self.display_name)
            .field("ephemeral", &self.ephemeral)
            .field("done_message", &self.done_message)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Builders
// ============================================================================

/// Builder for a [`HandlerDescriptor`].
#[must_use = "a handler builder does nothing until `run` is called"]
pub struct HandlerBuilder {
    kind: HandlerKind,
    key: String,
    metadata: HandlerMetadata,
    display_name: Option<String>,
    detail: Option<String>,
    ephemeral: EphemeralPolicy,
    done_message: Option<String>,
}

/// Starts a slash command handler keyed by the command name.
pub fn command(spec: CommandSpec) -> HandlerBuilder {
    HandlerBuilder::new(
        HandlerKind::Command,
        spec.name.clone(),
        HandlerMetadata::Command(spec),
    )
}

/// Starts a context-menu handler keyed by the menu entry name.
pub fn context_menu(spec: ContextMenuSpec) -> HandlerBuilder {
    HandlerBuilder::new(
        HandlerKind::ContextMenu,
        spec.name.clone(),
        HandlerMetadata::ContextMenu(spec),
    )
}

/// Starts a button handler keyed by the button's custom id.
pub fn button(spec: ButtonSpec) -> HandlerBuilder {
    HandlerBuilder::new(
        HandlerKind::Button,
        spec.custom_id.clone(),
        HandlerMetadata::Button(spec),
    )
}

/// Starts a modal handler keyed by the modal's custom id.
pub fn modal(spec: ModalSpec) -> HandlerBuilder {
    HandlerBuilder::new(
        HandlerKind::Modal,
        spec.custom_id.clone(),
        HandlerMetadata::Modal(spec),
    )
}

impl HandlerBuilder {
    fn new(kind: HandlerKind, key: String, metadata: HandlerMetadata) -> Self {
        Self {
            kind,
            key,
            metadata,
            display_name: None,
            detail: None,
            ephemeral: EphemeralPolicy::unset(),
            done_message: None,
        }
    }

    /// Overrides the display name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Sets a per-interaction ephemeral policy.
    pub fn ephemeral<F>(mut self, f: F) -> Self
    where
        F: Fn(&InteractionContext) -> Option<bool> + Send + Sync + 'static,
    {
        self.ephemeral = EphemeralPolicy::from_fn(f);
        self
    }

    /// Sets a fixed ephemeral policy.
    pub fn ephemeral_always(mut self, ephemeral: bool) -> Self {
        self.ephemeral = EphemeralPolicy::always(ephemeral);
        self
    }

    pub fn done_message(mut self, message: impl Into<String>) -> Self {
        self.done_message = Some(message.into());
        self
    }

    /// Finishes the descriptor with an async callback.
    pub fn run<F, Fut>(self, f: F) -> HandlerDescriptor
    where
        F: Fn(Arc<InteractionContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.run_boxed(into_handler(f))
    }

    /// Finishes the descriptor with an already boxed handler.
    pub fn run_boxed(self, callback: BoxedHandler) -> HandlerDescriptor {
        let default_done = match self.kind {
            HandlerKind::Modal => SUBMITTED_MESSAGE,
            _ => DONE_MESSAGE,
        };
        HandlerDescriptor {
            kind: self.kind,
            display_name: self.display_name.unwrap_or_else(|| capitalize(&self.key)),
            key: self.key,
            detail: self.detail,
            ephemeral: self.ephemeral,
            done_message: self
                .done_message
                .unwrap_or_else(|| default_done.to_string()),
            callback,
            metadata: self.metadata,
        }
    }
}

/// Upper-cases the first character.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
