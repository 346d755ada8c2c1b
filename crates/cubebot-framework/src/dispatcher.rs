//! Interaction dispatcher.
//!
//! The [`Dispatcher`] turns one inbound [`Interaction`] into at most one
//! handler invocation:
//!
//! 1. Classify the interaction into a [`HandlerKind`] and routing key;
//!    anything else (autocomplete, ping, unknown) is ignored.
//! 2. Offer modal submissions to pending await-modal waiters first.
//! 3. Look the key up in the [`HandlerRegistry`]. Modal keys are the custom
//!    id up to its last `:`, so correlated modals route to their prefix.
//! 4. On a miss, tell the user the feature is gone.
//! 5. On a hit, build an [`InteractionContext`], resolve the ephemeral policy
//!    once, and run the handler under the run contract.
//!
//! The dispatcher is cheap to clone and also implements
//! [`tower::Service<Interaction>`] so it can be wrapped in tower layers.

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use cubebot_core::{Interaction, InteractionKind, ReplyOptions};
use tracing::{Instrument, Level, debug, span, trace, warn};

use crate::context::{InteractionContext, Session};
use crate::handler::{BoxFuture, HandlerKind};
use crate::registry::HandlerRegistry;
use crate::run::{RunOutcome, run_handler};

/// Reply for interactions whose handler no longer exists.
pub const REMOVED_MESSAGE: &str =
    "Oh no! It seems that this feature has been removed. Please contact a moderator";

/// What the dispatcher did with an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not an interaction kind the framework handles.
    Ignored,
    /// A modal submission delivered to an awaiting handler.
    Collected,
    /// No handler is registered for the key.
    Removed,
    /// A handler ran.
    Handled(RunOutcome),
}

/// Routes interactions to registered handlers.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    session: Session,
}

impl Dispatcher {
    pub fn new(registry: Arc<HandlerRegistry>, session: Session) -> Self {
        Self { registry, session }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Dispatches one interaction.
    pub async fn dispatch(&self, interaction: Interaction) -> DispatchOutcome {
        let Some((kind, key)) = classify(&interaction) else {
            trace!(
                interaction = %interaction.id,
                kind = interaction.kind.name(),
                "Ignoring interaction"
            );
            return DispatchOutcome::Ignored;
        };

        let span = span!(
            Level::DEBUG,
            "dispatch",
            kind = %kind,
            key = %key,
            interaction = %interaction.id
        );

        async move {
            let interaction = if kind == HandlerKind::Modal {
                match self.session.waiters().offer(interaction) {
                    Ok(()) => return DispatchOutcome::Collected,
                    Err(unclaimed) => unclaimed,
                }
            } else {
                interaction
            };

            let ctx = Arc::new(InteractionContext::new(interaction, self.session.clone()));

            let Some(descriptor) = self.registry.get(kind, &key) else {
                debug!("No handler registered");
                let payload = ReplyOptions::from(REMOVED_MESSAGE).ephemeral(true);
                if let Err(e) = ctx.reply(payload).await {
                    warn!(error = %e, "Failed to send removed-feature reply");
                }
                return DispatchOutcome::Removed;
            };

            ctx.set_ephemeral_policy(descriptor.ephemeral.resolve(&ctx));
            let outcome = run_handler(descriptor, ctx).await;
            debug!(?outcome, "Handler finished");
            DispatchOutcome::Handled(outcome)
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handlers", &self.registry.len())
            .field("session", &self.session)
            .finish()
    }
}

/// Maps an interaction to its routing kind and key.
pub fn classify(interaction: &Interaction) -> Option<(HandlerKind, String)> {
    match &interaction.kind {
        InteractionKind::ChatCommand(data) => Some((HandlerKind::Command, data.name.clone())),
        InteractionKind::ContextMenu(data) => Some((HandlerKind::ContextMenu, data.name.clone())),
        InteractionKind::Button(data) => Some((HandlerKind::Button, data.custom_id.clone())),
        InteractionKind::ModalSubmit(data) => Some((
            HandlerKind::Modal,
            modal_route_key(&data.custom_id).to_string(),
        )),
        InteractionKind::Autocomplete(_) | InteractionKind::Ping | InteractionKind::Unknown => {
            None
        }
    }
}

/// The registry key for a modal custom id: everything before the last `:`.
pub fn modal_route_key(custom_id: &str) -> &str {
    custom_id
        .rsplit_once(':')
        .map_or(custom_id, |(prefix, _)| prefix)
}

// ─── tower integration ────────────────────────────────────────────────────────

impl tower::Service<Interaction> for Dispatcher {
    type Response = DispatchOutcome;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<DispatchOutcome, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, interaction: Interaction) -> Self::Future {
        let dispatcher = self.clone();
        Box::pin(async move { Ok(dispatcher.dispatch(interaction).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerResult;
    use crate::handler::{button, command, modal};
    use crate::registry::{ModuleDescriptor, RegistryBuilder};
    use cubebot_core::testing::{RecordingGateway, fixtures};
    use cubebot_core::{ButtonSpec, CommandSpec, ModalSpec};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_ready_ok, task};
    use tower::ServiceExt;

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    async fn count(_ctx: Arc<InteractionContext>) -> HandlerResult {
        CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn echo_field(ctx: Arc<InteractionContext>) -> HandlerResult {
        let text = ctx.required_field("message")?.to_string();
        ctx.reply(text).await?;
        Ok(())
    }

    static TEST_MODULE: ModuleDescriptor = ModuleDescriptor::new("test", |builder| {
        builder
            .handler(command(CommandSpec::new("count", "Count")).run(count))
            .handler(button(ButtonSpec::new("count", "Count")).run(count))
            .handler(modal(ModalSpec::new("echo", "Echo")).run(echo_field));
        Ok(())
    });

    fn dispatcher() -> (Arc<RecordingGateway>, Dispatcher) {
        let mut builder = RegistryBuilder::new();
        builder.include(&TEST_MODULE).unwrap();
        let (registry, _) = builder.build().unwrap();
        let gateway = Arc::new(RecordingGateway::new());
        let session = Session::new(gateway.clone());
        (gateway, Dispatcher::new(Arc::new(registry), session))
    }

    #[test]
    fn test_modal_route_key() {
        assert_eq!(modal_route_key("reply:18c3a"), "reply");
        assert_eq!(modal_route_key("a:b:c"), "a:b");
        assert_eq!(modal_route_key("send-anonymous-message"), "send-anonymous-message");
    }

    #[tokio::test]
    async fn test_routes_by_kind() {
        let (gateway, dispatcher) = dispatcher();
        let before = CALLS.load(Ordering::SeqCst);

        let outcome = dispatcher
            .dispatch(fixtures::command("1", "count", vec![]))
            .await;
        assert_eq!(
            outcome,
            DispatchOutcome::Handled(RunOutcome::Completed { auto_replied: true })
        );
        dispatcher.dispatch(fixtures::button("2", "count")).await;

        assert!(CALLS.load(Ordering::SeqCst) >= before + 2);
        assert_eq!(gateway.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_key_replies_removed() {
        let (gateway, dispatcher) = dispatcher();

        let outcome = dispatcher.dispatch(fixtures::button("1", "gone")).await;
        assert_eq!(outcome, DispatchOutcome::Removed);

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].content(), Some(REMOVED_MESSAGE));
        assert!(calls[0].payload().unwrap().ephemeral);
    }

    #[tokio::test]
    async fn test_ignores_autocomplete() {
        let (gateway, dispatcher) = dispatcher();
        let mut interaction = fixtures::command("1", "count", vec![]);
        interaction.kind = InteractionKind::Autocomplete(cubebot_core::CommandData {
            name: "count".into(),
            options: vec![],
        });

        assert_eq!(dispatcher.dispatch(interaction).await, DispatchOutcome::Ignored);
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_modal_with_correlation_suffix_routes_to_prefix() {
        let (gateway, dispatcher) = dispatcher();

        dispatcher
            .dispatch(fixtures::modal_submit("1", "echo:abc123", &[("message", "hi")]))
            .await;
        assert_eq!(gateway.last_call().unwrap().content(), Some("hi"));
    }

    #[tokio::test]
    async fn test_waiter_claims_modal_before_routing() {
        let (gateway, dispatcher) = dispatcher();
        let rx = dispatcher.session().waiters().register("echo", "user-1");

        let outcome = dispatcher
            .dispatch(fixtures::modal_submit("1", "echo", &[("message", "hi")]))
            .await;

        assert_eq!(outcome, DispatchOutcome::Collected);
        assert!(gateway.calls().is_empty());
        assert_eq!(rx.await.unwrap().id, "1");
    }

    #[tokio::test]
    async fn test_service_is_always_ready() {
        let (_, dispatcher) = dispatcher();
        let mut svc = dispatcher.clone();
        let mut ready = task::spawn(());
        assert_ready_ok!(ready.enter(|cx, _| tower::Service::poll_ready(&mut svc, cx)));

        let outcome = dispatcher
            .oneshot(fixtures::button("1", "missing"))
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Removed);
    }
}
