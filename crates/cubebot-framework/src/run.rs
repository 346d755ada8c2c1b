//! The run contract.
//!
//! Every routed interaction runs through [`run_handler`], which guarantees the
//! user gets exactly one outcome:
//!
//! - the callback replied itself: nothing more is sent;
//! - the callback succeeded silently: the handler's done message is sent, or
//!   the deferred placeholder is edited to it;
//! - the callback failed with a [`UserError`]: its message is shown;
//! - the callback failed any other way (including panicking): the failure is
//!   logged and a generic message is shown.
//!
//! Failures of the reply itself are logged and swallowed.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use cubebot_core::ReplyOptions;
use futures::FutureExt;
use tracing::{debug, error, warn};

use crate::context::{InteractionContext, ReplyState};
use crate::error::{BoxError, HandlerPanic, UserError};
use crate::handler::{HandlerDescriptor, SUBMITTED_MESSAGE};

/// Reply for unexpected handler failures.
pub const GENERIC_ERROR_MESSAGE: &str = "Oh no! Error encountered :(";

/// How a handler invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The callback succeeded. `auto_replied` is set when the framework sent
    /// the done message on its behalf.
    Completed { auto_replied: bool },
    /// The callback raised a [`UserError`].
    UserError,
    /// The callback failed unexpectedly or panicked.
    Failed,
}

/// Runs a handler callback under the run contract.
pub async fn run_handler(descriptor: &HandlerDescriptor, ctx: Arc<InteractionContext>) -> RunOutcome {
    let result = AssertUnwindSafe(descriptor.callback.call(Arc::clone(&ctx)))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(HandlerPanic::from_payload(payload).into()));

    // Replies go to the latest awaited submission still waiting for an answer.
    let (target, done) = match ctx.pending_follower() {
        Some(follower) => (follower, SUBMITTED_MESSAGE),
        None => (Arc::clone(&ctx), descriptor.done_message.as_str()),
    };
    let policy = target.ephemeral_policy();

    match result {
        Ok(()) => {
            let auto_replied = finalize(&target, done, policy).await;
            RunOutcome::Completed { auto_replied }
        }
        Err(err) => match err.downcast::<UserError>() {
            Ok(user_error) => {
                debug!(
                    kind = %descriptor.kind,
                    key = %descriptor.key,
                    message = %user_error.message,
                    "Handler raised a user error"
                );
                let ephemeral = user_error.ephemeral.or(policy).unwrap_or(false);
                send(&target, ReplyOptions::from(user_error.message).ephemeral(ephemeral)).await;
                RunOutcome::UserError
            }
            Err(err) => {
                log_failure(descriptor, &ctx, &err);
                let ephemeral = policy.unwrap_or(false);
                send(&target, ReplyOptions::from(GENERIC_ERROR_MESSAGE).ephemeral(ephemeral)).await;
                RunOutcome::Failed
            }
        },
    }
}

async fn finalize(target: &InteractionContext, done: &str, policy: Option<bool>) -> bool {
    let result = match target.reply_state() {
        ReplyState::Replied => return false,
        ReplyState::Deferred => target.edit_reply(done).await,
        ReplyState::Fresh => {
            target
                .reply(ReplyOptions::from(done).ephemeral(policy.unwrap_or(false)))
                .await
        }
    };
    if let Err(e) = result {
        warn!(interaction = %target.interaction().id, error = %e, "Failed to send done message");
    }
    true
}

async fn send(target: &InteractionContext, payload: ReplyOptions) {
    if let Err(e) = target.reply(payload).await {
        warn!(interaction = %target.interaction().id, error = %e, "Failed to send error reply");
    }
}

fn log_failure(descriptor: &HandlerDescriptor, ctx: &InteractionContext, err: &BoxError) {
    error!(
        kind = %descriptor.kind,
        key = %descriptor.key,
        user = %ctx.user().id,
        interaction = %ctx.interaction().id,
        error = %err,
        details = ?err,
        "Handler failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Session;
    use crate::error::HandlerResult;
    use crate::handler::{DONE_MESSAGE, button, command, modal};
    use cubebot_core::testing::{GatewayCall, RecordingGateway, fixtures};
    use cubebot_core::{ButtonSpec, CommandSpec, ModalSpec};

    fn ctx_for(
        gateway: &Arc<RecordingGateway>,
        descriptor: &HandlerDescriptor,
    ) -> Arc<InteractionContext> {
        let ctx = Arc::new(InteractionContext::new(
            fixtures::button("1", "x"),
            Session::new(gateway.clone()),
        ));
        ctx.set_ephemeral_policy(descriptor.ephemeral.resolve(&ctx));
        ctx
    }

    async fn silent(_ctx: Arc<InteractionContext>) -> HandlerResult {
        Ok(())
    }

    async fn replies(ctx: Arc<InteractionContext>) -> HandlerResult {
        ctx.reply("custom").await?;
        Ok(())
    }

    async fn defers(ctx: Arc<InteractionContext>) -> HandlerResult {
        ctx.defer().await?;
        Ok(())
    }

    async fn user_fails(_ctx: Arc<InteractionContext>) -> HandlerResult {
        Err(UserError::new("Rule B.9 does not exist").into())
    }

    async fn fails(_ctx: Arc<InteractionContext>) -> HandlerResult {
        Err(std::io::Error::other("disk on fire").into())
    }

    async fn panics(_ctx: Arc<InteractionContext>) -> HandlerResult {
        panic!("boom")
    }

    async fn run(descriptor: HandlerDescriptor) -> (RunOutcome, Vec<GatewayCall>) {
        let gateway = Arc::new(RecordingGateway::new());
        let ctx = ctx_for(&gateway, &descriptor);
        let outcome = run_handler(&descriptor, ctx).await;
        (outcome, gateway.calls())
    }

    #[tokio::test]
    async fn test_silent_success_sends_done() {
        let (outcome, calls) = run(button(ButtonSpec::new("x", "X")).run(silent)).await;

        assert_eq!(outcome, RunOutcome::Completed { auto_replied: true });
        assert_eq!(calls.len(), 1);
        assert!(matches!(calls[0], GatewayCall::Reply { .. }));
        assert_eq!(calls[0].content(), Some(DONE_MESSAGE));
        assert!(!calls[0].payload().unwrap().ephemeral);
    }

    #[tokio::test]
    async fn test_modal_done_message_is_submitted() {
        let (_, calls) = run(modal(ModalSpec::new("x", "X")).run(silent)).await;
        assert_eq!(calls[0].content(), Some(SUBMITTED_MESSAGE));
    }

    #[tokio::test]
    async fn test_done_follows_policy() {
        let (_, calls) = run(
            command(CommandSpec::new("x", "X"))
                .ephemeral_always(true)
                .run(silent),
        )
        .await;
        assert!(calls[0].payload().unwrap().ephemeral);
    }

    #[tokio::test]
    async fn test_handler_reply_suppresses_done() {
        let (outcome, calls) = run(button(ButtonSpec::new("x", "X")).run(replies)).await;

        assert_eq!(outcome, RunOutcome::Completed { auto_replied: false });
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].content(), Some("custom"));
    }

    #[tokio::test]
    async fn test_deferred_is_edited() {
        let (_, calls) = run(button(ButtonSpec::new("x", "X")).run(defers)).await;

        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[1], GatewayCall::EditReply { .. }));
        assert_eq!(calls[1].content(), Some(DONE_MESSAGE));
    }

    #[tokio::test]
    async fn test_user_error_message_and_visibility() {
        let (outcome, calls) = run(
            button(ButtonSpec::new("x", "X"))
                .ephemeral_always(true)
                .run(user_fails),
        )
        .await;

        assert_eq!(outcome, RunOutcome::UserError);
        assert_eq!(calls[0].content(), Some("Rule B.9 does not exist"));
        assert!(calls[0].payload().unwrap().ephemeral);
    }

    #[tokio::test]
    async fn test_user_error_override_beats_policy() {
        let (_, calls) = run(
            button(ButtonSpec::new("x", "X"))
                .ephemeral_always(true)
                .run(|_ctx| async { Err(UserError::new("public").with_ephemeral(false).into()) }),
        )
        .await;
        assert!(!calls[0].payload().unwrap().ephemeral);
    }

    #[tokio::test]
    async fn test_ephemeral_user_error_beats_public_policy() {
        let (outcome, calls) = run(
            button(ButtonSpec::new("x", "X"))
                .ephemeral_always(false)
                .run(|_ctx| async { Err(UserError::ephemeral("X").into()) }),
        )
        .await;

        assert_eq!(outcome, RunOutcome::UserError);
        assert_eq!(calls.len(), 1);
        assert!(matches!(calls[0], GatewayCall::Reply { .. }));
        assert_eq!(calls[0].content(), Some("X"));
        assert!(calls[0].payload().unwrap().ephemeral);
    }

    #[tokio::test]
    async fn test_unexpected_error_is_generic() {
        let (outcome, calls) = run(button(ButtonSpec::new("x", "X")).run(fails)).await;

        assert_eq!(outcome, RunOutcome::Failed);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].content(), Some(GENERIC_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let (outcome, calls) = run(button(ButtonSpec::new("x", "X")).run(panics)).await;

        assert_eq!(outcome, RunOutcome::Failed);
        assert_eq!(calls[0].content(), Some(GENERIC_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_reply_failure_is_swallowed() {
        let gateway = Arc::new(RecordingGateway::new());
        let descriptor = button(ButtonSpec::new("x", "X")).run(fails);
        let ctx = ctx_for(&gateway, &descriptor);
        gateway.fail_calls(true);

        assert_eq!(run_handler(&descriptor, ctx).await, RunOutcome::Failed);
    }

    #[tokio::test]
    async fn test_error_after_defer_edits_placeholder() {
        let (_, calls) = run(button(ButtonSpec::new("x", "X")).run(|ctx| async move {
            ctx.defer().await?;
            Err(UserError::new("nope").into())
        }))
        .await;

        assert!(matches!(calls[1], GatewayCall::EditReply { .. }));
        assert_eq!(calls[1].content(), Some("nope"));
    }
}
