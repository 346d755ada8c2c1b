//! Correlated modals.
//!
//! A [`ModalConstructor`] builds modals whose custom id carries a fresh
//! correlation id (`"{prefix}:{id}"`) and remembers a parameter for each one.
//! When the submission comes back, the parameter is taken out of the store
//! (one-shot) and handed to the submit callback together with the submission
//! context. This lets a handler carry state, such as the message being
//! replied to, across the modal round trip without a waiting task.
//!
//! ```rust,ignore
//! let reply_modal = Arc::new(ModalConstructor::new(
//!     "reply-anonymously",
//!     |modal, _target: &String| modal.title("Reply Anonymously").text_input(message_input()),
//!     |ctx, target| async move { post_reply(ctx, target).await },
//! ));
//! builder.handler(reply_modal.handler());
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use cubebot_core::{Embed, ModalSpec, ReplyOptions};
use parking_lot::Mutex;
use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::context::{DEFAULT_MODAL_TIMEOUT, InteractionContext};
use crate::error::{HandlerResult, ModalError};
use crate::handler::{BoxFuture, HandlerDescriptor, modal};

/// Reply for a modal custom id without a correlation id.
pub const INVALID_SUBMISSION_MESSAGE: &str = "Invalid modal submission!";

/// Reply for an unknown, consumed or expired correlation id.
pub const EXPIRED_SUBMISSION_MESSAGE: &str = "Modal invalid or timed out!";

type BuildFn<P> = Arc<dyn Fn(ModalSpec, &P) -> ModalSpec + Send + Sync>;
type SubmitFn<P> =
    Arc<dyn Fn(Arc<InteractionContext>, P) -> BoxFuture<'static, HandlerResult> + Send + Sync>;
type BackupFn = Arc<dyn Fn(&InteractionContext) -> Embed + Send + Sync>;

struct Entry<P> {
    param: P,
    expires_at: Instant,
}

/// Builds correlated modals and routes their submissions.
pub struct ModalConstructor<P> {
    prefix: String,
    build: BuildFn<P>,
    submit: SubmitFn<P>,
    backup: Option<BackupFn>,
    ttl: Duration,
    store: Mutex<HashMap<String, Entry<P>>>,
}

impl<P> ModalConstructor<P>
where
    P: Send + 'static,
{
    /// Creates a constructor for modals with the given custom-id prefix.
    ///
    /// `build` receives a modal whose custom id is already set and must not
    /// change it.
    pub fn new<B, S, Fut>(prefix: impl Into<String>, build: B, submit: S) -> Self
    where
        B: Fn(ModalSpec, &P) -> ModalSpec + Send + Sync + 'static,
        S: Fn(Arc<InteractionContext>, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            prefix: prefix.into(),
            build: Arc::new(build),
            submit: Arc::new(move |ctx, param| Box::pin(submit(ctx, param))),
            backup: None,
            ttl: DEFAULT_MODAL_TIMEOUT,
            store: Mutex::new(HashMap::new()),
        }
    }

    /// Renders a copy of the user's input when a submission cannot be matched.
    pub fn backup<F>(mut self, f: F) -> Self
    where
        F: Fn(&InteractionContext) -> Embed + Send + Sync + 'static,
    {
        self.backup = Some(Arc::new(f));
        self
    }

    /// Sets how long a constructed modal stays valid.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Number of modals awaiting submission.
    pub fn pending(&self) -> usize {
        self.store.lock().len()
    }

    /// Builds a modal for `param` and remembers the parameter.
    pub fn construct(&self, param: P) -> Result<ModalSpec, ModalError> {
        self.prune();

        let id = correlation_id();
        let custom_id = format!("{}:{}", self.prefix, id);
        let spec = (self.build)(ModalSpec::new(custom_id.clone(), ""), &param);
        if spec.custom_id != custom_id {
            return Err(ModalError::CustomIdChanged {
                expected: custom_id,
                actual: spec.custom_id,
            });
        }

        trace!(prefix = %self.prefix, id = %id, "Constructed correlated modal");
        self.store.lock().insert(
            id,
            Entry {
                param,
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(spec)
    }

    /// Routes a submission to the submit callback.
    pub async fn run(&self, ctx: Arc<InteractionContext>) -> HandlerResult {
        let Some((_, id)) = ctx.custom_id().and_then(|c| c.rsplit_once(':')) else {
            return self.fallback(&ctx, INVALID_SUBMISSION_MESSAGE).await;
        };

        let entry = self.store.lock().remove(id);
        match entry {
            Some(entry) if entry.expires_at > Instant::now() => {
                (self.submit)(ctx, entry.param).await
            }
            _ => {
                debug!(prefix = %self.prefix, id = %id, "Unmatched modal submission");
                self.fallback(&ctx, EXPIRED_SUBMISSION_MESSAGE).await
            }
        }
    }

    /// Wraps this constructor in a modal handler keyed by its prefix.
    pub fn handler(self: &Arc<Self>) -> HandlerDescriptor {
        let this = Arc::clone(self);
        modal(ModalSpec::new(self.prefix.clone(), ""))
            .ephemeral_always(true)
            .run(move |ctx| {
                let this = Arc::clone(&this);
                async move { this.run(ctx).await }
            })
    }

    async fn fallback(&self, ctx: &InteractionContext, message: &str) -> HandlerResult {
        let payload = match &self.backup {
            Some(render) => ReplyOptions::new()
                .content(format!("{message} Here is a copy of your response:"))
                .embed(render(ctx)),
            None => ReplyOptions::from(message),
        };
        ctx.reply(payload.ephemeral(true)).await?;
        Ok(())
    }

    fn prune(&self) {
        let now = Instant::now();
        self.store.lock().retain(|_, entry| entry.expires_at > now);
    }
}

impl<P> std::fmt::Debug for ModalConstructor<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModalConstructor")
            .field("prefix", &self.prefix)
            .field("ttl", &self.ttl)
            .field("pending", &self.store.lock().len())
            .finish()
    }
}

/// Millisecond timestamp followed by a random 16-bit value, both in hex.
fn correlation_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let salt: u16 = rand::thread_rng().r#gen();
    format!("{millis:x}{salt:x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Session;
    use cubebot_core::TextInputSpec;
    use cubebot_core::testing::{RecordingGateway, fixtures};
    use parking_lot::Mutex as PlMutex;

    fn constructor(received: Arc<PlMutex<Vec<String>>>) -> ModalConstructor<String> {
        ModalConstructor::new(
            "reply",
            |modal, target: &String| {
                modal
                    .title(format!("Reply to {target}"))
                    .text_input(TextInputSpec::new("message", "Message"))
            },
            move |_ctx, target| {
                let received = Arc::clone(&received);
                async move {
                    received.lock().push(target);
                    Ok(())
                }
            },
        )
    }

    fn submission_ctx(gateway: &Arc<RecordingGateway>, custom_id: &str) -> Arc<InteractionContext> {
        Arc::new(InteractionContext::new(
            fixtures::modal_submit("s", custom_id, &[("message", "hello")]),
            Session::new(gateway.clone()),
        ))
    }

    #[test]
    fn test_construct_generates_prefixed_id() {
        let ctor = constructor(Arc::default());
        let spec = ctor.construct("m-1".to_string()).unwrap();

        let (prefix, id) = spec.custom_id.rsplit_once(':').unwrap();
        assert_eq!(prefix, "reply");
        assert!(!id.is_empty());
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(spec.title, "Reply to m-1");
        assert_eq!(ctor.pending(), 1);
    }

    #[test]
    fn test_builder_changing_custom_id_is_rejected() {
        let ctor: ModalConstructor<()> = ModalConstructor::new(
            "reply",
            |_modal, _| ModalSpec::new("other", "Oops"),
            |_ctx, _| async { Ok(()) },
        );
        assert!(matches!(
            ctor.construct(()),
            Err(ModalError::CustomIdChanged { .. })
        ));
        assert_eq!(ctor.pending(), 0);
    }

    #[tokio::test]
    async fn test_submission_is_one_shot() {
        let received = Arc::new(PlMutex::new(Vec::new()));
        let ctor = constructor(received.clone());
        let gateway = Arc::new(RecordingGateway::new());
        let spec = ctor.construct("m-1".to_string()).unwrap();

        ctor.run(submission_ctx(&gateway, &spec.custom_id))
            .await
            .unwrap();
        assert_eq!(*received.lock(), vec!["m-1".to_string()]);

        ctor.run(submission_ctx(&gateway, &spec.custom_id))
            .await
            .unwrap();
        assert_eq!(received.lock().len(), 1);
        let last = gateway.last_call().unwrap();
        assert_eq!(last.content(), Some(EXPIRED_SUBMISSION_MESSAGE));
        assert!(last.payload().unwrap().ephemeral);
    }

    #[tokio::test]
    async fn test_custom_id_without_separator() {
        let ctor = constructor(Arc::default());
        let gateway = Arc::new(RecordingGateway::new());

        ctor.run(submission_ctx(&gateway, "reply")).await.unwrap();
        assert_eq!(
            gateway.last_call().unwrap().content(),
            Some(INVALID_SUBMISSION_MESSAGE)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_uses_backup() {
        let ctor = constructor(Arc::default())
            .ttl(Duration::from_secs(60))
            .backup(|ctx| Embed::new().description(ctx.field("message").unwrap_or_default()));
        let gateway = Arc::new(RecordingGateway::new());
        let spec = ctor.construct("m-1".to_string()).unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;
        ctor.run(submission_ctx(&gateway, &spec.custom_id))
            .await
            .unwrap();

        let call = gateway.last_call().unwrap();
        let payload = call.payload().unwrap();
        assert_eq!(
            payload.content.as_deref(),
            Some("Modal invalid or timed out! Here is a copy of your response:")
        );
        assert_eq!(payload.embeds[0].description.as_deref(), Some("hello"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_construct_prunes_expired_entries() {
        let ctor = constructor(Arc::default()).ttl(Duration::from_secs(10));
        ctor.construct("a".to_string()).unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;
        ctor.construct("b".to_string()).unwrap();
        assert_eq!(ctor.pending(), 1);
    }
}
