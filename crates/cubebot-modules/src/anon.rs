//! Anonymous messages.
//!
//! - `/anon` posts a message to a channel without revealing the sender.
//! - "Message Anonymously" opens the `send-anonymous-message` modal.
//! - "Reply Anonymously" opens a correlated modal whose submission is posted
//!   as a reply to the targeted message.

use std::sync::{Arc, LazyLock};

use cubebot_core::permissions;
use cubebot_framework::prelude::*;
use tracing::debug;

/// Longest message the platform accepts.
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Mass pings are not allowed from anonymous messages.
pub const MAX_MENTIONS: usize = 8;

pub const ANON_MODAL_ID: &str = "send-anonymous-message";
pub const REPLY_MODAL_PREFIX: &str = "reply-anonymously";

pub static ANON: ModuleDescriptor = ModuleDescriptor::new("anon", |builder| {
    builder
        .handler(
            command(
                CommandSpec::new("anon", "Send a message anonymously")
                    .dm_permission(false)
                    .option(
                        OptionSpec::string("message", "The message to send")
                            .required(true)
                            .max_length(MAX_MESSAGE_LEN as u16),
                    )
                    .option(OptionSpec::channel(
                        "channel",
                        "The channel to send to (defaults to this one)",
                    ))
                    .option(OptionSpec::string(
                        "reply-to",
                        "The ID of the message to reply to",
                    )),
            )
            .name("Anon")
            .ephemeral_always(true)
            .run(anon_command),
        )
        .handler(
            modal(anon_modal())
                .ephemeral_always(true)
                .run(anon_modal_submit),
        )
        .handler(
            context_menu(
                ContextMenuSpec::message("Message Anonymously")
                    .dm_permission(false)
                    .default_member_permissions(permissions::SEND_MESSAGES),
            )
            .run(open_anon_modal),
        )
        .handler(
            context_menu(
                ContextMenuSpec::message("Reply Anonymously")
                    .dm_permission(false)
                    .default_member_permissions(permissions::SEND_MESSAGES),
            )
            .ephemeral_always(true)
            .run(open_reply_modal),
        )
        .handler(REPLY_MODAL.handler());
    Ok(())
});

/// Checks that a message may be posted anonymously.
pub fn validate_message(message: &str) -> Result<&str, UserError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(UserError::new("Message cannot be empty!"));
    }
    let len = message.chars().count();
    if len > MAX_MESSAGE_LEN {
        return Err(user_error!(
            "Message is too long! ({len}/{MAX_MESSAGE_LEN} characters)"
        ));
    }
    if count_mentions(message) > MAX_MENTIONS {
        return Err(user_error!(
            "Anonymous messages can mention at most {MAX_MENTIONS} users or roles"
        ));
    }
    Ok(message)
}

/// Counts `<@user>`, `<@&role>`, `@everyone` and `@here` mentions.
fn count_mentions(message: &str) -> usize {
    let tagged = message
        .match_indices("<@")
        .filter(|(i, _)| {
            let rest = &message[i + 2..];
            let id = rest.strip_prefix(['!', '&']).unwrap_or(rest);
            let digits = id.bytes().take_while(u8::is_ascii_digit).count();
            digits > 0 && id.as_bytes().get(digits) == Some(&b'>')
        })
        .count();
    tagged + message.matches("@everyone").count() + message.matches("@here").count()
}

fn anon_modal() -> ModalSpec {
    ModalSpec::new(ANON_MODAL_ID, "Send Anonymous Message").text_input(message_input())
}

fn message_input() -> TextInputSpec {
    TextInputSpec::new("message", "Message")
        .placeholder("Write your anonymous message...")
        .style(TextInputStyle::Paragraph)
        .required(true)
        .max_length(MAX_MESSAGE_LEN as u16)
}

fn current_channel(ctx: &InteractionContext) -> Result<String, UserError> {
    ctx.channel_id()
        .map(str::to_string)
        .ok_or_else(|| UserError::new("Cannot send anonymous messages in this channel"))
}

async fn anon_command(ctx: Arc<InteractionContext>) -> HandlerResult {
    let message = validate_message(ctx.required_string("message")?)?.to_string();
    let channel = match ctx.channel("channel") {
        Some(channel) => channel.to_string(),
        None => current_channel(&ctx)?,
    };

    let mut payload = ReplyOptions::from(message);
    if let Some(reply_to) = ctx.string("reply-to") {
        payload = payload.reply_to(reply_to.trim());
    }
    let id = ctx.send_message(&channel, payload).await?;
    debug!(channel = %channel, message = %id, "Posted anonymous message");
    Ok(())
}

async fn anon_modal_submit(ctx: Arc<InteractionContext>) -> HandlerResult {
    let channel = current_channel(&ctx)?;
    let message = validate_message(ctx.required_field("message")?)?.to_string();
    ctx.defer_ephemeral().await?;
    ctx.send_message(&channel, message).await?;
    Ok(())
}

async fn open_anon_modal(ctx: Arc<InteractionContext>) -> HandlerResult {
    ctx.show_modal(anon_modal()).await?;
    Ok(())
}

// ─── Reply Anonymously ────────────────────────────────────────────────────────

static REPLY_MODAL: LazyLock<Arc<ModalConstructor<String>>> = LazyLock::new(|| {
    Arc::new(
        ModalConstructor::new(
            REPLY_MODAL_PREFIX,
            |modal, _message_id: &String| {
                modal
                    .title("Reply Anonymously")
                    .text_input(message_input().placeholder("Write your anonymous reply..."))
            },
            submit_reply,
        )
        .backup(|ctx| {
            Embed::new()
                .title("Your reply")
                .description(ctx.field("message").unwrap_or_default())
        }),
    )
});

async fn open_reply_modal(ctx: Arc<InteractionContext>) -> HandlerResult {
    let Some(target) = ctx.target_message() else {
        user_err!("Cannot reply to this message");
    };
    let modal = REPLY_MODAL.construct(target.id.clone())?;
    ctx.show_modal(modal).await?;
    Ok(())
}

async fn submit_reply(ctx: Arc<InteractionContext>, message_id: String) -> HandlerResult {
    let channel = current_channel(&ctx)?;
    let message = validate_message(ctx.required_field("message")?)?.to_string();
    ctx.defer_ephemeral().await?;
    ctx.send_message(&channel, ReplyOptions::from(message).reply_to(message_id))
        .await?;
    Ok(())
}
