//! Anonymous suggestions box.

use std::sync::Arc;

use cubebot_core::permissions;
use cubebot_framework::prelude::*;

pub const SUGGESTION_ID: &str = "anonymous-suggestion";

pub const SUGGESTION_TITLE: &str = "New Anonymous Suggestion";
const SUGGESTION_FOOTER: &str =
    "Send your own anonymous suggestion by going to the pinned message!";
const EXPLAINER: &str = "Click on the button under this message to send a suggestion anonymously!";

pub static SUGGESTIONS: ModuleDescriptor = ModuleDescriptor::new("suggestions", |builder| {
    builder
        .handler(
            modal(suggestion_modal())
                .ephemeral_always(true)
                .run(submit_suggestion),
        )
        .handler(button(suggestion_button()).run(open_suggestion_modal))
        .handler(
            command(
                CommandSpec::new(
                    "set-suggestions-channel",
                    "Sets the suggestions channel and posts a button for anonymous suggestions",
                )
                .dm_permission(false)
                .default_member_permissions(permissions::ADMINISTRATOR)
                .option(OptionSpec::channel("channel", "The suggestions channel").required(true)),
            )
            .run(set_suggestions_channel),
        );
    Ok(())
});

fn suggestion_modal() -> ModalSpec {
    ModalSpec::new(SUGGESTION_ID, "Send Anonymous Suggestion").text_input(
        TextInputSpec::new("suggestion", "Suggestion")
            .placeholder("Suggest an event, channel, bot, emoji, etc...")
            .style(TextInputStyle::Paragraph)
            .required(true),
    )
}

fn suggestion_button() -> ButtonSpec {
    ButtonSpec::new(SUGGESTION_ID, "Suggest Anonymously").style(ButtonStyle::Primary)
}

async fn submit_suggestion(ctx: Arc<InteractionContext>) -> HandlerResult {
    let suggestion = ctx.required_field("suggestion")?.trim().to_string();
    if suggestion.is_empty() {
        user_err!("Suggestion cannot be empty!");
    }
    let Some(channel) = ctx.channel_id().map(str::to_string) else {
        user_err!("Cannot send suggestions in this channel");
    };

    ctx.defer_ephemeral().await?;
    let embed = Embed::new()
        .title(SUGGESTION_TITLE)
        .description(suggestion)
        .footer(SUGGESTION_FOOTER);
    ctx.send_message(&channel, embed).await?;
    Ok(())
}

async fn open_suggestion_modal(ctx: Arc<InteractionContext>) -> HandlerResult {
    ctx.show_modal(suggestion_modal()).await?;
    Ok(())
}

async fn set_suggestions_channel(ctx: Arc<InteractionContext>) -> HandlerResult {
    ctx.defer().await?;
    let channel = ctx.required_channel("channel")?.to_string();
    let payload = ReplyOptions::new()
        .embed(Embed::new().description(EXPLAINER))
        .components(ActionRow::new().button(suggestion_button()));
    ctx.send_message(&channel, payload).await?;
    Ok(())
}
