//! The `/rules` admin command.

use std::sync::{Arc, LazyLock};

use cubebot_core::{FilePayload, permissions};
use cubebot_framework::capitalize;
use cubebot_framework::prelude::*;
use tracing::info;

use super::embeds::{rule_embed, rules_embeds, section_title_embed, summary_embed};
use super::model::{Rule, RulesConfig, RulesError, section_letter};

/// Largest import accepted, in bytes.
pub const MAX_IMPORT_LEN: usize = 1_000_000;

pub static RULES_CONFIG: LazyLock<Arc<ConfigBag<RulesConfig>>> =
    LazyLock::new(|| Arc::new(ConfigBag::new("rules.json")));

pub static RULES_COMMAND: ModuleDescriptor = ModuleDescriptor::new("rules::command", |builder| {
    builder
        .initializer(RULES_CONFIG.initializer())
        .handler(
            command(rules_spec())
                .name("Rules")
                .detail("Edit, publish, export and import the server rules")
                .ephemeral(rules_ephemeral)
                .run(rules_command),
        );
    Ok(())
});

impl From<RulesError> for UserError {
    fn from(err: RulesError) -> Self {
        UserError::new(err.to_string())
    }
}

fn rules_spec() -> CommandSpec {
    let rule = |description: &str| OptionSpec::string("rule", description).required(true);
    let section = |description: &str| OptionSpec::string("section", description).required(true);
    let title = OptionSpec::string("title", "The section title").required(true);

    CommandSpec::new("rules", "Manage the server rules")
        .dm_permission(false)
        .default_member_permissions(permissions::ADMINISTRATOR)
        .option(OptionSpec::subcommand("edit-summary", "Edit the rules title and summary"))
        .option(OptionSpec::subcommand("edit", "Edit a rule").option(rule("The rule, e.g. B.2")))
        .option(OptionSpec::subcommand("add", "Add a rule").option(section("The section, e.g. B")))
        .option(OptionSpec::subcommand("remove", "Remove a rule").option(rule("The rule to remove")))
        .option(
            OptionSpec::subcommand("move", "Move a rule")
                .option(rule("The rule to move"))
                .option(OptionSpec::string("to", "The new position, e.g. A.1").required(true)),
        )
        .option(
            OptionSpec::subcommand("edit-section", "Edit a section title")
                .option(section("The section to edit"))
                .option(title.clone()),
        )
        .option(OptionSpec::subcommand("add-section", "Add a section").option(title))
        .option(
            OptionSpec::subcommand("remove-section", "Remove a section")
                .option(section("The section to remove")),
        )
        .option(
            OptionSpec::subcommand("move-section", "Move a section")
                .option(section("The section to move"))
                .option(OptionSpec::string("to", "The new position, e.g. A").required(true)),
        )
        .option(OptionSpec::subcommand("test", "Show the rules in this channel"))
        .option(
            OptionSpec::subcommand("publish", "Publish the rules")
                .option(OptionSpec::channel("channel", "Defaults to the last published channel")),
        )
        .option(OptionSpec::subcommand("export", "Export the rules as JSON"))
        .option(
            OptionSpec::subcommand("import", "Import rules exported as JSON")
                .option(OptionSpec::string("data", "The exported JSON").required(true)),
        )
}

/// Only `test` and `publish` answer publicly.
fn rules_ephemeral(ctx: &InteractionContext) -> Option<bool> {
    let public = matches!(ctx.subcommand().as_deref(), Some("test" | "publish"));
    Some(!public)
}

async fn rules_command(ctx: Arc<InteractionContext>) -> HandlerResult {
    let Some(subcommand) = ctx.subcommand() else {
        user_err!("Missing subcommand");
    };
    match subcommand.as_str() {
        "edit-summary" => edit_summary(&ctx).await,
        "edit" => edit_rule(&ctx).await,
        "add" => add_rule(&ctx).await,
        "remove" => remove_rule(&ctx).await,
        "move" => move_rule(&ctx).await,
        "edit-section" => edit_section(&ctx).await,
        "add-section" => add_section(&ctx).await,
        "remove-section" => remove_section(&ctx).await,
        "move-section" => move_section(&ctx).await,
        "test" => test_rules(&ctx).await,
        "publish" => publish(&ctx).await,
        "export" => export(&ctx).await,
        "import" => import(&ctx).await,
        other => user_err!("Unknown subcommand `{other}`"),
    }
}

/// Replies following the handler's ephemeral policy.
async fn respond(ctx: &InteractionContext, payload: impl Into<ReplyOptions>) -> HandlerResult {
    let ephemeral = ctx.ephemeral_policy().unwrap_or(false);
    ctx.reply(payload.into().ephemeral(ephemeral)).await?;
    Ok(())
}

fn text_field(name: &str, style: TextInputStyle, max: u16, value: &str) -> TextInputSpec {
    let label = capitalize(name);
    let input = TextInputSpec::new(name, label.clone())
        .style(style)
        .max_length(max)
        .required(false)
        .placeholder(format!("{label}..."));
    if value.is_empty() { input } else { input.value(value) }
}

fn rule_inputs(modal: ModalSpec, rule: &Rule) -> ModalSpec {
    modal
        .text_input(text_field("title", TextInputStyle::Short, 256, &rule.title))
        .text_input(text_field("content", TextInputStyle::Paragraph, 1024, &rule.content))
}

fn submitted_rule(submission: &InteractionContext) -> Rule {
    Rule::new(
        submission.field("title").unwrap_or_default().trim(),
        submission.field("content").unwrap_or_default().trim(),
    )
}

async fn save() -> HandlerResult {
    RULES_CONFIG.save().await?;
    Ok(())
}

// ─── Modal edits ──────────────────────────────────────────────────────────────

async fn edit_summary(ctx: &InteractionContext) -> HandlerResult {
    let config = RULES_CONFIG.get()?;
    let modal = ModalSpec::new("rules-edit-summary", "Edit Summary")
        .text_input(text_field("title", TextInputStyle::Short, 256, &config.title))
        .text_input(text_field("summary", TextInputStyle::Paragraph, 2048, &config.summary));
    let Some(submission) = ctx.await_modal(modal, None).await? else {
        return Ok(());
    };

    let title = submission.field("title").unwrap_or_default().trim().to_string();
    let summary = submission.field("summary").unwrap_or_default().trim().to_string();
    let updated = RULES_CONFIG.update(|config| {
        config.title = title;
        config.summary = summary;
        config.clone()
    })?;
    save().await?;
    respond(
        &submission,
        ReplyOptions::from("Updated summary").embed(summary_embed(&updated)),
    )
    .await
}

async fn edit_rule(ctx: &InteractionContext) -> HandlerResult {
    let config = RULES_CONFIG.get()?;
    let id = config
        .rule_id(ctx.required_string("rule")?, false)
        .map_err(UserError::from)?;
    let current = config.rule(id).cloned().unwrap_or_default();
    let modal = rule_inputs(ModalSpec::new("rules-edit", format!("Edit Rule {id}")), &current);
    let Some(submission) = ctx.await_modal(modal, None).await? else {
        return Ok(());
    };

    // The rules may have changed while the modal was open.
    let rule = RULES_CONFIG
        .update(|config| config.set_rule(id, submitted_rule(&submission)))?
        .map_err(UserError::from)?;
    save().await?;
    respond(
        &submission,
        ReplyOptions::from(format!("Updated rule {id}")).embed(rule_embed(&rule)),
    )
    .await
}

async fn add_rule(ctx: &InteractionContext) -> HandlerResult {
    let section = RULES_CONFIG
        .get()?
        .section_id(ctx.required_string("section")?, false)
        .map_err(UserError::from)?;
    let modal = rule_inputs(
        ModalSpec::new("rules-add", format!("Add Rule to Section {}", section_letter(section))),
        &Rule::default(),
    );
    let Some(submission) = ctx.await_modal(modal, None).await? else {
        return Ok(());
    };

    let rule = submitted_rule(&submission);
    let id = RULES_CONFIG
        .update(|config| config.add_rule(section, rule.clone()))?
        .map_err(UserError::from)?;
    save().await?;
    respond(
        &submission,
        ReplyOptions::from(format!("Added rule {id}")).embed(rule_embed(&rule)),
    )
    .await
}

// ─── Direct edits ─────────────────────────────────────────────────────────────

async fn remove_rule(ctx: &InteractionContext) -> HandlerResult {
    let text = ctx.required_string("rule")?;
    let (id, rule) = RULES_CONFIG
        .update(|config| config.remove_rule(text))?
        .map_err(UserError::from)?;
    save().await?;
    respond(
        ctx,
        ReplyOptions::from(format!("Removed rule {id}")).embed(rule_embed(&rule)),
    )
    .await
}

async fn move_rule(ctx: &InteractionContext) -> HandlerResult {
    let from = ctx.required_string("rule")?;
    let to = ctx.required_string("to")?;
    let (from, to, rule) = RULES_CONFIG
        .update(|config| config.move_rule(from, to))?
        .map_err(UserError::from)?;
    save().await?;
    respond(
        ctx,
        ReplyOptions::from(format!("Moved rule {from} to position {to}")).embed(rule_embed(&rule)),
    )
    .await
}

async fn edit_section(ctx: &InteractionContext) -> HandlerResult {
    let text = ctx.required_string("section")?;
    let title = ctx.required_string("title")?.trim();
    let section = RULES_CONFIG
        .update(|config| config.set_section_title(text, title))?
        .map_err(UserError::from)?;
    save().await?;
    respond(
        ctx,
        ReplyOptions::from(format!("Updated section {} title", section_letter(section)))
            .embed(section_title_embed(title)),
    )
    .await
}

async fn add_section(ctx: &InteractionContext) -> HandlerResult {
    let title = ctx.required_string("title")?.trim();
    let section = RULES_CONFIG
        .update(|config| config.add_section(title))?
        .map_err(UserError::from)?;
    save().await?;
    respond(
        ctx,
        ReplyOptions::from(format!("Added section {}", section_letter(section)))
            .embed(section_title_embed(title)),
    )
    .await
}

async fn remove_section(ctx: &InteractionContext) -> HandlerResult {
    let text = ctx.required_string("section")?;
    let (section, removed) = RULES_CONFIG
        .update(|config| config.remove_section(text))?
        .map_err(UserError::from)?;
    save().await?;
    respond(
        ctx,
        ReplyOptions::from(format!("Removed section {}", section_letter(section)))
            .embed(section_title_embed(&removed.title)),
    )
    .await
}

async fn move_section(ctx: &InteractionContext) -> HandlerResult {
    let from = ctx.required_string("section")?;
    let to = ctx.required_string("to")?;
    let (from, to, section) = RULES_CONFIG
        .update(|config| config.move_section(from, to))?
        .map_err(UserError::from)?;
    save().await?;
    respond(
        ctx,
        ReplyOptions::from(format!(
            "Moved section {} to position {}",
            section_letter(from),
            section_letter(to)
        ))
        .embed(section_title_embed(&section.title)),
    )
    .await
}

// ─── Rendering ────────────────────────────────────────────────────────────────

async fn test_rules(ctx: &InteractionContext) -> HandlerResult {
    let Some(channel) = ctx.channel_id().map(str::to_string) else {
        user_err!("Oops! Couldn't find this channel. Try using the command again");
    };
    let config = RULES_CONFIG.get()?;
    ctx.defer().await?;
    for embed in rules_embeds(&config) {
        ctx.send_message(&channel, embed).await?;
    }
    Ok(())
}

/// Posts the rules as fresh messages and remembers where they went.
async fn publish(ctx: &InteractionContext) -> HandlerResult {
    let config = RULES_CONFIG.get()?;
    let channel = match ctx.channel("channel") {
        Some(channel) => channel.to_string(),
        None if !config.channel.is_empty() => config.channel.clone(),
        None => return Err(UserError::ephemeral("No channel to publish to!").into()),
    };

    ctx.defer().await?;
    let mut messages = Vec::new();
    for embed in rules_embeds(&config) {
        messages.push(ctx.send_message(&channel, embed).await?);
    }
    info!(channel = %channel, messages = messages.len(), "Published rules");

    RULES_CONFIG.update(|config| {
        config.channel = channel.clone();
        config.messages = messages;
    })?;
    save().await?;
    respond(ctx, format!("Published rules to <#{channel}>")).await
}

// ─── Export / import ──────────────────────────────────────────────────────────

async fn export(ctx: &InteractionContext) -> HandlerResult {
    let json = RULES_CONFIG.get()?.export_json();
    respond(
        ctx,
        ReplyOptions::new()
            .content("Exported rules")
            .file(FilePayload::new("rules.json", json)),
    )
    .await
}

async fn import(ctx: &InteractionContext) -> HandlerResult {
    let data = ctx.required_string("data")?;
    if data.len() > MAX_IMPORT_LEN {
        user_err!("File is too big!");
    }

    let old = RULES_CONFIG.get()?.export_json();
    RULES_CONFIG
        .update(|config| config.import_json(data))?
        .map_err(UserError::from)?;
    save().await?;
    respond(
        ctx,
        ReplyOptions::new()
            .content("Imported rules, old rules:")
            .file(FilePayload::new("old-rules.json", old)),
    )
    .await
}
