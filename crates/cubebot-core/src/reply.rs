//! Outbound message payloads.

use serde::{Deserialize, Serialize};

use crate::component::ActionRow;

/// Accent colour applied to embeds that do not set one.
pub const DEFAULT_EMBED_COLOR: u32 = 0x0EA5_E9;

/// A field inside an [`Embed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// Rich embed attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// Fills in the default accent colour if none is set.
    pub fn with_default_color(mut self) -> Self {
        self.color.get_or_insert(DEFAULT_EMBED_COLOR);
        self
    }
}

/// An in-memory file sent alongside a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePayload {
    pub filename: String,
    pub content: String,
}

impl FilePayload {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

/// A reply or message payload.
///
/// Converts from plain strings and embeds so callers can write
/// `ctx.reply("Done").await?`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ActionRow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FilePayload>,
    /// Only visible to the invoking user. Ignored for channel messages.
    #[serde(default)]
    pub ephemeral: bool,
    /// Message this one replies to. Only used for channel messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

impl ReplyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn components(mut self, row: ActionRow) -> Self {
        self.components.push(row);
        self
    }

    pub fn file(mut self, file: FilePayload) -> Self {
        self.files.push(file);
        self
    }

    pub fn ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }

    pub fn reply_to(mut self, message_id: impl Into<String>) -> Self {
        self.reply_to = Some(message_id.into());
        self
    }

    /// Applies the default accent colour to every embed without one.
    pub fn with_default_colors(mut self) -> Self {
        self.embeds = self
            .embeds
            .into_iter()
            .map(Embed::with_default_color)
            .collect();
        self
    }
}

impl From<&str> for ReplyOptions {
    fn from(content: &str) -> Self {
        Self::new().content(content)
    }
}

impl From<String> for ReplyOptions {
    fn from(content: String) -> Self {
        Self::new().content(content)
    }
}

impl From<Embed> for ReplyOptions {
    fn from(embed: Embed) -> Self {
        Self::new().embed(embed)
    }
}
