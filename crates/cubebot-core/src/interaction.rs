//! Inbound interaction model.
//!
//! An [`Interaction`] is one user action delivered by the platform: a slash
//! command invocation, a context-menu click, a button press, a modal
//! submission, or something the framework does not handle (autocomplete,
//! ping). Gateways deserialize platform payloads into this shape; the JSON
//! form is adjacently tagged:
//!
//! ```json
//! {
//!   "id": "1", "token": "t",
//!   "user": { "id": "42", "name": "alice" },
//!   "guild_id": "7", "channel_id": "9",
//!   "kind": { "type": "button", "data": { "custom_id": "anonymous-suggestion" } }
//! }
//! ```

use serde::{Deserialize, Serialize};

// =============================================================================
// Actors
// =============================================================================

/// A platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    /// Creates a human user.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bot: false,
        }
    }

    /// Returns the platform mention markup for this user.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// Guild membership of the invoking user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Resolved permission bits in the invoking channel.
    #[serde(default)]
    pub permissions: u64,
}

/// A channel message, as seen by message context menus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    pub author: User,
    #[serde(default)]
    pub content: String,
}

/// A file attached to a command option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

// =============================================================================
// Interaction payloads
// =============================================================================

/// Value of a single command option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    /// A user id.
    User(String),
    /// A channel id.
    Channel(String),
    /// A role id.
    Role(String),
    Attachment(Attachment),
    SubCommand(Vec<CommandOption>),
    SubCommandGroup(Vec<CommandOption>),
}

/// A named option supplied with a slash command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOption {
    pub name: String,
    pub value: OptionValue,
}

impl CommandOption {
    pub fn new(name: impl Into<String>, value: OptionValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Slash command invocation data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

impl CommandData {
    /// Returns the invoked subcommand path, e.g. `"edit"` or `"group edit"`.
    pub fn subcommand(&self) -> Option<String> {
        let mut path: Vec<&str> = Vec::new();
        let mut options = &self.options;
        loop {
            let next = options.iter().find_map(|opt| match &opt.value {
                OptionValue::SubCommand(inner) | OptionValue::SubCommandGroup(inner) => {
                    Some((opt.name.as_str(), inner))
                }
                _ => None,
            });
            match next {
                Some((name, inner)) => {
                    path.push(name);
                    options = inner;
                }
                None => break,
            }
        }
        (!path.is_empty()).then(|| path.join(" "))
    }

    /// Returns the leaf options, descending through any subcommand layers.
    pub fn leaf_options(&self) -> &[CommandOption] {
        let mut options = self.options.as_slice();
        while let Some(inner) = options.iter().find_map(|opt| match &opt.value {
            OptionValue::SubCommand(inner) | OptionValue::SubCommandGroup(inner) => Some(inner),
            _ => None,
        }) {
            options = inner;
        }
        options
    }

    /// Looks up a leaf option by name.
    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.leaf_options()
            .iter()
            .find(|opt| opt.name == name)
            .map(|opt| &opt.value)
    }
}

/// What a context menu was invoked on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ContextMenuTarget {
    User(User),
    Message(Message),
}

/// Context-menu invocation data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMenuData {
    pub name: String,
    pub target: ContextMenuTarget,
}

/// Message component (button) interaction data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentData {
    pub custom_id: String,
    #[serde(default)]
    pub values: Vec<String>,
}

/// A single submitted text input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalField {
    pub custom_id: String,
    pub value: String,
}

/// Modal submission data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalSubmitData {
    pub custom_id: String,
    #[serde(default)]
    pub fields: Vec<ModalField>,
}

impl ModalSubmitData {
    /// Returns the submitted value of a text input.
    pub fn field(&self, custom_id: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.custom_id == custom_id)
            .map(|f| f.value.as_str())
    }
}

/// The kind-specific payload of an interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum InteractionKind {
    ChatCommand(CommandData),
    ContextMenu(ContextMenuData),
    Button(ComponentData),
    ModalSubmit(ModalSubmitData),
    Autocomplete(CommandData),
    Ping,
    #[serde(other)]
    Unknown,
}

impl InteractionKind {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChatCommand(_) => "chat_command",
            Self::ContextMenu(_) => "context_menu",
            Self::Button(_) => "button",
            Self::ModalSubmit(_) => "modal_submit",
            Self::Autocomplete(_) => "autocomplete",
            Self::Ping => "ping",
            Self::Unknown => "unknown",
        }
    }
}

// =============================================================================
// Interaction
// =============================================================================

/// One inbound user interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    /// Platform identifier of this interaction.
    pub id: String,
    /// Continuation token used to answer the interaction.
    #[serde(default)]
    pub token: String,
    /// The invoking user.
    pub user: User,
    /// Membership of the invoking user, absent in direct messages.
    #[serde(default)]
    pub member: Option<Member>,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    pub kind: InteractionKind,
}

impl Interaction {
    /// Creates an interaction with no guild or channel.
    pub fn new(id: impl Into<String>, user: User, kind: InteractionKind) -> Self {
        Self {
            id: id.into(),
            token: String::new(),
            user,
            member: None,
            guild_id: None,
            channel_id: None,
            kind,
        }
    }

    /// Sets the guild and channel the interaction happened in.
    pub fn in_channel(mut self, guild_id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        self.guild_id = Some(guild_id.into());
        self.channel_id = Some(channel_id.into());
        self
    }

    /// Sets the invoking member.
    pub fn with_member(mut self, member: Member) -> Self {
        self.member = Some(member);
        self
    }

    /// Returns the custom id for button and modal interactions.
    pub fn custom_id(&self) -> Option<&str> {
        match &self.kind {
            InteractionKind::Button(data) => Some(&data.custom_id),
            InteractionKind::ModalSubmit(data) => Some(&data.custom_id),
            _ => None,
        }
    }

    /// Returns the command or context-menu name.
    pub fn command_name(&self) -> Option<&str> {
        match &self.kind {
            InteractionKind::ChatCommand(data) | InteractionKind::Autocomplete(data) => {
                Some(&data.name)
            }
            InteractionKind::ContextMenu(data) => Some(&data.name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn command(options: Vec<CommandOption>) -> CommandData {
        CommandData {
            name: "rules".into(),
            options,
        }
    }

    #[test]
    fn test_subcommand_path_and_leaf_options() {
        let data = command(vec![CommandOption::new(
            "edit",
            OptionValue::SubCommand(vec![CommandOption::new(
                "rule",
                OptionValue::String("B.2".into()),
            )]),
        )]);

        assert_eq!(data.subcommand().as_deref(), Some("edit"));
        assert_eq!(data.option("rule"), Some(&OptionValue::String("B.2".into())));
        assert!(data.option("missing").is_none());
    }

    #[test]
    fn test_no_subcommand() {
        let data = command(vec![CommandOption::new("count", OptionValue::Integer(3))]);
        assert!(data.subcommand().is_none());
        assert_eq!(data.leaf_options().len(), 1);
    }

    #[test]
    fn test_deserialize_button_interaction() {
        let raw = json!({
            "id": "1",
            "user": { "id": "42", "name": "alice" },
            "kind": { "type": "button", "data": { "custom_id": "anonymous-suggestion" } }
        });
        let interaction: Interaction = serde_json::from_value(raw).unwrap();

        assert_eq!(interaction.custom_id(), Some("anonymous-suggestion"));
        assert_eq!(interaction.kind.name(), "button");
        assert!(interaction.guild_id.is_none());
    }

    #[test]
    fn test_unknown_kind_deserializes() {
        let raw = json!({
            "id": "1",
            "user": { "id": "42", "name": "alice" },
            "kind": { "type": "select_menu" }
        });
        let interaction: Interaction = serde_json::from_value(raw).unwrap();
        assert_eq!(interaction.kind, InteractionKind::Unknown);
    }

    #[test]
    fn test_command_option_json_shape() {
        let raw = json!({ "name": "channel", "value": { "type": "channel", "value": "99" } });
        let opt: CommandOption = serde_json::from_value(raw).unwrap();
        assert_eq!(opt.value, OptionValue::Channel("99".into()));
    }
}
