//! Application command descriptors.
//!
//! These are the declarative shapes registered with the platform at deploy
//! time. [`CommandSpec::data`] and [`ContextMenuSpec::data`] project them to the
//! platform's JSON wire format without side effects.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Wire type of a top-level application command.
const CHAT_INPUT: u8 = 1;
const USER_MENU: u8 = 2;
const MESSAGE_MENU: u8 = 3;

/// Permission bits for `default_member_permissions`.
pub mod permissions {
    pub const ADMINISTRATOR: u64 = 1 << 3;
    pub const SEND_MESSAGES: u64 = 1 << 11;
}

/// Declared type of a command option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    SubCommand,
    SubCommandGroup,
    String,
    Integer,
    Boolean,
    User,
    Channel,
    Role,
    Number,
    Attachment,
}

impl OptionKind {
    /// Platform wire code.
    pub fn code(self) -> u8 {
        match self {
            Self::SubCommand => 1,
            Self::SubCommandGroup => 2,
            Self::String => 3,
            Self::Integer => 4,
            Self::Boolean => 5,
            Self::User => 6,
            Self::Channel => 7,
            Self::Role => 8,
            Self::Number => 10,
            Self::Attachment => 11,
        }
    }
}

/// A declared command option or subcommand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSpec {
    pub kind: OptionKind,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionSpec>,
}

impl OptionSpec {
    pub fn new(kind: OptionKind, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            description: description.into(),
            required: false,
            min_length: None,
            max_length: None,
            options: Vec::new(),
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionKind::String, name, description)
    }

    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionKind::Integer, name, description)
    }

    pub fn channel(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionKind::Channel, name, description)
    }

    pub fn attachment(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionKind::Attachment, name, description)
    }

    pub fn subcommand(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionKind::SubCommand, name, description)
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn max_length(mut self, max: u16) -> Self {
        self.max_length = Some(max);
        self
    }

    /// Adds a nested option (for subcommands and groups).
    pub fn option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    fn data(&self) -> Value {
        let mut value = json!({
            "type": self.kind.code(),
            "name": self.name,
            "description": self.description,
        });
        if self.required {
            value["required"] = json!(true);
        }
        if let Some(min) = self.min_length {
            value["min_length"] = json!(min);
        }
        if let Some(max) = self.max_length {
            value["max_length"] = json!(max);
        }
        if !self.options.is_empty() {
            value["options"] = Value::Array(self.options.iter().map(Self::data).collect());
        }
        value
    }
}

/// A slash command declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionSpec>,
    /// Permission bits required by default, as a decimal string on the wire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_member_permissions: Option<u64>,
    #[serde(default = "default_true")]
    pub dm_permission: bool,
}

fn default_true() -> bool {
    true
}

impl CommandSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            options: Vec::new(),
            default_member_permissions: None,
            dm_permission: true,
        }
    }

    pub fn option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    pub fn default_member_permissions(mut self, bits: u64) -> Self {
        self.default_member_permissions = Some(bits);
        self
    }

    pub fn dm_permission(mut self, allowed: bool) -> Self {
        self.dm_permission = allowed;
        self
    }

    /// Wire descriptor for registration.
    pub fn data(&self) -> Value {
        let mut value = json!({
            "type": CHAT_INPUT,
            "name": self.name,
            "description": self.description,
            "dm_permission": self.dm_permission,
        });
        if !self.options.is_empty() {
            value["options"] = Value::Array(self.options.iter().map(OptionSpec::data).collect());
        }
        if let Some(bits) = self.default_member_permissions {
            value["default_member_permissions"] = json!(bits.to_string());
        }
        value
    }
}

/// What a context menu entry attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMenuKind {
    User,
    Message,
}

/// A context-menu command declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMenuSpec {
    pub name: String,
    pub kind: ContextMenuKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_member_permissions: Option<u64>,
    #[serde(default = "default_true")]
    pub dm_permission: bool,
}

impl ContextMenuSpec {
    pub fn new(name: impl Into<String>, kind: ContextMenuKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default_member_permissions: None,
            dm_permission: true,
        }
    }

    pub fn message(name: impl Into<String>) -> Self {
        Self::new(name, ContextMenuKind::Message)
    }

    pub fn user(name: impl Into<String>) -> Self {
        Self::new(name, ContextMenuKind::User)
    }

    pub fn default_member_permissions(mut self, bits: u64) -> Self {
        self.default_member_permissions = Some(bits);
        self
    }

    pub fn dm_permission(mut self, allowed: bool) -> Self {
        self.dm_permission = allowed;
        self
    }

    /// Wire descriptor for registration.
    pub fn data(&self) -> Value {
        let kind = match self.kind {
            ContextMenuKind::User => USER_MENU,
            ContextMenuKind::Message => MESSAGE_MENU,
        };
        let mut value = json!({
            "type": kind,
            "name": self.name,
            "dm_permission": self.dm_permission,
        });
        if let Some(bits) = self.default_member_permissions {
            value["default_member_permissions"] = json!(bits.to_string());
        }
        value
    }
}
