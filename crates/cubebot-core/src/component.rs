//! Message components and modal forms.
//!
//! Buttons and modals carry a `custom_id` that comes back verbatim when the
//! user interacts with them; the dispatcher routes on it.

use serde::{Deserialize, Serialize};

// ─── Buttons ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    #[default]
    Primary,
    Secondary,
    Success,
    Danger,
    Link,
}

/// A clickable button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonSpec {
    pub custom_id: String,
    pub label: String,
    #[serde(default)]
    pub style: ButtonStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default)]
    pub disabled: bool,
}

impl ButtonSpec {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            custom_id: custom_id.into(),
            label: label.into(),
            style: ButtonStyle::default(),
            emoji: None,
            disabled: false,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = style;
        self
    }

    pub fn emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }
}

// ─── Text inputs ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextInputStyle {
    #[default]
    Short,
    Paragraph,
}

/// A text field inside a modal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextInputSpec {
    pub custom_id: String,
    pub label: String,
    #[serde(default)]
    pub style: TextInputStyle,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Pre-filled value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

fn default_required() -> bool {
    true
}

impl TextInputSpec {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            custom_id: custom_id.into(),
            label: label.into(),
            style: TextInputStyle::Short,
            required: true,
            min_length: None,
            max_length: None,
            placeholder: None,
            value: None,
        }
    }

    pub fn style(mut self, style: TextInputStyle) -> Self {
        self.style = style;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn max_length(mut self, max: u16) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

// ─── Layout ───────────────────────────────────────────────────────────────────

/// A single interactive component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Component {
    Button(ButtonSpec),
    TextInput(TextInputSpec),
}

/// A horizontal row of components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRow {
    pub components: Vec<Component>,
}

impl ActionRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn button(mut self, button: ButtonSpec) -> Self {
        self.components.push(Component::Button(button));
        self
    }
}

// ─── Modals ───────────────────────────────────────────────────────────────────

/// A modal form shown in response to an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalSpec {
    pub custom_id: String,
    pub title: String,
    #[serde(default)]
    pub rows: Vec<ActionRow>,
}

impl ModalSpec {
    pub fn new(custom_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            custom_id: custom_id.into(),
            title: title.into(),
            rows: Vec::new(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Appends a text input on its own row.
    pub fn text_input(mut self, input: TextInputSpec) -> Self {
        self.rows.push(ActionRow {
            components: vec![Component::TextInput(input)],
        });
        self
    }

    /// Returns the text inputs in display order.
    pub fn text_inputs(&self) -> impl Iterator<Item = &TextInputSpec> {
        self.rows
            .iter()
            .flat_map(|row| row.components.iter())
            .filter_map(|c| match c {
                Component::TextInput(input) => Some(input),
                _ => None,
            })
    }
}
