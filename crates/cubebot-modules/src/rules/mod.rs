//! Server rules management.
//!
//! Rules are grouped into lettered sections and stored in `rules.json`.
//! Admins edit them with `/rules` and publish them as one embed per section.

pub mod command;
pub mod embeds;
pub mod model;

use cubebot_framework::ModuleDescriptor;

pub use command::{RULES_COMMAND, RULES_CONFIG};
pub use model::{Rule, RuleId, RulesConfig, RulesError, RulesExport, Section};

pub static RULES: ModuleDescriptor = ModuleDescriptor::new("rules", |builder| {
    builder.include(&RULES_COMMAND)?;
    Ok(())
});
