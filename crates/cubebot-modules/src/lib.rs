//! # Cubebot Modules
//!
//! Community features built on the Cubebot framework.
//!
//! | Module | Provides |
//! |--------|----------|
//! | [`anon`] | `/anon`, "Message Anonymously", "Reply Anonymously" |
//! | [`suggestions`] | Anonymous suggestion button, modal and `/set-suggestions-channel` |
//! | [`rules`] | `/rules` for editing and publishing server rules |
//!
//! [`FEATURES`] bundles all of them for the runtime.

pub mod anon;
pub mod rules;
pub mod suggestions;

use cubebot_framework::ModuleDescriptor;

pub use anon::ANON;
pub use rules::RULES;
pub use suggestions::SUGGESTIONS;

/// Every feature module.
pub static FEATURES: ModuleDescriptor = ModuleDescriptor::new("features", |builder| {
    builder
        .include(&ANON)?
        .include(&SUGGESTIONS)?
        .include(&RULES)?;
    Ok(())
});

#[cfg(test)]
mod tests {
    use super::*;
    use cubebot_framework::{HandlerKind, HandlerRegistry};

    #[test]
    fn test_features_register_without_conflicts() {
        let (registry, initializers) = HandlerRegistry::from_modules(&[&FEATURES]).unwrap();
        assert_eq!(
            registry.modules(),
            &["features", "anon", "suggestions", "rules", "rules::command"]
        );
        assert_eq!(registry.len_of(HandlerKind::Command), 3);
        assert_eq!(registry.len_of(HandlerKind::ContextMenu), 2);
        assert_eq!(registry.len_of(HandlerKind::Button), 1);
        assert_eq!(registry.len_of(HandlerKind::Modal), 3);
        assert_eq!(initializers.names().collect::<Vec<_>>(), vec!["config:rules.json"]);
    }

    #[test]
    fn test_deploy_data_covers_commands_and_menus() {
        let (registry, _) = HandlerRegistry::from_modules(&[&FEATURES]).unwrap();
        let mut names = registry.command_names();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "Message Anonymously",
                "Reply Anonymously",
                "anon",
                "rules",
                "set-suggestions-channel",
            ]
        );
        let rules = registry
            .command_data()
            .into_iter()
            .find(|data| data["name"] == "rules")
            .unwrap();
        assert_eq!(rules["options"].as_array().unwrap().len(), 13);
    }

    #[test]
    fn test_including_twice_fails() {
        static TWICE: ModuleDescriptor = ModuleDescriptor::new("twice", |builder| {
            builder.include(&ANON)?.include(&ANON)?;
            Ok(())
        });
        assert!(HandlerRegistry::from_modules(&[&TWICE]).is_err());
    }
}
