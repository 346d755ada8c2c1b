//! Rendering rules as embeds.

use cubebot_core::Embed;

use super::model::{Rule, RuleId, RulesConfig, Section};

fn or_placeholder(text: &str, placeholder: &str) -> String {
    match text.trim() {
        "" => placeholder.to_string(),
        trimmed => trimmed.to_string(),
    }
}

pub fn summary_embed(config: &RulesConfig) -> Embed {
    Embed::new()
        .title(or_placeholder(&config.title, "title not set"))
        .description(or_placeholder(&config.summary, "summary not set"))
}

pub fn rule_embed(rule: &Rule) -> Embed {
    Embed::new()
        .title(or_placeholder(&rule.title, "title not set"))
        .description(or_placeholder(&rule.content, "content not set"))
}

pub fn section_title_embed(title: &str) -> Embed {
    Embed::new().title(or_placeholder(title, "title not set"))
}

/// A section with one field per rule, numbered by its position.
pub fn section_embed(index: usize, section: &Section) -> Embed {
    section.rules.iter().enumerate().fold(
        Embed::new().title(or_placeholder(&section.title, "no section title set")),
        |embed, (num, rule)| {
            let id = RuleId {
                section: index,
                num,
            };
            embed.field(
                format!(
                    "Rule {id}: {}",
                    or_placeholder(&rule.title, "no rule title set")
                ),
                or_placeholder(&rule.content, "no rule content set"),
                false,
            )
        },
    )
}

/// The full rules: summary first, then every section.
pub fn rules_embeds(config: &RulesConfig) -> Vec<Embed> {
    std::iter::once(summary_embed(config))
        .chain(
            config
                .rules
                .iter()
                .enumerate()
                .map(|(index, section)| section_embed(index, section)),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        let embed = rule_embed(&Rule::new("  ", ""));
        assert_eq!(embed.title.as_deref(), Some("title not set"));
        assert_eq!(embed.description.as_deref(), Some("content not set"));
    }

    #[test]
    fn test_section_fields_are_numbered() {
        let section = Section {
            title: "Voice".into(),
            rules: vec![Rule::new("Noise", "Mute when eating"), Rule::new("", "")],
        };
        let embed = section_embed(1, &section);
        assert_eq!(embed.fields[0].name, "Rule B.1: Noise");
        assert_eq!(embed.fields[1].name, "Rule B.2: no rule title set");
        assert_eq!(embed.fields[1].value, "no rule content set");
    }

    #[test]
    fn test_rules_embeds_order() {
        let config = RulesConfig {
            title: "Rules".into(),
            rules: vec![Section::default(), Section::default()],
            ..Default::default()
        };
        let embeds = rules_embeds(&config);
        assert_eq!(embeds.len(), 3);
        assert_eq!(embeds[0].title.as_deref(), Some("Rules"));
        assert_eq!(embeds[1].title.as_deref(), Some("no section title set"));
    }
}
