//! Rules data model and the edits the `/rules` command performs on it.
//!
//! Sections are addressed by letter (`A`..`Z`) and rules by
//! `<section>.<number>` with a 1-based number, e.g. `B.2`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sections are lettered, so there can be at most 26.
pub const MAX_SECTIONS: usize = 26;

/// Persisted state of the rules module (`rules.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Channel the rules were last published to.
    #[serde(default)]
    pub channel: String,
    /// Ids of the published messages: the summary, then one per section.
    #[serde(default)]
    pub messages: Vec<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub rules: Vec<Section>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Section {
    pub title: String,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    pub title: String,
    pub content: String,
}

impl Rule {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// The shareable part of [`RulesConfig`], used by export and import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesExport {
    pub title: String,
    pub summary: String,
    pub rules: Vec<Section>,
}

/// Failures of rule edits, phrased for the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RulesError {
    #[error("Invalid rule format \"{0}\"")]
    InvalidRule(String),
    #[error("Rule \"{0}\" is out of range")]
    RuleOutOfRange(String),
    #[error("Invalid section \"{0}\"")]
    InvalidSection(String),
    #[error("Section \"{0}\" is out of range")]
    SectionOutOfRange(String),
    #[error("Cannot have more than {MAX_SECTIONS} sections")]
    TooManySections,
    #[error("Incorrect format!")]
    InvalidImport,
}

// ─── Ids ──────────────────────────────────────────────────────────────────────

/// Zero-based position of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleId {
    pub section: usize,
    pub num: usize,
}

impl RuleId {
    /// Parses `B.2` style ids. Does not check the id exists.
    pub fn parse(text: &str) -> Option<Self> {
        let (section, num) = text.trim().split_once('.')?;
        if num.contains('.') {
            return None;
        }
        let section = parse_section(section)?;
        let num: usize = num.trim().parse().ok()?;
        Some(Self {
            section,
            num: num.checked_sub(1)?,
        })
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", section_letter(self.section), self.num + 1)
    }
}

/// Parses a single section letter, case-insensitively.
pub fn parse_section(text: &str) -> Option<usize> {
    let mut chars = text.trim().chars();
    let letter = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some() || !letter.is_ascii_uppercase() {
        return None;
    }
    Some((letter as u8 - b'A') as usize)
}

pub fn section_letter(section: usize) -> char {
    debug_assert!(section < MAX_SECTIONS);
    (b'A' + section as u8) as char
}

// ─── Edits ────────────────────────────────────────────────────────────────────

impl RulesConfig {
    /// Resolves a section letter. With `insert`, one past the end is allowed.
    pub fn section_id(&self, text: &str, insert: bool) -> Result<usize, RulesError> {
        let section =
            parse_section(text).ok_or_else(|| RulesError::InvalidSection(text.to_string()))?;
        if section < self.rules.len() + usize::from(insert) {
            Ok(section)
        } else {
            Err(RulesError::SectionOutOfRange(text.to_string()))
        }
    }

    /// Resolves a rule id. With `insert`, one past the end of the section is allowed.
    pub fn rule_id(&self, text: &str, insert: bool) -> Result<RuleId, RulesError> {
        let id = RuleId::parse(text).ok_or_else(|| RulesError::InvalidRule(text.to_string()))?;
        match self.rules.get(id.section) {
            Some(section) if id.num < section.rules.len() + usize::from(insert) => Ok(id),
            _ => Err(RulesError::RuleOutOfRange(text.to_string())),
        }
    }

    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id.section)?.rules.get(id.num)
    }

    /// Replaces a rule, returning the new value.
    pub fn set_rule(&mut self, id: RuleId, rule: Rule) -> Result<Rule, RulesError> {
        let slot = self
            .rules
            .get_mut(id.section)
            .and_then(|s| s.rules.get_mut(id.num))
            .ok_or_else(|| RulesError::RuleOutOfRange(id.to_string()))?;
        *slot = rule.clone();
        Ok(rule)
    }

    /// Appends a rule to a section, returning its id.
    pub fn add_rule(&mut self, section: usize, rule: Rule) -> Result<RuleId, RulesError> {
        let rules = &mut self
            .rules
            .get_mut(section)
            .ok_or_else(|| RulesError::SectionOutOfRange(section_letter(section).to_string()))?
            .rules;
        rules.push(rule);
        Ok(RuleId {
            section,
            num: rules.len() - 1,
        })
    }

    pub fn remove_rule(&mut self, text: &str) -> Result<(RuleId, Rule), RulesError> {
        let id = self.rule_id(text, false)?;
        let rule = self.rules[id.section].rules.remove(id.num);
        Ok((id, rule))
    }

    /// Moves a rule. `to` is resolved after the rule is taken out.
    ///
    /// On failure the rules are left unchanged.
    pub fn move_rule(
        &mut self,
        from: &str,
        to: &str,
    ) -> Result<(RuleId, RuleId, Rule), RulesError> {
        let (from_id, rule) = self.remove_rule(from)?;
        match self.rule_id(to, true) {
            Ok(to_id) => {
                self.rules[to_id.section]
                    .rules
                    .insert(to_id.num, rule.clone());
                Ok((from_id, to_id, rule))
            }
            Err(e) => {
                self.rules[from_id.section].rules.insert(from_id.num, rule);
                Err(e)
            }
        }
    }

    pub fn set_section_title(&mut self, text: &str, title: &str) -> Result<usize, RulesError> {
        let section = self.section_id(text, false)?;
        self.rules[section].title = title.to_string();
        Ok(section)
    }

    pub fn add_section(&mut self, title: &str) -> Result<usize, RulesError> {
        if self.rules.len() >= MAX_SECTIONS {
            return Err(RulesError::TooManySections);
        }
        self.rules.push(Section {
            title: title.to_string(),
            rules: Vec::new(),
        });
        Ok(self.rules.len() - 1)
    }

    pub fn remove_section(&mut self, text: &str) -> Result<(usize, Section), RulesError> {
        let section = self.section_id(text, false)?;
        Ok((section, self.rules.remove(section)))
    }

    /// Moves a section. `to` is resolved after the section is taken out.
    pub fn move_section(
        &mut self,
        from: &str,
        to: &str,
    ) -> Result<(usize, usize, Section), RulesError> {
        let (from_id, section) = self.remove_section(from)?;
        match self.section_id(to, true) {
            Ok(to_id) => {
                self.rules.insert(to_id, section.clone());
                Ok((from_id, to_id, section))
            }
            Err(e) => {
                self.rules.insert(from_id, section);
                Err(e)
            }
        }
    }

    // ─── Export / import ───

    pub fn export(&self) -> RulesExport {
        RulesExport {
            title: self.title.clone(),
            summary: self.summary.clone(),
            rules: self.rules.clone(),
        }
    }

    /// Serializes the export as 4-space indented JSON.
    pub fn export_json(&self) -> String {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        match self.export().serialize(&mut serializer) {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            // Plain strings and vectors cannot fail to serialize.
            Err(_) => String::new(),
        }
    }

    /// Replaces title, summary and rules with an export's contents.
    ///
    /// The publish target is kept.
    pub fn import_json(&mut self, data: &str) -> Result<(), RulesError> {
        let import: RulesExport =
            serde_json::from_str(data).map_err(|_| RulesError::InvalidImport)?;
        if import.rules.len() > MAX_SECTIONS {
            return Err(RulesError::InvalidImport);
        }
        self.title = import.title;
        self.summary = import.summary;
        self.rules = import.rules;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RulesConfig {
        RulesConfig {
            title: "Server Rules".into(),
            summary: "Be nice".into(),
            rules: vec![
                Section {
                    title: "General".into(),
                    rules: vec![Rule::new("Respect", "Be kind"), Rule::new("Spam", "Don't")],
                },
                Section {
                    title: "Voice".into(),
                    rules: vec![Rule::new("Noise", "Mute when eating")],
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_rule_id_parsing() {
        assert_eq!(RuleId::parse("B.2"), Some(RuleId { section: 1, num: 1 }));
        assert_eq!(RuleId::parse(" a . 1 "), Some(RuleId { section: 0, num: 0 }));
        assert_eq!(RuleId::parse("B.0"), None);
        assert_eq!(RuleId::parse("B"), None);
        assert_eq!(RuleId::parse("B.2.3"), None);
        assert_eq!(RuleId::parse("AB.1"), None);
        assert_eq!(RuleId::parse("1.1"), None);
        assert_eq!(RuleId { section: 2, num: 4 }.to_string(), "C.5");
    }

    #[test]
    fn test_range_checks() {
        let config = sample();
        assert!(config.rule_id("A.2", false).is_ok());
        assert_eq!(
            config.rule_id("A.3", false),
            Err(RulesError::RuleOutOfRange("A.3".into()))
        );
        assert!(config.rule_id("A.3", true).is_ok());
        assert!(config.rule_id("C.1", true).is_err());
        assert_eq!(
            config.section_id("?", false),
            Err(RulesError::InvalidSection("?".into()))
        );
        assert!(config.section_id("C", false).is_err());
        assert_eq!(config.section_id("c", true), Ok(2));
    }

    #[test]
    fn test_move_rule_across_sections() {
        let mut config = sample();
        let (from, to, rule) = config.move_rule("A.1", "B.2").unwrap();
        assert_eq!((from.to_string(), to.to_string()), ("A.1".into(), "B.2".into()));
        assert_eq!(rule.title, "Respect");
        assert_eq!(config.rules[0].rules.len(), 1);
        assert_eq!(config.rules[1].rules[1].title, "Respect");
    }

    #[test]
    fn test_failed_move_leaves_rules_unchanged() {
        let mut config = sample();
        let before = config.clone();
        assert!(config.move_rule("A.1", "Q.1").is_err());
        assert_eq!(config, before);
        assert!(config.move_section("A", "D").is_err());
        assert_eq!(config, before);
    }

    #[test]
    fn test_section_edits() {
        let mut config = sample();
        assert_eq!(config.add_section("Events").unwrap(), 2);
        let (from, to, section) = config.move_section("C", "A").unwrap();
        assert_eq!((from, to), (2, 0));
        assert_eq!(section.title, "Events");
        assert_eq!(config.rules[0].title, "Events");

        let (removed, section) = config.remove_section("b").unwrap();
        assert_eq!(removed, 1);
        assert_eq!(section.title, "General");
        assert_eq!(config.set_section_title("B", "Voice chat").unwrap(), 1);
        assert_eq!(config.rules[1].title, "Voice chat");
    }

    #[test]
    fn test_section_limit() {
        let mut config = RulesConfig::default();
        for _ in 0..MAX_SECTIONS {
            config.add_section("s").unwrap();
        }
        assert_eq!(config.add_section("one more"), Err(RulesError::TooManySections));
    }

    #[test]
    fn test_export_import() {
        let mut config = sample();
        config.channel = "rules-channel".into();
        let json = config.export_json();
        assert!(json.contains("\n    \"title\": \"Server Rules\""));

        let mut other = RulesConfig {
            channel: "kept".into(),
            ..Default::default()
        };
        other.import_json(&json).unwrap();
        assert_eq!(other.rules, config.rules);
        assert_eq!(other.channel, "kept");
    }

    #[test]
    fn test_import_rejects_wrong_shape() {
        let mut config = sample();
        let before = config.clone();
        for bad in [
            "not json",
            r#"{"title": "t", "summary": "s"}"#,
            r#"{"title": "t", "summary": "s", "rules": [], "extra": 1}"#,
            r#"{"title": "t", "summary": "s", "rules": [{"title": "x", "rules": [{"title": 1, "content": ""}]}]}"#,
        ] {
            assert_eq!(config.import_json(bad), Err(RulesError::InvalidImport));
        }
        assert_eq!(config, before);
    }
}
