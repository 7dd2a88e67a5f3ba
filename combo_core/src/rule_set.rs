//! # Rule-Set Documents
//!
//! A `RuleSet` is the serializable form of a rule file: metadata, compile
//! settings, declared base cases, raw rule lines and options attachments.
//! Rule sets save as human-readable JSON; see [`file_io`](crate::file_io).
//!
//! ## Structure
//!
//! ```text
//! RuleSet
//! ├── meta: RuleSetMetadata (version, title, engineer, code, timestamps)
//! ├── settings: CompileSettings (alternative limit, eager resolution)
//! ├── base_cases: Vec<String>
//! ├── rules: Vec<String> (one rule per line, comments allowed)
//! └── options: Vec<OptionsAttachment> (pattern -> Options)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use combo_core::rule_set::RuleSet;
//!
//! let rule_set = RuleSet::from_rule_text("# Eurocode\nULS = 1.35*g + 1.5*(w1 | w2)\n");
//! let registry = rule_set.compile().unwrap();
//!
//! assert_eq!(registry.resolve("ULS").unwrap().len(), 2);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ComboResult;
use crate::loads::Options;
use crate::rules::{is_ignored_line, Registry};
use crate::settings::CompileSettings;

/// Current schema version for rule-set documents
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Root rule-set document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    pub meta: RuleSetMetadata,

    #[serde(default)]
    pub settings: CompileSettings,

    /// Declared atomic load cases
    #[serde(default)]
    pub base_cases: Vec<String>,

    /// Rule lines, blanks and `#` comments included
    pub rules: Vec<String>,

    /// Options attached to combinations by name or `&regex`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionsAttachment>,
}

impl RuleSet {
    /// Create an empty rule set.
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        RuleSet {
            meta: RuleSetMetadata {
                version: SCHEMA_VERSION.to_string(),
                title: title.into(),
                engineer: String::new(),
                design_code: None,
                created: now,
                modified: now,
            },
            settings: CompileSettings::default(),
            base_cases: Vec::new(),
            rules: Vec::new(),
            options: Vec::new(),
        }
    }

    /// Build an untitled rule set from plain rule text, one rule per line.
    pub fn from_rule_text(text: &str) -> Self {
        let mut rule_set = RuleSet::new("");
        rule_set.rules = text.lines().map(str::to_string).collect();
        rule_set
    }

    pub fn with_base_cases<I>(mut self, base_cases: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.base_cases = base_cases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_settings(mut self, settings: CompileSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn add_rule(&mut self, rule: impl Into<String>) {
        self.rules.push(rule.into());
        self.touch();
    }

    pub fn attach_options(&mut self, pattern: impl Into<String>, options: Options) {
        self.options.push(OptionsAttachment {
            pattern: pattern.into(),
            options,
        });
        self.touch();
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }

    /// Number of actual rules, comments and blanks excluded
    pub fn rule_count(&self) -> usize {
        self.rules.iter().filter(|line| !is_ignored_line(line)).count()
    }

    /// Compile into a registry, applying settings and options attachments.
    pub fn compile(&self) -> ComboResult<Registry> {
        let mut registry = Registry::with_settings(self.base_cases.iter().cloned(), &self.rules, self.settings)?;
        for attachment in &self.options {
            registry.attach_options(&attachment.pattern, attachment.options.clone())?;
        }
        Ok(registry)
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        RuleSet::new("")
    }
}

/// Rule-set metadata stored in the file header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSetMetadata {
    /// Schema version (for migration compatibility)
    pub version: String,

    pub title: String,

    /// Responsible engineer
    #[serde(default)]
    pub engineer: String,

    /// Design code the rules implement (e.g., "EN 1990")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_code: Option<String>,

    pub created: DateTime<Utc>,

    pub modified: DateTime<Utc>,
}

/// Options applied to every combination whose name matches `pattern`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionsAttachment {
    pub pattern: String,
    pub options: Options,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_set_creation() {
        let rule_set = RuleSet::new("EN 1990 combinations");
        assert_eq!(rule_set.meta.title, "EN 1990 combinations");
        assert_eq!(rule_set.meta.version, SCHEMA_VERSION);
        assert_eq!(rule_set.settings, CompileSettings::default());
        assert_eq!(rule_set.rule_count(), 0);
    }

    #[test]
    fn test_from_rule_text_keeps_comments() {
        let rule_set = RuleSet::from_rule_text("# permanent\ng = g1 + g2\n\nULS = 1.35*g\n");
        assert_eq!(rule_set.rules.len(), 4);
        assert_eq!(rule_set.rule_count(), 2);
    }

    #[test]
    fn test_serialization() {
        let mut rule_set = RuleSet::new("Test").with_base_cases(["g", "q"]);
        rule_set.meta.design_code = Some("EN 1990".to_string());
        rule_set.add_rule("ULS = 1.35*g + 1.5*q");
        rule_set.attach_options("&ULS", Options::new().with("initial_state", "previous"));

        let json = serde_json::to_string_pretty(&rule_set).unwrap();
        assert!(json.contains("EN 1990"));
        assert!(json.contains("initial_state"));

        let roundtrip: RuleSet = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip.rules, rule_set.rules);
        assert_eq!(roundtrip.base_cases, vec!["g", "q"]);
        assert_eq!(roundtrip.options, rule_set.options);
    }

    #[test]
    fn test_minimal_document() {
        let json = r#"{
            "meta": {
                "version": "0.1.0",
                "title": "minimal",
                "created": "2024-01-01T00:00:00Z",
                "modified": "2024-01-01T00:00:00Z"
            },
            "rules": ["SLS = g + q"]
        }"#;
        let rule_set: RuleSet = serde_json::from_str(json).unwrap();
        assert!(rule_set.base_cases.is_empty());
        assert!(rule_set.options.is_empty());
        assert_eq!(rule_set.settings.max_alternatives, Some(100_000));
    }

    #[test]
    fn test_compile_applies_settings_and_options() {
        let mut rule_set = RuleSet::from_rule_text("ULS = (a|b|c) + (x|y)\nSLS = g")
            .with_settings(CompileSettings::default().with_max_alternatives(Some(4)));
        rule_set.attach_options("SLS", Options::new().with("check", "deflection"));

        let registry = rule_set.compile().unwrap();
        assert_eq!(registry.resolve("ULS").unwrap_err().error_code(), "TOO_MANY_ALTERNATIVES");

        let sls = registry.resolve("SLS").unwrap();
        assert!(sls.options.is_some());
    }

    #[test]
    fn test_compile_rejects_bad_pattern() {
        let mut rule_set = RuleSet::from_rule_text("SLS = g");
        rule_set.attach_options("&(", Options::new());
        assert_eq!(rule_set.compile().unwrap_err().error_code(), "INVALID_PATTERN");
    }
}
