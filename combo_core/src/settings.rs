//! Compiler settings.

use serde::{Deserialize, Serialize};

/// Default cap on the alternatives any single expansion step may produce
pub const DEFAULT_MAX_ALTERNATIVES: usize = 100_000;

/// Settings applied when a rule set is compiled into a [`Registry`](crate::rules::Registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileSettings {
    /// Upper bound on the alternatives produced by one operator; `None` disables the check
    pub max_alternatives: Option<usize>,
    /// Resolve every rule at construction instead of on first request
    pub eager: bool,
}

impl Default for CompileSettings {
    fn default() -> Self {
        CompileSettings {
            max_alternatives: Some(DEFAULT_MAX_ALTERNATIVES),
            eager: false,
        }
    }
}

impl CompileSettings {
    pub fn with_max_alternatives(mut self, limit: Option<usize>) -> Self {
        self.max_alternatives = limit;
        self
    }

    pub fn with_eager(mut self, eager: bool) -> Self {
        self.eager = eager;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = CompileSettings::default();
        assert_eq!(settings.max_alternatives, Some(100_000));
        assert!(!settings.eager);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: CompileSettings = serde_json::from_str(r#"{"eager": true}"#).unwrap();
        assert!(settings.eager);
        assert_eq!(settings.max_alternatives, Some(DEFAULT_MAX_ALTERNATIVES));

        let settings: CompileSettings = serde_json::from_str(r#"{"max_alternatives": null}"#).unwrap();
        assert_eq!(settings.max_alternatives, None);
    }
}
