//! # Combination Selection
//!
//! Patterns pick combinations by name. A pattern starting with `&` is a
//! regular expression matched anywhere in the name (`&LC.` matches `LCA`
//! and `XLC1`); anything else must equal a combination name exactly.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use tracing::warn;

use crate::errors::{ComboError, ComboResult};

/// Prefix that marks a pattern as a regular expression
pub const REGEX_MARKER: char = '&';

#[derive(Debug, Clone)]
pub enum Pattern {
    Literal(String),
    Regex { source: String, regex: Regex },
}

impl Pattern {
    pub fn parse(text: &str) -> ComboResult<Self> {
        match text.strip_prefix(REGEX_MARKER) {
            Some(expression) => Regex::new(expression)
                .map(|regex| Pattern::Regex {
                    source: text.to_string(),
                    regex,
                })
                .map_err(|e| ComboError::invalid_pattern(text, e.to_string())),
            None => Ok(Pattern::Literal(text.to_string())),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Pattern::Literal(literal) => literal == name,
            Pattern::Regex { regex, .. } => regex.is_match(name),
        }
    }

    /// The pattern as written, marker included
    pub fn as_str(&self) -> &str {
        match self {
            Pattern::Literal(literal) => literal,
            Pattern::Regex { source, .. } => source,
        }
    }
}

impl FromStr for Pattern {
    type Err = ComboError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pattern::parse(s)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An ordered list of patterns.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    patterns: Vec<Pattern>,
}

impl Selector {
    pub fn parse<P>(patterns: P) -> ComboResult<Self>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| Pattern::parse(p.as_ref()))
            .collect::<ComboResult<Vec<_>>>()?;
        Ok(Selector { patterns })
    }

    /// Whether a literal pattern names `name` exactly
    pub fn names_literally(&self, name: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| matches!(p, Pattern::Literal(literal) if literal == name))
    }

    /// Pick names from `candidates`.
    ///
    /// Results follow pattern order; within one regex, candidate order.
    /// A name selected twice is kept at its first position. A literal that
    /// names no candidate is an error; a regex that matches nothing only
    /// logs a warning.
    ///
    /// # Example
    /// ```
    /// use combo_core::select::Selector;
    ///
    /// let selector = Selector::parse(["ULS", "&^LC"]).unwrap();
    /// let names = selector.select(&["LC1", "LC2", "SLS", "ULS"]).unwrap();
    /// assert_eq!(names, vec!["ULS", "LC1", "LC2"]);
    /// ```
    pub fn select<'a>(&self, candidates: &[&'a str]) -> ComboResult<Vec<&'a str>> {
        let mut selected = Vec::new();
        let mut seen = HashSet::new();

        for pattern in &self.patterns {
            match pattern {
                Pattern::Literal(literal) => {
                    let name = candidates
                        .iter()
                        .copied()
                        .find(|name| *name == literal.as_str())
                        .ok_or_else(|| ComboError::unknown_combination(literal.as_str()))?;
                    if seen.insert(name) {
                        selected.push(name);
                    }
                }
                Pattern::Regex { regex, .. } => {
                    let mut matched = false;
                    for name in candidates.iter().copied().filter(|name| regex.is_match(name)) {
                        matched = true;
                        if seen.insert(name) {
                            selected.push(name);
                        }
                    }
                    if !matched {
                        warn!(pattern = pattern.as_str(), "selector pattern matched no combination");
                    }
                }
            }
        }

        Ok(selected)
    }
}
