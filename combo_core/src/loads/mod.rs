//! Load cases and combinations produced by the rule compiler
//!
//! This module holds the value types the compiler hands to downstream
//! consumers (typically a solver that superposes per-base-case results).
//!
//! # Overview
//!
//! - [`LoadCase`] - One alternative: an immutable name → coefficient mapping
//! - [`Term`] - A single (name, coefficient) pair of a load case
//! - [`Combination`] - A named, ordered list of alternatives plus optional [`Options`]
//! - [`canonical`] - Term merging and alternative de-duplication
//!
//! # Example
//!
//! ```
//! use combo_core::loads::LoadCase;
//!
//! let uls = LoadCase::new()
//!     .with_term("g", 1.35)
//!     .with_term("w", 1.5);
//!
//! assert_eq!(uls.get("g"), 1.35);
//! assert_eq!(uls.get("s"), 0.0);  // Not present, defaults to 0
//! assert_eq!(uls.to_string(), "1.35*g + 1.5*w");
//! ```

pub mod canonical;
pub mod combinations;

pub use canonical::{canonicalize, dedup_alternatives};
pub use combinations::{find_governing_min_max, Combination, Envelope, GoverningResults, Options};

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::errors::{ComboError, ComboResult};

/// A single weighted reference to a base load case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    /// Base load case name (opaque identifier)
    pub name: String,
    /// Multiplier applied to that load case
    pub coefficient: f64,
}

impl Term {
    pub fn new(name: impl Into<String>, coefficient: f64) -> Self {
        Term {
            name: name.into(),
            coefficient,
        }
    }
}

/// One alternative of a combination: a linear combination of base load cases.
///
/// A `LoadCase` never stores a zero coefficient. Adding a term whose
/// coefficient cancels an existing one removes the entry entirely. Equality
/// and hashing are content-based, so two cases built in different orders
/// compare equal and can be used as set members.
///
/// # Example
/// ```
/// use combo_core::loads::LoadCase;
///
/// let a = LoadCase::new().with_term("g", 1.0).with_term("q", 1.5);
/// let b = LoadCase::new().with_term("q", 1.5).with_term("g", 1.0);
/// assert_eq!(a, b);
///
/// let cancelled = a.with_term("q", -1.5);
/// assert!(!cancelled.has("q"));
/// ```
///
/// # JSON Format
/// ```json
/// { "g": 1.35, "w": 1.5 }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct LoadCase {
    terms: BTreeMap<String, f64>,
}

impl LoadCase {
    /// Create an empty load case (no load at all)
    pub fn new() -> Self {
        LoadCase::default()
    }

    /// Create a load case with a single term
    pub fn single(name: impl Into<String>, coefficient: f64) -> Self {
        LoadCase::new().with_term(name, coefficient)
    }

    /// Add a term, summing with any existing coefficient (builder pattern)
    pub fn with_term(mut self, name: impl Into<String>, coefficient: f64) -> Self {
        self.add_term(name, coefficient);
        self
    }

    /// Add a term, summing with any existing coefficient.
    ///
    /// The entry is removed when the resulting coefficient is exactly zero.
    pub fn add_term(&mut self, name: impl Into<String>, coefficient: f64) {
        let name = name.into();
        let sum = self.get(&name) + coefficient;
        if sum == 0.0 {
            self.terms.remove(&name);
        } else {
            self.terms.insert(name, sum);
        }
    }

    /// Get the coefficient for a base case, defaulting to 0.0 if absent
    pub fn get(&self, name: &str) -> f64 {
        self.terms.get(name).copied().unwrap_or(0.0)
    }

    /// Check if a base case participates in this load case
    pub fn has(&self, name: &str) -> bool {
        self.terms.contains_key(name)
    }

    /// Number of non-zero terms
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether this load case carries no load
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Iterate `(name, coefficient)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.terms.iter().map(|(name, coefficient)| (name.as_str(), *coefficient))
    }

    /// Owned terms in name order
    pub fn to_terms(&self) -> Vec<Term> {
        self.iter().map(|(name, coefficient)| Term::new(name, coefficient)).collect()
    }

    /// Multiply every coefficient by `factor`, dropping terms that become zero
    pub fn scaled(&self, factor: f64) -> LoadCase {
        self.iter()
            .map(|(name, coefficient)| (name, coefficient * factor))
            .collect()
    }

    /// Term-wise sum of two load cases
    pub fn merged(&self, other: &LoadCase) -> LoadCase {
        let mut merged = self.clone();
        for (name, coefficient) in other.iter() {
            merged.add_term(name, coefficient);
        }
        merged
    }

    /// Superpose per-base-case results: `Σ coefficient × results[name]`.
    ///
    /// This is how a linear solver turns already-solved base cases into the
    /// response for this alternative.
    ///
    /// # Example
    /// ```
    /// use std::collections::HashMap;
    /// use combo_core::loads::LoadCase;
    ///
    /// let case = LoadCase::new().with_term("g", 1.35).with_term("w", 1.5);
    /// let results = HashMap::from([("g".to_string(), 10.0), ("w".to_string(), 2.0)]);
    /// assert!((case.superpose(&results).unwrap() - 16.5).abs() < 1e-9);
    /// ```
    pub fn superpose(&self, results: &HashMap<String, f64>) -> ComboResult<f64> {
        self.iter().try_fold(0.0, |total, (name, coefficient)| {
            let value = results.get(name).ok_or_else(|| ComboError::MissingBaseResult {
                name: name.to_string(),
            })?;
            Ok(total + coefficient * value)
        })
    }
}

impl Eq for LoadCase {}

impl Hash for LoadCase {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.terms.len().hash(state);
        for (name, coefficient) in &self.terms {
            name.hash(state);
            coefficient.to_bits().hash(state);
        }
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for LoadCase {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut case = LoadCase::new();
        for (name, coefficient) in iter {
            case.add_term(name, coefficient);
        }
        case
    }
}

impl From<BTreeMap<String, f64>> for LoadCase {
    fn from(terms: BTreeMap<String, f64>) -> Self {
        terms.into_iter().collect()
    }
}

impl From<LoadCase> for BTreeMap<String, f64> {
    fn from(case: LoadCase) -> Self {
        case.terms
    }
}

impl fmt::Display for LoadCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "0");
        }
        for (i, (name, coefficient)) in self.iter().enumerate() {
            let magnitude = coefficient.abs();
            match (i, coefficient < 0.0) {
                (0, true) => write!(f, "-")?,
                (0, false) => {}
                (_, true) => write!(f, " - ")?,
                (_, false) => write!(f, " + ")?,
            }
            if magnitude == 1.0 {
                write!(f, "{}", name)?;
            } else {
                write!(f, "{}*{}", magnitude, name)?;
            }
        }
        Ok(())
    }
}
