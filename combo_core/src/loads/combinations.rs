//! Named load combinations
//!
//! A [`Combination`] is what resolving one rule produces: the ordered list of
//! distinct alternatives a solver must evaluate, plus any [`Options`] the
//! caller attached by name or pattern.
//!
//! ## Governing Alternatives
//!
//! Once per-base-case results are known, [`Combination::envelope`] and
//! [`find_governing_min_max`] superpose every alternative and report the
//! maximum (strength) and minimum (uplift, reversal) responses together with
//! the alternative that produced them.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::LoadCase;
use crate::errors::ComboResult;

/// Opaque caller metadata attached to combinations through the selector.
///
/// The compiler never interprets these values; they are passed through to
/// whatever consumes the combination (for example a nonlinear solver that
/// should start from the previous deformed state).
///
/// # Example
/// ```
/// use combo_core::loads::Options;
///
/// let options = Options::new()
///     .with("initial_state", "previous")
///     .with("max_iterations", 50);
///
/// assert_eq!(options.get("max_iterations").and_then(|v| v.as_u64()), Some(50));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options {
    values: Map<String, Value>,
}

impl Options {
    pub fn new() -> Self {
        Options::default()
    }

    /// Set a value (builder pattern)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a value, replacing any previous one
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Overlay `other` on top of these options; keys in `other` win
    pub fn merge(&mut self, other: &Options) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }
}

/// A named, ordered list of alternatives.
///
/// The order of alternatives is meaningful (callers index into it) and is
/// the order the expansion produced them in, not a value ordering.
///
/// # Example
/// ```
/// use combo_core::loads::{Combination, LoadCase};
///
/// let combo = Combination::new(
///     "ULS",
///     vec![
///         LoadCase::new().with_term("g", 1.35).with_term("w1", 1.5),
///         LoadCase::new().with_term("g", 1.35).with_term("w2", 1.5),
///     ],
/// );
///
/// assert_eq!(combo.len(), 2);
/// assert_eq!(combo.to_string(), "ULS = 1.35*g + 1.5*w1 | 1.35*g + 1.5*w2");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combination {
    /// Rule name this combination was resolved from
    pub name: String,

    /// Distinct alternatives, in expansion order
    pub alternatives: Vec<LoadCase>,

    /// Caller metadata attached by name or pattern
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Options>,
}

impl Combination {
    /// Create a combination without options
    pub fn new(name: impl Into<String>, alternatives: Vec<LoadCase>) -> Self {
        Combination {
            name: name.into(),
            alternatives,
            options: None,
        }
    }

    /// Attach options (builder pattern)
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = Some(options);
        self
    }

    /// Number of alternatives
    pub fn len(&self) -> usize {
        self.alternatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }

    /// Get an alternative by index
    pub fn get(&self, index: usize) -> Option<&LoadCase> {
        self.alternatives.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoadCase> {
        self.alternatives.iter()
    }

    /// Superpose every alternative against per-base-case results
    pub fn evaluate(&self, results: &HashMap<String, f64>) -> ComboResult<Vec<f64>> {
        self.alternatives.iter().map(|case| case.superpose(results)).collect()
    }

    /// Maximum and minimum superposed response over all alternatives.
    ///
    /// Returns `None` for a combination without alternatives. Ties keep the
    /// earliest alternative.
    ///
    /// # Example
    /// ```
    /// use std::collections::HashMap;
    /// use combo_core::loads::{Combination, LoadCase};
    ///
    /// let combo = Combination::new(
    ///     "SLS",
    ///     vec![
    ///         LoadCase::new().with_term("g", 1.0).with_term("w", 1.0),
    ///         LoadCase::new().with_term("g", 1.0).with_term("w", -1.0),
    ///     ],
    /// );
    /// let results = HashMap::from([("g".to_string(), 10.0), ("w".to_string(), 4.0)]);
    ///
    /// let envelope = combo.envelope(&results).unwrap().unwrap();
    /// assert_eq!((envelope.max_index, envelope.min_index), (0, 1));
    /// assert_eq!((envelope.max_value, envelope.min_value), (14.0, 6.0));
    /// ```
    pub fn envelope(&self, results: &HashMap<String, f64>) -> ComboResult<Option<Envelope>> {
        let values = self.evaluate(results)?;
        let mut envelope: Option<Envelope> = None;

        for (index, value) in values.into_iter().enumerate() {
            match envelope.as_mut() {
                None => {
                    envelope = Some(Envelope {
                        max_value: value,
                        max_index: index,
                        min_value: value,
                        min_index: index,
                    });
                }
                Some(current) => {
                    if value > current.max_value {
                        current.max_value = value;
                        current.max_index = index;
                    }
                    if value < current.min_value {
                        current.min_value = value;
                        current.min_index = index;
                    }
                }
            }
        }

        Ok(envelope)
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = ", self.name)?;
        for (i, case) in self.alternatives.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", case)?;
        }
        Ok(())
    }
}

/// Extreme responses of one combination
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Largest superposed value
    pub max_value: f64,
    /// Alternative index producing the largest value
    pub max_index: usize,
    /// Smallest superposed value
    pub min_value: f64,
    /// Alternative index producing the smallest value
    pub min_index: usize,
}

/// Results from finding both max and min governing alternatives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoverningResults {
    /// Maximum superposed value (governs for strength design)
    pub max_value: f64,
    /// Combination name and alternative index for the maximum
    pub max_combo: (String, usize),
    /// Minimum superposed value (governs for uplift/reversal)
    pub min_value: f64,
    /// Combination name and alternative index for the minimum
    pub min_combo: (String, usize),
}

/// Find both maximum and minimum governing alternatives across combinations.
///
/// Returns `None` when no combination has any alternative.
pub fn find_governing_min_max(
    combinations: &[Combination],
    results: &HashMap<String, f64>,
) -> ComboResult<Option<GoverningResults>> {
    let mut governing: Option<GoverningResults> = None;

    for combo in combinations {
        let Some(envelope) = combo.envelope(results)? else {
            continue;
        };
        match governing.as_mut() {
            None => {
                governing = Some(GoverningResults {
                    max_value: envelope.max_value,
                    max_combo: (combo.name.clone(), envelope.max_index),
                    min_value: envelope.min_value,
                    min_combo: (combo.name.clone(), envelope.min_index),
                });
            }
            Some(current) => {
                if envelope.max_value > current.max_value {
                    current.max_value = envelope.max_value;
                    current.max_combo = (combo.name.clone(), envelope.max_index);
                }
                if envelope.min_value < current.min_value {
                    current.min_value = envelope.min_value;
                    current.min_combo = (combo.name.clone(), envelope.min_index);
                }
            }
        }
    }

    Ok(governing)
}
