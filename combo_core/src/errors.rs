//! # Error Types
//!
//! Structured error types for combo_core. Every failure names the rule,
//! pattern or file it came from so the engineer can fix the rule text
//! without guessing. None of these errors are recovered from locally: the
//! compiler never guesses intent.
//!
//! ## Example
//!
//! ```rust
//! use combo_core::errors::{ComboError, ComboResult};
//!
//! fn require_name(name: &str) -> ComboResult<()> {
//!     if name.is_empty() {
//!         return Err(ComboError::parse(" = A + B", "rule name is empty"));
//!     }
//!     Ok(())
//! }
//!
//! assert_eq!(require_name("").unwrap_err().error_code(), "PARSE_ERROR");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for combo_core operations
pub type ComboResult<T> = Result<T, ComboError>;

/// Structured error type for rule compilation and resolution.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum ComboError {
    /// Malformed rule syntax
    #[error("Parse error in rule '{rule}': {reason}")]
    Parse { rule: String, reason: String },

    /// The same rule name was declared more than once
    #[error("Rule '{name}' is defined more than once")]
    DuplicateRule { name: String },

    /// A factor expression divides by zero
    #[error("Division by zero in factor expression '{expression}'")]
    DivisionByZero { expression: String },

    /// A factor expression overflows to infinity or NaN
    #[error("Factor expression '{expression}' is not a finite number")]
    NonFiniteFactor { expression: String },

    /// A rule is reachable from itself
    #[error("Circular reference to '{name}' ({})", .path.join(" -> "))]
    CircularReference { name: String, path: Vec<String> },

    /// Zip operands with alternative counts that are neither equal nor one
    #[error("Incompatible alternative count for '&': {left} vs {right}")]
    IncompatibleZip { left: usize, right: usize },

    /// Two load-bearing operands multiplied together
    #[error("Non-linear product in rule '{rule}': at least one factor must be numeric")]
    NonLinearProduct { rule: String },

    /// A rule resolves to load terms plus a dangling numeric constant
    #[error("Rule '{name}' leaves a numeric constant {constant} that is not attached to a load case")]
    ConstantTerm { name: String, constant: f64 },

    /// Expansion would exceed the configured alternative limit
    #[error("Too many alternatives: {count} exceeds the limit of {limit}")]
    TooManyAlternatives { count: usize, limit: usize },

    /// A selector regex failed to compile
    #[error("Invalid selector pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A literal selector names no declared combination
    #[error("Unknown combination: {name}")]
    UnknownCombination { name: String },

    /// Superposition was asked for a base case with no result
    #[error("No result available for base load case '{name}'")]
    MissingBaseResult { name: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

impl ComboError {
    /// Create a Parse error
    pub fn parse(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        ComboError::Parse {
            rule: rule.into(),
            reason: reason.into(),
        }
    }

    /// Create a DuplicateRule error
    pub fn duplicate_rule(name: impl Into<String>) -> Self {
        ComboError::DuplicateRule { name: name.into() }
    }

    /// Create a DivisionByZero error
    pub fn division_by_zero(expression: impl Into<String>) -> Self {
        ComboError::DivisionByZero {
            expression: expression.into(),
        }
    }

    /// Create a NonFiniteFactor error
    pub fn non_finite_factor(expression: impl Into<String>) -> Self {
        ComboError::NonFiniteFactor {
            expression: expression.into(),
        }
    }

    /// Create a CircularReference error
    pub fn circular_reference(name: impl Into<String>, path: Vec<String>) -> Self {
        ComboError::CircularReference {
            name: name.into(),
            path,
        }
    }

    /// Create an InvalidPattern error
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        ComboError::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Create an UnknownCombination error
    pub fn unknown_combination(name: impl Into<String>) -> Self {
        ComboError::UnknownCombination { name: name.into() }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        ComboError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization(reason: impl Into<String>) -> Self {
        ComboError::SerializationError {
            reason: reason.into(),
        }
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ComboError::Parse { .. } => "PARSE_ERROR",
            ComboError::DuplicateRule { .. } => "DUPLICATE_RULE",
            ComboError::DivisionByZero { .. } => "DIVISION_BY_ZERO",
            ComboError::NonFiniteFactor { .. } => "NON_FINITE_FACTOR",
            ComboError::CircularReference { .. } => "CIRCULAR_REFERENCE",
            ComboError::IncompatibleZip { .. } => "INCOMPATIBLE_ZIP",
            ComboError::NonLinearProduct { .. } => "NON_LINEAR_PRODUCT",
            ComboError::ConstantTerm { .. } => "CONSTANT_TERM",
            ComboError::TooManyAlternatives { .. } => "TOO_MANY_ALTERNATIVES",
            ComboError::InvalidPattern { .. } => "INVALID_PATTERN",
            ComboError::UnknownCombination { .. } => "UNKNOWN_COMBINATION",
            ComboError::MissingBaseResult { .. } => "MISSING_BASE_RESULT",
            ComboError::FileError { .. } => "FILE_ERROR",
            ComboError::SerializationError { .. } => "SERIALIZATION_ERROR",
            ComboError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = ComboError::circular_reference("X", vec!["X".to_string(), "X".to_string()]);
        let json = serde_json::to_string(&error).unwrap();
        let roundtrip: ComboError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ComboError::parse("X = (", "unbalanced").error_code(), "PARSE_ERROR");
        assert_eq!(ComboError::IncompatibleZip { left: 2, right: 3 }.error_code(), "INCOMPATIBLE_ZIP");
        assert_eq!(ComboError::unknown_combination("ULS").error_code(), "UNKNOWN_COMBINATION");
    }

    #[test]
    fn test_circular_reference_message_shows_path() {
        let error = ComboError::circular_reference(
            "A",
            vec!["A".to_string(), "B".to_string(), "A".to_string()],
        );
        assert_eq!(error.to_string(), "Circular reference to 'A' (A -> B -> A)");
    }
}
