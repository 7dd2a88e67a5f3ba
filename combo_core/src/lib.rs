//! # combo_core - Load-Case Combination Rule Compiler
//!
//! `combo_core` turns design-code combination formulas such as
//! `ULS = 1.35*g + 1.5*(w1 | w2)` into the concrete list of linear load
//! combinations a structural solver runs. All result types are
//! JSON-serializable.
//!
//! ## Design Philosophy
//!
//! - **Lazy**: rules resolve on first request and are cached
//! - **Deterministic**: alternative order follows the expansion order exactly
//! - **Rich Errors**: structured error types, not just strings
//!
//! ## Quick Start
//!
//! ```rust
//! use combo_core::Registry;
//!
//! let registry = Registry::new(
//!     ["g1", "g2", "w1", "w2", "w3"],
//!     ["ULS = 1.35*g + 1.5*w", "w = w1|w2|w3", "g = g1+(1|0)*g2"],
//! )
//! .unwrap();
//!
//! let uls = registry.resolve("ULS").unwrap();
//! assert_eq!(uls.len(), 6);
//! assert_eq!(uls.alternatives[0].to_string(), "1.35*g1 + 1.35*g2 + 1.5*w1");
//! ```
//!
//! ## Modules
//!
//! - [`rules`] - Rule parsing, expansion and the resolving registry
//! - [`loads`] - Load cases, combinations and solver helpers
//! - [`select`] - Picking combinations by name or regex
//! - [`rule_set`] - Serializable rule-set documents
//! - [`settings`] - Compile settings
//! - [`errors`] - Structured error types
//! - [`file_io`] - Atomic saves and rule-file loading

pub mod errors;
pub mod file_io;
pub mod loads;
pub mod rule_set;
pub mod rules;
pub mod select;
pub mod settings;

#[cfg(test)]
mod proptests;

// Re-export commonly used types at crate root for convenience
pub use errors::{ComboError, ComboResult};
pub use file_io::{load_rule_set, read_rule_lines, save_rule_set};
pub use loads::{Combination, LoadCase, Options};
pub use rule_set::{RuleSet, RuleSetMetadata};
pub use rules::{Registry, ResolutionState};
pub use settings::CompileSettings;
