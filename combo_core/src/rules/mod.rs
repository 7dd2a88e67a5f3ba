//! # Combination Rules
//!
//! Parsing and resolution of `NAME = EXPRESSION` rules.
//!
//! - [`parser`]: rule text to [`Expr`]
//! - [`factor`]: constant arithmetic folding
//! - [`expand`]: operator semantics over alternative lists
//! - [`registry`]: rule storage, memoized resolution, cycle detection

pub mod ast;
pub mod expand;
pub mod factor;
pub mod parser;
pub mod registry;

pub use ast::{Expr, FactorExpr, Rule};
pub use expand::Alternative;
pub use factor::evaluate;
pub use parser::{is_ignored_line, parse_expression, parse_factor, parse_rule, parse_rules};
pub use registry::{Registry, ResolutionState};
