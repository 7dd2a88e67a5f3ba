//! # Expansion Engine
//!
//! Recursively evaluates an [`Expr`] into an ordered list of alternatives.
//! Named references go back through the [`Registry`], which memoizes each
//! rule and detects cycles; everything else is structural:
//!
//! - `Sum` / `Product`: full cartesian product, outer operand in the outer loop
//! - `Zip`: positional pairing, a single alternative broadcasts
//! - `Union` / wildcard: concatenation, no merging
//! - `Scale` / `Neg`: per-alternative multiplication, count unchanged
//!
//! During expansion an alternative may still carry a bare numeric part
//! (`(1|0)` before it multiplies `g2`), so the engine works on
//! [`Alternative`] rather than on [`LoadCase`] directly.

use std::hash::{Hash, Hasher};

use tracing::{debug, trace, warn};

use super::ast::Expr;
use super::factor::evaluate;
use super::registry::Registry;
use crate::errors::{ComboError, ComboResult};
use crate::loads::LoadCase;

/// A load case plus a numeric constant part.
///
/// Resolved rules that describe loads end with `constant == 0.0`; rules like
/// `psi = 0.6|0.7` keep only constants and act as reusable factor sets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Alternative {
    pub constant: f64,
    pub case: LoadCase,
}

/// Collapse -0.0 so equal alternatives also hash equal.
fn normalized(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}

impl Alternative {
    /// A pure load combination
    pub fn load(case: LoadCase) -> Self {
        Alternative { constant: 0.0, case }
    }

    /// A pure number
    pub fn scalar(value: f64) -> Self {
        Alternative {
            constant: normalized(value),
            case: LoadCase::new(),
        }
    }

    /// Whether no load case participates
    pub fn is_scalar(&self) -> bool {
        self.case.is_empty()
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Alternative {
            constant: normalized(self.constant * factor),
            case: self.case.scaled(factor),
        }
    }

    pub fn merged(&self, other: &Alternative) -> Self {
        Alternative {
            constant: normalized(self.constant + other.constant),
            case: self.case.merged(&other.case),
        }
    }

    /// Product of two alternatives; `None` if both carry load terms.
    pub fn product(&self, other: &Alternative) -> Option<Self> {
        if self.is_scalar() {
            Some(other.scaled(self.constant))
        } else if other.is_scalar() {
            Some(self.scaled(other.constant))
        } else {
            None
        }
    }
}

impl Eq for Alternative {}

impl Hash for Alternative {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.constant.to_bits().hash(state);
        self.case.hash(state);
    }
}

/// Expands the expression of one rule.
pub struct Expander<'r> {
    registry: &'r Registry,
    rule: &'r str,
}

impl<'r> Expander<'r> {
    /// `rule` names the rule being expanded, for diagnostics.
    pub fn new(registry: &'r Registry, rule: &'r str) -> Self {
        Expander { registry, rule }
    }

    pub fn expand(&self, expr: &Expr) -> ComboResult<Vec<Alternative>> {
        let alternatives = match expr {
            Expr::Leaf(name) => self.expand_leaf(name)?,
            Expr::WildcardRef(prefix) => self.expand_wildcard(prefix)?,
            Expr::Const(factor) => vec![Alternative::scalar(evaluate(factor)?)],
            Expr::Scale(inner, factor) => {
                let factor = evaluate(factor)?;
                self.expand(inner)?.iter().map(|alt| alt.scaled(factor)).collect()
            }
            Expr::Neg(inner) => self.expand(inner)?.iter().map(|alt| alt.scaled(-1.0)).collect(),
            Expr::Sum(lhs, rhs) => {
                let (outer, inner) = (self.expand(lhs)?, self.expand(rhs)?);
                self.cartesian(&outer, &inner, |a, b| Ok(a.merged(b)))?
            }
            Expr::Product(lhs, rhs) => {
                let (outer, inner) = (self.expand(lhs)?, self.expand(rhs)?);
                self.cartesian(&outer, &inner, |a, b| {
                    a.product(b).ok_or_else(|| ComboError::NonLinearProduct {
                        rule: self.rule.to_string(),
                    })
                })?
            }
            Expr::Zip(lhs, rhs) => {
                let (left, right) = (self.expand(lhs)?, self.expand(rhs)?);
                self.zip(&left, &right)?
            }
            Expr::Union(lhs, rhs) => {
                let (mut left, right) = (self.expand(lhs)?, self.expand(rhs)?);
                self.check_count(left.len() + right.len())?;
                left.extend(right);
                left
            }
        };

        trace!(rule = self.rule, node = %expr, alternatives = alternatives.len(), "expanded node");
        Ok(alternatives)
    }

    fn expand_leaf(&self, name: &str) -> ComboResult<Vec<Alternative>> {
        if self.registry.is_rule(name) {
            return Ok(self.registry.resolve_alternatives(name)?.to_vec());
        }
        if !self.registry.is_base_case(name) {
            debug!(rule = self.rule, name, "undeclared name treated as atomic base case");
        }
        Ok(vec![Alternative::load(LoadCase::single(name, 1.0))])
    }

    fn expand_wildcard(&self, prefix: &str) -> ComboResult<Vec<Alternative>> {
        let matches: Vec<&str> = self.registry.rules_extending(prefix).collect();
        if matches.is_empty() {
            warn!(rule = self.rule, prefix, "wildcard matched no rule");
            return Ok(Vec::new());
        }

        let mut alternatives = Vec::new();
        for name in matches {
            let resolved = self.registry.resolve_alternatives(name)?;
            self.check_count(alternatives.len() + resolved.len())?;
            alternatives.extend(resolved.iter().cloned());
        }
        Ok(alternatives)
    }

    fn cartesian<F>(&self, outer: &[Alternative], inner: &[Alternative], combine: F) -> ComboResult<Vec<Alternative>>
    where
        F: Fn(&Alternative, &Alternative) -> ComboResult<Alternative>,
    {
        let count = outer.len().saturating_mul(inner.len());
        self.check_count(count)?;

        let mut alternatives = Vec::with_capacity(count);
        for a in outer {
            for b in inner {
                alternatives.push(combine(a, b)?);
            }
        }
        Ok(alternatives)
    }

    fn zip(&self, left: &[Alternative], right: &[Alternative]) -> ComboResult<Vec<Alternative>> {
        match (left, right) {
            _ if left.len() == right.len() => Ok(left.iter().zip(right).map(|(a, b)| a.merged(b)).collect()),
            ([single], _) => Ok(right.iter().map(|b| single.merged(b)).collect()),
            (_, [single]) => Ok(left.iter().map(|a| a.merged(single)).collect()),
            _ => Err(ComboError::IncompatibleZip {
                left: left.len(),
                right: right.len(),
            }),
        }
    }

    fn check_count(&self, count: usize) -> ComboResult<()> {
        match self.registry.settings().max_alternatives {
            Some(limit) if count > limit => Err(ComboError::TooManyAlternatives { count, limit }),
            _ => Ok(()),
        }
    }
}
