//! # Rule Registry
//!
//! Holds the declared base cases and rules and resolves rules on demand.
//! Each rule is expanded at most once; the result is cached and shared by
//! every rule that references it. A rule found `Resolving` while it is
//! being resolved is part of a reference cycle.
//!
//! ```text
//! Unresolved ──resolve──> Resolving ──ok──> Resolved
//!      ^                      │
//!      └────────error─────────┘
//! ```

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use tracing::{debug, info};

use super::ast::Rule;
use super::expand::{Alternative, Expander};
use super::parser::parse_rules;
use crate::errors::{ComboError, ComboResult};
use crate::loads::{canonicalize, dedup_alternatives, Combination, LoadCase, Options};
use crate::select::{Pattern, Selector};
use crate::settings::CompileSettings;

/// Resolution progress of one rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Unresolved,
    Resolving,
    Resolved,
}

#[derive(Debug, Clone)]
enum Slot {
    Resolving,
    Resolved(Rc<[Alternative]>),
}

#[derive(Debug, Clone)]
struct Attachment {
    pattern: Pattern,
    options: Options,
}

/// Compiled rule set.
///
/// Resolution only needs `&self`; the cache lives behind a `RefCell`, so a
/// registry is not `Sync`.
///
/// # Example
/// ```
/// use combo_core::rules::Registry;
///
/// let registry = Registry::new(["g", "q"], ["ULS = 1.35*g + 1.5*q | g"]).unwrap();
/// let uls = registry.resolve("ULS").unwrap();
/// assert_eq!(uls.len(), 2);
/// assert_eq!(uls.alternatives[0].get("q"), 1.5);
/// ```
#[derive(Debug, Clone)]
pub struct Registry {
    base_cases: BTreeSet<String>,
    rules: Vec<Rule>,
    index: HashMap<String, usize>,
    slots: RefCell<HashMap<String, Slot>>,
    path: RefCell<Vec<String>>,
    attachments: Vec<Attachment>,
    settings: CompileSettings,
}

impl Registry {
    /// Build a registry with default settings.
    pub fn new<B, R>(base_cases: B, rules: R) -> ComboResult<Self>
    where
        B: IntoIterator,
        B::Item: Into<String>,
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        Self::with_settings(base_cases, rules, CompileSettings::default())
    }

    /// Build a registry without declared base cases.
    pub fn from_rules<R>(rules: R) -> ComboResult<Self>
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        Self::new(Vec::<String>::new(), rules)
    }

    pub fn with_settings<B, R>(base_cases: B, rules: R, settings: CompileSettings) -> ComboResult<Self>
    where
        B: IntoIterator,
        B::Item: Into<String>,
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        let rules = parse_rules(rules)?;

        let mut index = HashMap::with_capacity(rules.len());
        for (position, rule) in rules.iter().enumerate() {
            if index.insert(rule.name.clone(), position).is_some() {
                return Err(ComboError::duplicate_rule(&rule.name));
            }
        }

        let registry = Registry {
            base_cases: base_cases.into_iter().map(Into::into).collect(),
            rules,
            index,
            slots: RefCell::new(HashMap::new()),
            path: RefCell::new(Vec::new()),
            attachments: Vec::new(),
            settings,
        };

        info!(
            rules = registry.rules.len(),
            base_cases = registry.base_cases.len(),
            eager = settings.eager,
            "compiled rule set"
        );

        if settings.eager {
            registry.resolve_all()?;
        }
        Ok(registry)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn settings(&self) -> &CompileSettings {
        &self.settings
    }

    pub fn is_rule(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.index.get(name).map(|&position| &self.rules[position])
    }

    /// Rule names in declaration order
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.name.as_str())
    }

    pub fn is_base_case(&self, name: &str) -> bool {
        self.base_cases.contains(name)
    }

    /// Rules whose name starts with `prefix` and is longer than it,
    /// in declaration order.
    pub fn rules_extending<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.rule_names()
            .filter(move |name| name.len() > prefix.len() && name.starts_with(prefix))
    }

    pub fn state(&self, name: &str) -> ResolutionState {
        match self.slots.borrow().get(name) {
            None => ResolutionState::Unresolved,
            Some(Slot::Resolving) => ResolutionState::Resolving,
            Some(Slot::Resolved(_)) => ResolutionState::Resolved,
        }
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolve a name into its combination.
    ///
    /// A name that is not a rule resolves to a single alternative holding
    /// just that name. Fails if an alternative keeps a bare numeric part.
    pub fn resolve(&self, name: &str) -> ComboResult<Combination> {
        let cases = if self.is_rule(name) {
            let alternatives = self.resolve_alternatives(name)?;
            load_cases(name, &alternatives)?
        } else {
            vec![LoadCase::single(name, 1.0)]
        };
        Ok(self.combination(name, cases))
    }

    /// Resolve a rule into its cached alternatives, constants included.
    pub(crate) fn resolve_alternatives(&self, name: &str) -> ComboResult<Rc<[Alternative]>> {
        match self.slots.borrow().get(name) {
            Some(Slot::Resolved(alternatives)) => return Ok(Rc::clone(alternatives)),
            Some(Slot::Resolving) => return Err(self.cycle_error(name)),
            None => {}
        }

        let Some(rule) = self.rule(name) else {
            return Ok(vec![Alternative::load(LoadCase::single(name, 1.0))].into());
        };

        self.slots.borrow_mut().insert(name.to_string(), Slot::Resolving);
        self.path.borrow_mut().push(name.to_string());
        debug!(rule = name, "resolving");

        let expanded = Expander::new(self, &rule.name).expand(&rule.expr);
        self.path.borrow_mut().pop();

        match expanded {
            Ok(alternatives) => {
                let alternatives: Rc<[Alternative]> = dedup_alternatives(alternatives).into();
                debug!(rule = name, alternatives = alternatives.len(), "resolved");
                self.slots
                    .borrow_mut()
                    .insert(name.to_string(), Slot::Resolved(Rc::clone(&alternatives)));
                Ok(alternatives)
            }
            Err(error) => {
                self.slots.borrow_mut().remove(name);
                Err(error)
            }
        }
    }

    fn cycle_error(&self, name: &str) -> ComboError {
        let path = self.path.borrow();
        let start = path.iter().position(|entry| entry == name).unwrap_or(0);
        let mut cycle = path[start..].to_vec();
        cycle.push(name.to_string());
        ComboError::circular_reference(name, cycle)
    }

    /// Resolve every rule, stopping at the first failure.
    pub fn resolve_all(&self) -> ComboResult<()> {
        for rule in &self.rules {
            let alternatives = self.resolve_alternatives(&rule.name)?;
            if !is_factor_set(&alternatives) {
                load_cases(&rule.name, &alternatives)?;
            }
        }
        Ok(())
    }

    /// Every combination, sorted by name. Rules that only hold numbers
    /// (`psi = 0.6 | 0.7`) are factor sets and are skipped.
    pub fn ordered_combinations(&self) -> ComboResult<Vec<Combination>> {
        let mut combinations = Vec::new();
        for name in self.sorted_rule_names() {
            let alternatives = self.resolve_alternatives(name)?;
            if is_factor_set(&alternatives) {
                debug!(rule = name, "skipping factor set");
                continue;
            }
            combinations.push(self.combination(name, load_cases(name, &alternatives)?));
        }
        Ok(combinations)
    }

    /// Combinations picked by `patterns`, in pattern order.
    ///
    /// Regex patterns skip factor sets; a literal pattern naming one fails
    /// like [`resolve`](Self::resolve) does.
    pub fn select<P>(&self, patterns: P) -> ComboResult<Vec<Combination>>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let selector = Selector::parse(patterns)?;
        let names = self.sorted_rule_names();

        let mut combinations = Vec::new();
        for name in selector.select(&names)? {
            let alternatives = self.resolve_alternatives(name)?;
            if is_factor_set(&alternatives) && !selector.names_literally(name) {
                continue;
            }
            combinations.push(self.combination(name, load_cases(name, &alternatives)?));
        }
        Ok(combinations)
    }

    fn sorted_rule_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rule_names().collect();
        names.sort_unstable();
        names
    }

    // ========================================================================
    // Options
    // ========================================================================

    /// Attach options to every combination whose name matches `pattern`.
    ///
    /// Attachments are applied in order, so later ones override earlier
    /// keys.
    pub fn attach_options(&mut self, pattern: &str, options: Options) -> ComboResult<()> {
        let pattern = Pattern::parse(pattern)?;
        debug!(pattern = pattern.as_str(), keys = options.len(), "attaching options");
        self.attachments.push(Attachment { pattern, options });
        Ok(())
    }

    /// Merged options of every attachment matching `name`
    pub fn options_for(&self, name: &str) -> Option<Options> {
        self.attachments
            .iter()
            .filter(|attachment| attachment.pattern.matches(name))
            .fold(None, |merged: Option<Options>, attachment| {
                let mut merged = merged.unwrap_or_default();
                merged.merge(&attachment.options);
                Some(merged)
            })
    }

    fn combination(&self, name: &str, cases: Vec<LoadCase>) -> Combination {
        let combination = Combination::new(name, cases);
        match self.options_for(name) {
            Some(options) => combination.with_options(options),
            None => combination,
        }
    }
}

/// All alternatives are plain numbers, at least one of them non-zero.
fn is_factor_set(alternatives: &[Alternative]) -> bool {
    alternatives.iter().all(Alternative::is_scalar) && alternatives.iter().any(|alt| alt.constant != 0.0)
}

fn load_cases(name: &str, alternatives: &[Alternative]) -> ComboResult<Vec<LoadCase>> {
    let cases = alternatives
        .iter()
        .map(|alt| {
            if alt.constant != 0.0 {
                Err(ComboError::ConstantTerm {
                    name: name.to_string(),
                    constant: alt.constant,
                })
            } else {
                Ok(alt.case.clone())
            }
        })
        .collect::<ComboResult<Vec<_>>>()?;
    Ok(canonicalize(cases))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(terms: &[(&str, f64)]) -> LoadCase {
        terms.iter().map(|(name, c)| (*name, *c)).collect()
    }

    #[test]
    fn test_wildcard_in_declaration_order() {
        let registry = Registry::from_rules(["w1 = w11", "w2 = w22", "ULS = w$"]).unwrap();
        let uls = registry.resolve("ULS").unwrap();
        assert_eq!(uls.alternatives, vec![case(&[("w11", 1.0)]), case(&[("w22", 1.0)])]);
    }

    #[test]
    fn test_wildcard_declared_before_its_matches() {
        let registry = Registry::from_rules(["ULS = w$", "w1 = w11", "w2 = w22"]).unwrap();
        let uls = registry.resolve("ULS").unwrap();
        assert_eq!(uls.alternatives, vec![case(&[("w11", 1.0)]), case(&[("w22", 1.0)])]);
    }

    #[test]
    fn test_wildcard_without_match_contributes_nothing() {
        let registry = Registry::from_rules(["X = w$ | g"]).unwrap();
        let x = registry.resolve("X").unwrap();
        assert_eq!(x.alternatives, vec![case(&[("g", 1.0)])]);
    }

    #[test]
    fn test_non_finite_factor_is_rejected() {
        let registry = Registry::from_rules(["X = (1e400-1e400)*a | (1e400-1e400)*a", "Y = 1e400*a"]).unwrap();
        assert_eq!(registry.resolve("X").unwrap_err().error_code(), "NON_FINITE_FACTOR");
        assert_eq!(registry.resolve("Y").unwrap_err().error_code(), "NON_FINITE_FACTOR");
        assert_eq!(registry.state("X"), ResolutionState::Unresolved);
    }

    #[test]
    fn test_zero_factor_set_collapses() {
        let registry = Registry::from_rules(["X1=(0|0)*A+B"]).unwrap();
        let x1 = registry.resolve("X1").unwrap();
        assert_eq!(x1.alternatives, vec![case(&[("B", 1.0)])]);
    }

    #[test]
    fn test_plain_self_reference() {
        let registry = Registry::from_rules(["X = X"]).unwrap();
        assert_eq!(registry.resolve("X").unwrap_err().error_code(), "CIRCULAR_REFERENCE");
    }

    #[test]
    fn test_nested_numeric_factor() {
        let registry = Registry::from_rules(["ULS = -2*((1.5*2/0.3+3+4)*P)"]).unwrap();
        let uls = registry.resolve("ULS").unwrap();
        assert_eq!(uls.alternatives, vec![case(&[("P", -34.0)])]);
    }

    #[test]
    fn test_multiple_alternatives() {
        let registry = Registry::new(
            ["g1", "g2", "w1", "w2", "w3"],
            ["ULS = 1.35*g + 1.5*w", "w = w1|w2|w3", "g = g1+(1|0)*g2"],
        )
        .unwrap();
        let uls = registry.resolve("ULS").unwrap();

        assert_eq!(uls.len(), 6);
        assert_eq!(
            uls.alternatives[0],
            case(&[("g1", 1.35), ("g2", 1.35), ("w1", 1.5)])
        );
        assert_eq!(uls.alternatives[3], case(&[("g1", 1.35), ("w1", 1.5)]));
        assert_eq!(uls.alternatives[5], case(&[("g1", 1.35), ("w3", 1.5)]));
    }

    #[test]
    fn test_cancellation_and_dedup() {
        let registry = Registry::from_rules(["X1 = (A-A+B)|(B+A-A)"]).unwrap();
        let x1 = registry.resolve("X1").unwrap();
        assert_eq!(x1.alternatives, vec![case(&[("B", 1.0)])]);
    }

    #[test]
    fn test_select_regex() {
        let registry = Registry::from_rules(["X = x", "LCC = c", "LCA = a", "LCB = b"]).unwrap();
        let selected = registry.select(["&LC."]).unwrap();
        let names: Vec<&str> = selected.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["LCA", "LCB", "LCC"]);
        assert_eq!(selected[2].alternatives, vec![case(&[("c", 1.0)])]);
    }

    #[test]
    fn test_select_literal_unknown() {
        let registry = Registry::from_rules(["LCA = a"]).unwrap();
        let err = registry.select(["LCZ"]).unwrap_err();
        assert_eq!(err, ComboError::unknown_combination("LCZ"));
    }

    #[test]
    fn test_self_reference() {
        let registry = Registry::from_rules(["A = A + 1*B"]).unwrap();
        let err = registry.resolve("A").unwrap_err();
        assert_eq!(
            err,
            ComboError::circular_reference("A", vec!["A".to_string(), "A".to_string()])
        );
        assert_eq!(registry.state("A"), ResolutionState::Unresolved);
    }

    #[test]
    fn test_indirect_cycle_path() {
        let registry = Registry::from_rules(["A = B", "B = C + g", "C = 2*B"]).unwrap();
        match registry.resolve("A").unwrap_err() {
            ComboError::CircularReference { name, path } => {
                assert_eq!(name, "B");
                assert_eq!(path, vec!["B", "C", "B"]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
        for name in ["A", "B", "C"] {
            assert_eq!(registry.state(name), ResolutionState::Unresolved);
        }
    }

    #[test]
    fn test_cycle_through_wildcard() {
        let registry = Registry::from_rules(["w1 = w11", "wall = w$"]).unwrap();
        let err = registry.resolve("wall").unwrap_err();
        assert_eq!(err.error_code(), "CIRCULAR_REFERENCE");
    }

    #[test]
    fn test_idempotent_resolution() {
        let registry = Registry::from_rules(["ULS = 1.35*g + (q | w)"]).unwrap();
        assert_eq!(registry.state("ULS"), ResolutionState::Unresolved);

        let first = registry.resolve("ULS").unwrap();
        assert_eq!(registry.state("ULS"), ResolutionState::Resolved);
        let second = registry.resolve("ULS").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_forward_reference() {
        let registry = Registry::from_rules(["ULS = 1.5*q", "q = q1 | q2"]).unwrap();
        let uls = registry.resolve("ULS").unwrap();
        assert_eq!(uls.alternatives, vec![case(&[("q1", 1.5)]), case(&[("q2", 1.5)])]);
        assert_eq!(registry.state("q"), ResolutionState::Resolved);
    }

    #[test]
    fn test_resolve_unknown_name_is_atomic() {
        let registry = Registry::from_rules(["ULS = g"]).unwrap();
        let q = registry.resolve("q").unwrap();
        assert_eq!(q.alternatives, vec![case(&[("q", 1.0)])]);
    }

    #[test]
    fn test_resolve_constant_fails() {
        let registry = Registry::from_rules(["psi = 0.6 | 0.7", "X = g + 1"]).unwrap();
        assert_eq!(registry.resolve("psi").unwrap_err().error_code(), "CONSTANT_TERM");
        assert_eq!(registry.resolve("X").unwrap_err().error_code(), "CONSTANT_TERM");
    }

    #[test]
    fn test_factor_set_is_reusable() {
        let registry = Registry::from_rules(["psi = 0.6 | 0.7", "SLS = g + psi*q"]).unwrap();
        let sls = registry.resolve("SLS").unwrap();
        assert_eq!(
            sls.alternatives,
            vec![case(&[("g", 1.0), ("q", 0.6)]), case(&[("g", 1.0), ("q", 0.7)])]
        );

        let names: Vec<String> = registry
            .ordered_combinations()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["SLS"]);
    }

    #[test]
    fn test_select_skips_factor_sets_for_regex_only() {
        let registry = Registry::from_rules(["psiA = 0.6", "SA = g"]).unwrap();
        let selected = registry.select(["&A$"]).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "SA");

        assert!(registry.select(["psiA"]).is_err());
    }

    #[test]
    fn test_ordered_combinations_sorted() {
        let registry = Registry::from_rules(["ULS = g", "ALS = a", "SLS = s"]).unwrap();
        let names: Vec<String> = registry
            .ordered_combinations()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["ALS", "SLS", "ULS"]);
    }

    #[test]
    fn test_duplicate_rule() {
        let err = Registry::from_rules(["A = a", "A = b"]).unwrap_err();
        assert_eq!(err, ComboError::duplicate_rule("A"));
    }

    #[test]
    fn test_eager_resolution() {
        let settings = CompileSettings::default().with_eager(true);
        let registry = Registry::with_settings(["g"], ["ULS = 1.35*g", "SLS = g"], settings).unwrap();
        assert_eq!(registry.state("ULS"), ResolutionState::Resolved);
        assert_eq!(registry.state("SLS"), ResolutionState::Resolved);

        let err = Registry::with_settings(Vec::<String>::new(), ["A = B", "B = A"], settings).unwrap_err();
        assert_eq!(err.error_code(), "CIRCULAR_REFERENCE");
    }

    #[test]
    fn test_failed_resolution_is_retried() {
        let settings = CompileSettings::default().with_max_alternatives(Some(2));
        let registry = Registry::with_settings(Vec::<String>::new(), ["X = (a|b|c)", "Y = a"], settings).unwrap();
        assert!(registry.resolve("X").is_err());
        assert_eq!(registry.state("X"), ResolutionState::Unresolved);
        assert!(registry.resolve("Y").is_ok());
    }

    #[test]
    fn test_options_merge() {
        let mut registry = Registry::from_rules(["ULS1 = g", "ULS2 = g", "SLS = g"]).unwrap();
        registry
            .attach_options("&^ULS", Options::new().with("gamma", 1.0).with("type", "uls"))
            .unwrap();
        registry.attach_options("ULS2", Options::new().with("gamma", 1.1)).unwrap();

        let uls2 = registry.resolve("ULS2").unwrap();
        let options = uls2.options.unwrap();
        assert_eq!(options.get("gamma"), Some(&serde_json::json!(1.1)));
        assert_eq!(options.get("type"), Some(&serde_json::json!("uls")));

        assert!(registry.resolve("SLS").unwrap().options.is_none());
    }

    #[test]
    fn test_empty_expression_alternative() {
        let registry = Registry::from_rules(["X = a - a"]).unwrap();
        let x = registry.resolve("X").unwrap();
        assert_eq!(x.alternatives, vec![LoadCase::new()]);
        assert_eq!(registry.ordered_combinations().unwrap().len(), 1);
    }
}
