//! Property-based tests for rule resolution.

use std::collections::HashSet;

use proptest::prelude::*;

use crate::rules::expand::Expander;
use crate::rules::{parse_expression, Registry};

// Strategy for generating rule right-hand sides over a few base cases
fn expression() -> impl Strategy<Value = String> {
    let name = prop::sample::select(vec!["a", "b", "c", "d"]);
    let leaf = prop_oneof![
        name.clone().prop_map(str::to_string),
        (1i32..5, name).prop_map(|(k, n)| format!("{}*{}", k, n)),
    ];
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| format!("({} + {})", l, r)),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| format!("({} - {})", l, r)),
            (inner.clone(), inner).prop_map(|(l, r)| format!("({} | {})", l, r)),
        ]
    })
}

fn registry(lhs: &str, rhs: &str) -> Registry {
    Registry::new(["a", "b", "c", "d"], [format!("L = {}", lhs), format!("R = {}", rhs)]).unwrap()
}

fn count(registry: &Registry, text: &str) -> usize {
    let expr = parse_expression(text).unwrap();
    Expander::new(registry, "P").expand(&expr).unwrap().len()
}

proptest! {
    #[test]
    fn resolution_is_idempotent(lhs in expression()) {
        let registry = registry(&lhs, "a");
        let first = registry.resolve("L").unwrap();
        let second = registry.resolve("L").unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn no_zero_coefficients(lhs in expression()) {
        let registry = registry(&lhs, "a");
        for case in registry.resolve("L").unwrap().iter() {
            prop_assert!(case.iter().all(|(_, c)| c != 0.0));
        }
    }

    #[test]
    fn no_duplicate_alternatives(lhs in expression()) {
        let registry = registry(&lhs, "a");
        let combination = registry.resolve("L").unwrap();
        let distinct: HashSet<_> = combination.iter().collect();
        prop_assert_eq!(distinct.len(), combination.len());
    }

    #[test]
    fn sum_count_is_product(lhs in expression(), rhs in expression()) {
        let registry = registry(&lhs, &rhs);
        let (l, r) = (registry.resolve("L").unwrap().len(), registry.resolve("R").unwrap().len());
        prop_assert_eq!(count(&registry, "L + R"), l * r);
    }

    #[test]
    fn union_count_is_sum(lhs in expression(), rhs in expression()) {
        let registry = registry(&lhs, &rhs);
        let (l, r) = (registry.resolve("L").unwrap().len(), registry.resolve("R").unwrap().len());
        prop_assert_eq!(count(&registry, "L | R"), l + r);
    }

    #[test]
    fn zip_count_is_shared_length(lhs in expression()) {
        let registry = registry(&lhs, "a");
        let l = registry.resolve("L").unwrap().len();
        prop_assert_eq!(count(&registry, "L & L"), l);
        prop_assert_eq!(count(&registry, "L & R"), l);
        prop_assert_eq!(count(&registry, "R & L"), l);
    }

    #[test]
    fn declaration_order_is_irrelevant(lhs in expression(), rhs in expression()) {
        let rules = [format!("L = {}", lhs), format!("R = {}", rhs), "T = 1.5*L + R | L".to_string()];
        let forward = Registry::from_rules(rules.iter()).unwrap();
        let backward = Registry::from_rules(rules.iter().rev()).unwrap();
        prop_assert_eq!(forward.resolve("T").unwrap(), backward.resolve("T").unwrap());
    }
}
