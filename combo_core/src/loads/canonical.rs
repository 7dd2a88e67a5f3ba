//! Canonicalization of resolved alternative lists
//!
//! Applied once per resolved rule rather than after every operator:
//! same-name terms are summed, zero coefficients removed, and equal
//! alternatives collapsed to their first occurrence.

use std::collections::HashSet;
use std::hash::Hash;

use super::LoadCase;

/// Collapse duplicate items, keeping the position of the first occurrence.
///
/// # Example
/// ```
/// use combo_core::loads::dedup_alternatives;
///
/// assert_eq!(dedup_alternatives(vec![3, 1, 3, 2, 1]), vec![3, 1, 2]);
/// ```
pub fn dedup_alternatives<T: Eq + Hash + Clone>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(items.len());
    items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}

/// Re-assert the per-case invariants and de-duplicate the list.
pub fn canonicalize(alternatives: Vec<LoadCase>) -> Vec<LoadCase> {
    let cases = alternatives.into_iter().map(canonical_case).collect();
    dedup_alternatives(cases)
}

fn canonical_case(case: LoadCase) -> LoadCase {
    // Rebuilding through add_term merges and drops zeros again.
    let rebuilt: LoadCase = case.iter().collect();
    debug_assert_eq!(rebuilt, case, "load case stored a zero or duplicate term");
    rebuilt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_keeps_first_occurrence_order() {
        let a = LoadCase::single("A", 1.0);
        let b = LoadCase::single("B", 1.0);
        let c = LoadCase::new().with_term("A", 1.0).with_term("B", 1.0);

        let result = canonicalize(vec![b.clone(), a.clone(), b.clone(), c.clone(), a.clone()]);
        assert_eq!(result, vec![b, a, c]);
    }

    #[test]
    fn test_dedup_is_content_based() {
        let first = LoadCase::new().with_term("x", 2.0).with_term("y", 0.5);
        let second = LoadCase::new().with_term("y", 0.5).with_term("x", 1.0).with_term("x", 1.0);

        assert_eq!(canonicalize(vec![first.clone(), second]), vec![first]);
    }

    #[test]
    fn test_empty_cases_collapse() {
        let result = canonicalize(vec![LoadCase::new(), LoadCase::single("q", 0.0), LoadCase::new()]);
        assert_eq!(result, vec![LoadCase::new()]);
    }

    #[test]
    fn test_no_zero_after_canonicalize() {
        let result = canonicalize(vec![LoadCase::single("g", 1.0).with_term("g", -1.0).with_term("q", 3.0)]);
        assert!(result.iter().all(|case| case.iter().all(|(_, c)| c != 0.0)));
    }
}
