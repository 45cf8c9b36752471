use super::{FilterTable, SubsetFilter, is_new_scope};
use crate::core::domain::ProviderError;
use crate::core::models::assignment::Assignment;
use crate::core::models::subset::Subset;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct ForbiddenTerm {
    scope: Subset,
    tuples: Arc<HashSet<Assignment>>,
}

/// Rejects explicitly listed joint states of small scopes.
///
/// Each tuple follows the canonical order of its scope.
#[derive(Debug, Default, Clone)]
pub struct ForbiddenTuplesFilterTable {
    terms: Vec<ForbiddenTerm>,
}

impl ForbiddenTuplesFilterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_term(&mut self, scope: Subset, tuples: impl IntoIterator<Item = Assignment>) {
        let tuples: HashSet<Assignment> = tuples.into_iter().collect();
        match self.terms.iter_mut().find(|t| t.scope == scope) {
            Some(term) => {
                let mut merged = (*term.tuples).clone();
                merged.extend(tuples);
                term.tuples = Arc::new(merged);
            }
            None => self.terms.push(ForbiddenTerm {
                scope,
                tuples: Arc::new(tuples),
            }),
        }
    }

    fn applicable(&self, subset: &Subset, excluded: &[Subset]) -> Vec<ForbiddenCheck> {
        self.terms
            .iter()
            .filter(|t| is_new_scope(&t.scope, subset, excluded))
            .filter_map(|t| {
                t.scope
                    .positions_in(subset)
                    .map(|positions| (positions, Arc::clone(&t.tuples)))
            })
            .collect()
    }
}

/// Positions of a term's scope inside the filtered subset, with its forbidden tuples.
type ForbiddenCheck = (Vec<usize>, Arc<HashSet<Assignment>>);

#[derive(Debug)]
struct ForbiddenTuplesFilter {
    checks: Vec<ForbiddenCheck>,
}

impl SubsetFilter for ForbiddenTuplesFilter {
    fn is_valid(&self, assignment: &Assignment) -> bool {
        self.checks
            .iter()
            .all(|(positions, tuples)| !tuples.contains(&assignment.project(positions)))
    }
}

impl FilterTable for ForbiddenTuplesFilterTable {
    fn filter(
        &self,
        subset: &Subset,
        excluded: &[Subset],
    ) -> Result<Option<Arc<dyn SubsetFilter>>, ProviderError> {
        let checks = self.applicable(subset, excluded);
        if checks.is_empty() {
            return Ok(None);
        }
        Ok(Some(Arc::new(ForbiddenTuplesFilter { checks })))
    }

    fn strength(&self, subset: &Subset, excluded: &[Subset]) -> f64 {
        let count = self.applicable(subset, excluded).len();
        1.0 - 0.5f64.powi(count as i32)
    }

    fn interactions(&self) -> Vec<Subset> {
        self.terms.iter().map(|t| t.scope.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filters::test_utils::variable_ids;

    #[test]
    fn rejects_listed_tuples_only() {
        let v = variable_ids(3);
        let mut table = ForbiddenTuplesFilterTable::new();
        table.add_term(
            Subset::new(vec![v[0], v[2]]),
            [Assignment::new(vec![1, 1])],
        );
        let filter = table.filter(&Subset::new(v.clone()), &[]).unwrap().unwrap();
        assert!(!filter.is_valid(&Assignment::new(vec![1, 0, 1])));
        assert!(filter.is_valid(&Assignment::new(vec![1, 0, 0])));
        assert_eq!(
            filter.next_valid_state(2, &Assignment::new(vec![1, 0, 1])),
            Some(2)
        );
    }

    #[test]
    fn terms_outside_subset_or_already_checked_are_ignored() {
        let v = variable_ids(3);
        let mut table = ForbiddenTuplesFilterTable::new();
        let scope = Subset::new(vec![v[0], v[1]]);
        table.add_term(scope.clone(), [Assignment::new(vec![0, 0])]);

        assert!(table.filter(&Subset::new(vec![v[0], v[2]]), &[]).unwrap().is_none());
        assert!(table
            .filter(&Subset::new(v.clone()), &[scope.clone()])
            .unwrap()
            .is_none());
        assert_eq!(table.interactions(), vec![scope]);
    }

    #[test]
    fn add_term_merges_tuples_of_same_scope() {
        let v = variable_ids(2);
        let mut table = ForbiddenTuplesFilterTable::new();
        let scope = Subset::new(v.clone());
        table.add_term(scope.clone(), [Assignment::new(vec![0, 0])]);
        table.add_term(scope.clone(), [Assignment::new(vec![1, 1])]);
        let filter = table.filter(&scope, &[]).unwrap().unwrap();
        assert!(!filter.is_valid(&Assignment::new(vec![0, 0])));
        assert!(!filter.is_valid(&Assignment::new(vec![1, 1])));
        assert!((table.strength(&scope, &[]) - 0.5).abs() < 1e-12);
    }
}
