use super::{FilterTable, SubsetFilter, is_new_scope};
use crate::core::domain::ProviderError;
use crate::core::models::assignment::Assignment;
use crate::core::models::subset::Subset;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct AllowedTerm {
    scope: Subset,
    tuples: Arc<HashSet<Assignment>>,
}

/// Restricts small scopes to an explicit list of joint states.
///
/// Given `(a, b)` with `[(0, 1), (3, 4)]`, the pair may only take `(0, 1)` or `(3, 4)`.
/// The states of single variables are left to other tables. Each tuple follows the
/// canonical order of its scope.
#[derive(Debug, Default, Clone)]
pub struct AllowedTuplesFilterTable {
    terms: Vec<AllowedTerm>,
}

impl AllowedTuplesFilterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the allowed joint states of `scope`.
    pub fn set_allowed_tuples(
        &mut self,
        scope: Subset,
        tuples: impl IntoIterator<Item = Assignment>,
    ) {
        let tuples = Arc::new(tuples.into_iter().collect());
        match self.terms.iter_mut().find(|t| t.scope == scope) {
            Some(term) => term.tuples = tuples,
            None => self.terms.push(AllowedTerm { scope, tuples }),
        }
    }

    fn applicable(&self, subset: &Subset, excluded: &[Subset]) -> Vec<AllowedCheck> {
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

type AllowedCheck = (Vec<usize>, Arc<HashSet<Assignment>>);

#[derive(Debug)]
struct AllowedTuplesFilter {
    checks: Vec<AllowedCheck>,
}

impl AllowedTuplesFilter {
    /// Smallest state above the current one at `pos` that completes a listed tuple.
    fn next_for_check(
        (positions, tuples): &AllowedCheck,
        pos: usize,
        assignment: &Assignment,
    ) -> Option<usize> {
        let slot = positions.iter().position(|&p| p == pos)?;
        let current = assignment[pos];
        tuples
            .iter()
            .filter(|tuple| {
                positions
                    .iter()
                    .enumerate()
                    .all(|(i, &p)| i == slot || tuple[i] == assignment[p])
            })
            .map(|tuple| tuple[slot])
            .filter(|&state| state > current)
            .min()
    }
}

impl SubsetFilter for AllowedTuplesFilter {
    fn is_valid(&self, assignment: &Assignment) -> bool {
        self.checks
            .iter()
            .all(|(positions, tuples)| tuples.contains(&assignment.project(positions)))
    }

    fn next_valid_state(&self, pos: usize, assignment: &Assignment) -> Option<usize> {
        let mut next = assignment[pos] + 1;
        for check in &self.checks {
            let (positions, tuples) = check;
            if tuples.contains(&assignment.project(positions)) {
                continue;
            }
            // a failing term that does not involve `pos` fails for every state of it
            next = next.max(Self::next_for_check(check, pos, assignment)?);
        }
        Some(next)
    }
}

impl FilterTable for AllowedTuplesFilterTable {
    fn filter(
        &self,
        subset: &Subset,
        excluded: &[Subset],
    ) -> Result<Option<Arc<dyn SubsetFilter>>, ProviderError> {
        let checks = self.applicable(subset, excluded);
        if checks.is_empty() {
            return Ok(None);
        }
        Ok(Some(Arc::new(AllowedTuplesFilter { checks })))
    }

    fn strength(&self, subset: &Subset, excluded: &[Subset]) -> f64 {
        let count = self.applicable(subset, excluded).len();
        1.0 - 0.5f64.powi(count as i32)
    }

    fn interactions(&self) -> Vec<Subset> {
        self.terms.iter().map(|t| t.scope.clone()).collect()
    }
}
