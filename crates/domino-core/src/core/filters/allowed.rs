use super::{FilterTable, SubsetFilter};
use crate::core::domain::ProviderError;
use crate::core::models::assignment::Assignment;
use crate::core::models::ids::VariableId;
use crate::core::models::subset::Subset;
use std::collections::{BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::Arc;

/// Maintains an explicit list of the states each variable is allowed to take.
///
/// Variables without an entry are unrestricted.
#[derive(Debug, Default, Clone)]
pub struct AllowedStatesFilterTable {
    allowed: HashMap<VariableId, Arc<BTreeSet<usize>>>,
}

impl AllowedStatesFilterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the allowed states of `variable`.
    pub fn set_allowed_states(
        &mut self,
        variable: VariableId,
        states: impl IntoIterator<Item = usize>,
    ) {
        self.allowed
            .insert(variable, Arc::new(states.into_iter().collect()));
    }

    /// Narrows the allowed states of `variable` to those also in `states`.
    pub fn intersect(&mut self, variable: VariableId, states: impl IntoIterator<Item = usize>) {
        let incoming: BTreeSet<usize> = states.into_iter().collect();
        let narrowed = match self.allowed.get(&variable) {
            Some(current) => current.intersection(&incoming).copied().collect(),
            None => incoming,
        };
        self.allowed.insert(variable, Arc::new(narrowed));
    }

    pub fn allowed_states(&self, variable: VariableId) -> Option<&BTreeSet<usize>> {
        self.allowed.get(&variable).map(|s| s.as_ref())
    }

    fn new_positions(
        &self,
        subset: &Subset,
        excluded: &[Subset],
    ) -> Vec<(usize, Arc<BTreeSet<usize>>)> {
        subset
            .iter()
            .enumerate()
            .filter(|(_, v)| !excluded.iter().any(|e| e.contains(*v)))
            .filter_map(|(pos, v)| self.allowed.get(&v).map(|s| (pos, Arc::clone(s))))
            .collect()
    }
}

#[derive(Debug)]
struct AllowedStatesFilter {
    entries: Vec<(usize, Arc<BTreeSet<usize>>)>,
}

impl SubsetFilter for AllowedStatesFilter {
    fn is_valid(&self, assignment: &Assignment) -> bool {
        self.entries
            .iter()
            .all(|(pos, allowed)| allowed.contains(&assignment[*pos]))
    }

    fn next_valid_state(&self, pos: usize, assignment: &Assignment) -> Option<usize> {
        let current = assignment[pos];
        match self.entries.iter().find(|(p, _)| *p == pos) {
            Some((_, allowed)) => allowed
                .range((Bound::Excluded(current), Bound::Unbounded))
                .next()
                .copied(),
            None => Some(current + 1),
        }
    }
}

impl FilterTable for AllowedStatesFilterTable {
    fn filter(
        &self,
        subset: &Subset,
        excluded: &[Subset],
    ) -> Result<Option<Arc<dyn SubsetFilter>>, ProviderError> {
        let entries = self.new_positions(subset, excluded);
        if entries.is_empty() {
            return Ok(None);
        }
        Ok(Some(Arc::new(AllowedStatesFilter { entries })))
    }

    fn strength(&self, subset: &Subset, excluded: &[Subset]) -> f64 {
        let count = self.new_positions(subset, excluded).len();
        1.0 - 0.5f64.powi(count as i32)
    }
}
