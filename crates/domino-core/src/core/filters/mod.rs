//! Validity filters over subsets of variables.
//!
//! A [`FilterTable`] is asked for a [`SubsetFilter`] for a particular scope. The request
//! also carries the *excluded* subsets: parts of the scope that have already been filtered
//! on their own. A table must only check constraints that involve the scope and are not
//! wholly contained in one of the excluded subsets. For example, asked for `{a, b, c}` with
//! `{a, b}` excluded, a pairwise table only checks the pairs `(a, c)` and `(b, c)`.
//!
//! The assignments handed to a filter follow the canonical order of the scope it was
//! created for.
//!
//! Built-in tables:
//!
//! - [`disjoint::ExclusionFilterTable`] - members of a set take pairwise distinct states
//! - [`disjoint::EqualityFilterTable`] - members of a set share one state
//! - [`disjoint::EquivalenceFilterTable`] - interchangeable members, only one ordering kept
//! - [`allowed::AllowedStatesFilterTable`] - explicit per-variable allowed states
//! - [`forbidden::ForbiddenTuplesFilterTable`] - explicit forbidden joint states
//! - [`allowed_tuples::AllowedTuplesFilterTable`] - explicit allowed joint states
//!
//! Tabulated score terms with a maximum act as filters as well, optionally tolerating a
//! number of violated limits, see
//! [`TabulatedScoreTable`](crate::core::scoring::tabulated::TabulatedScoreTable).

pub mod allowed;
pub mod allowed_tuples;
pub mod disjoint;
pub mod forbidden;

use super::domain::ProviderError;
use super::models::assignment::Assignment;
use super::models::subset::Subset;
use std::fmt;
use std::sync::Arc;

/// A predicate over the assignments of one scope.
pub trait SubsetFilter: fmt::Debug + Send + Sync {
    /// True if `assignment` passes this filter.
    fn is_valid(&self, assignment: &Assignment) -> bool;

    /// The next state worth trying for the variable at `pos`.
    ///
    /// Called only after `is_valid` rejected `assignment`, with every other position
    /// treated as fixed. The answer must be strictly greater than `assignment[pos]` and
    /// must not skip a state that could pass; `None` means no later state of this variable
    /// can pass. The default advances by one.
    fn next_valid_state(&self, pos: usize, assignment: &Assignment) -> Option<usize> {
        Some(assignment[pos] + 1)
    }
}

/// Produces filters on demand for a scope, given the already filtered parts of it.
pub trait FilterTable: fmt::Debug + Send + Sync {
    /// The filter for `subset` given `excluded`, or `None` when nothing needs checking.
    fn filter(
        &self,
        subset: &Subset,
        excluded: &[Subset],
    ) -> Result<Option<Arc<dyn SubsetFilter>>, ProviderError>;

    /// Rough fraction in `[0, 1]` of the joint states of `subset` the filter removes.
    ///
    /// Only used to order variables for enumeration.
    fn strength(&self, subset: &Subset, excluded: &[Subset]) -> f64;

    /// Scopes of the constraints this table knows about, used to derive interaction graphs.
    fn interactions(&self) -> Vec<Subset> {
        Vec::new()
    }
}

/// True if `scope` lies in `subset` and is not wholly covered by one of `excluded`.
///
/// This is the applicability rule every built-in table follows.
pub fn is_new_scope(scope: &Subset, subset: &Subset, excluded: &[Subset]) -> bool {
    scope.is_subset_of(subset) && !excluded.iter().any(|e| scope.is_subset_of(e))
}

/// Collects filters from several tables into one list.
pub fn collect_filters(
    tables: &[Arc<dyn FilterTable>],
    subset: &Subset,
    excluded: &[Subset],
) -> Result<Vec<Arc<dyn SubsetFilter>>, ProviderError> {
    let mut filters = Vec::new();
    for table in tables {
        if let Some(filter) = table.filter(subset, excluded)? {
            filters.push(filter);
        }
    }
    Ok(filters)
}

#[cfg(test)]
pub(crate) mod test_utils {
    use crate::core::models::ids::VariableId;
    use slotmap::SlotMap;

    pub fn variable_ids(n: usize) -> Vec<VariableId> {
        let mut map: SlotMap<VariableId, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }
}
