use crate::engine::state::ScoredAssignment;
use crate::engine::table::ScoredAssignmentSet;
use tracing::debug;

/// Keeps the `max_states` best entries of `set`, ties broken by assignment.
pub fn keep_best(set: ScoredAssignmentSet, max_states: usize) -> ScoredAssignmentSet {
    if set.len() <= max_states {
        return set;
    }
    let before = set.len();
    let mut items: Vec<ScoredAssignment> = set
        .iter()
        .map(|(a, s)| ScoredAssignment::new(a.clone(), s))
        .collect();
    if max_states > 0 {
        items.select_nth_unstable(max_states - 1);
    }
    items.truncate(max_states);
    debug!(before, after = items.len(), "Truncated node table");
    items
        .into_iter()
        .map(|item| (item.assignment, item.score))
        .collect()
}
