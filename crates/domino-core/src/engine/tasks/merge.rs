use super::truncation::keep_best;
use crate::core::models::assignment::Assignment;
use crate::core::models::subset::Subset;
use crate::engine::config::TruncationPolicy;
use crate::engine::context::SearchContext;
use crate::engine::error::EngineError;
use crate::engine::table::ScoredAssignmentSet;
use std::collections::HashMap;
use tracing::{debug, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One side of a merge: a node's scope and its table.
#[derive(Clone, Copy)]
pub struct MergeInput<'t> {
    pub subset: &'t Subset,
    pub table: &'t ScoredAssignmentSet,
}

/// Entries of the right-hand table grouped by their restriction to the shared variables.
struct JoinGroup<'t> {
    /// Score of the terms lying wholly inside the shared variables.
    shared_score: f64,
    entries: Vec<(&'t Assignment, f64)>,
}

type PairResult = Result<Vec<(Assignment, f64)>, EngineError>;

/// Joins the tables of two sibling nodes on their shared variables.
///
/// Pairs agreeing on the shared variables are combined into an assignment of the union.
/// The combined score counts every term once: both sides' scores, minus the terms inside the
/// shared variables (counted on both sides), plus the terms spanning both sides. Merged
/// assignments failing an edge filter or scoring above the ceiling are dropped, and the
/// result is subject to the truncation policy.
#[instrument(skip_all, name = "merge", fields(left = left.table.len(), right = right.table.len()))]
pub fn merge(
    context: &SearchContext,
    left: MergeInput,
    right: MergeInput,
) -> Result<ScoredAssignmentSet, EngineError> {
    let union = left.subset.union(right.subset);
    let shared = left.subset.intersection(right.subset);
    let sides = [left.subset.clone(), right.subset.clone()];

    let positions = |part: &Subset, whole: &Subset| {
        part.positions_in(whole).ok_or_else(|| {
            EngineError::Internal(format!("{} is not contained in {}", part, whole))
        })
    };
    let left_in_union = positions(left.subset, &union)?;
    let right_in_union = positions(right.subset, &union)?;
    let shared_in_left = positions(&shared, left.subset)?;
    let shared_in_right = positions(&shared, right.subset)?;

    let edge_filters = context.filters(&union, &sides)?;
    let scored = context.has_scores();
    let ceiling = context.score_ceiling();

    let mut groups: HashMap<Assignment, JoinGroup> = HashMap::new();
    for (assignment, score) in right.table.iter() {
        let key = assignment.project(&shared_in_right);
        if let Some(group) = groups.get_mut(&key) {
            group.entries.push((assignment, score));
            continue;
        }
        let shared_score = if scored {
            context.score(&shared, &[], &key)?
        } else {
            0.0
        };
        groups.insert(
            key,
            JoinGroup {
                shared_score,
                entries: vec![(assignment, score)],
            },
        );
    }

    let join_one = |(assignment, score): (&Assignment, f64)| -> PairResult {
        let key = assignment.project(&shared_in_left);
        let Some(group) = groups.get(&key) else {
            return Ok(Vec::new());
        };
        let mut merged_states = Vec::new();
        for &(other, other_score) in &group.entries {
            context.check_cancelled()?;
            let mut states = vec![0usize; union.len()];
            for (i, &p) in left_in_union.iter().enumerate() {
                states[p] = assignment[i];
            }
            for (i, &p) in right_in_union.iter().enumerate() {
                states[p] = other[i];
            }
            let merged = Assignment::new(states);
            if !edge_filters.iter().all(|f| f.is_valid(&merged)) {
                continue;
            }
            let cross = if scored {
                context.score(&union, &sides, &merged)?
            } else {
                0.0
            };
            let total = (score + other_score - group.shared_score + cross).max(0.0);
            if total > ceiling {
                continue;
            }
            merged_states.push((merged, total));
        }
        Ok(merged_states)
    };

    let left_entries: Vec<(&Assignment, f64)> = left.table.iter().collect();

    #[cfg(not(feature = "parallel"))]
    let iterator = left_entries.into_iter();

    #[cfg(feature = "parallel")]
    let iterator = left_entries.into_par_iter();

    let chunks: Vec<PairResult> = iterator.map(join_one).collect();

    let mut result = ScoredAssignmentSet::new();
    for chunk in chunks {
        result.extend(chunk?);
    }
    debug!(states = result.len(), variables = union.len(), "Merged sibling tables");

    enforce_limit(context, &union, result)
}

/// Applies the truncation policy to a freshly merged table.
fn enforce_limit(
    context: &SearchContext,
    union: &Subset,
    result: ScoredAssignmentSet,
) -> Result<ScoredAssignmentSet, EngineError> {
    let max_states = context.max_states();
    if result.len() <= max_states {
        return Ok(result);
    }
    match context.config.truncation {
        TruncationPolicy::KeepBest => Ok(keep_best(result, max_states)),
        TruncationPolicy::Strict => {
            let mut sorted = result.into_sorted_vec();
            let last = sorted.swap_remove(max_states - 1);
            Err(EngineError::TooManyStates {
                subset: union.clone(),
                max_states,
                last_state: last.assignment,
            })
        }
    }
}
