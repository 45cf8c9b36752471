use super::ordering::greedy_order;
use crate::core::filters::SubsetFilter;
use crate::core::models::assignment::Assignment;
use crate::core::models::ids::VariableId;
use crate::core::models::subset::Subset;
use crate::engine::cache::FilterList;
use crate::engine::context::{DomainView, SearchContext};
use crate::engine::error::EngineError;
use crate::engine::table::ScoredAssignmentSet;
use itertools::Itertools;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// One variable of the enumeration order together with the filter group of its prefix.
struct Level {
    variable: VariableId,
    domain: DomainView,
    /// The first `k` ordered variables, `k` being this level's depth plus one.
    prefix: Subset,
    /// The prefix one level up, already checked.
    excluded: Vec<Subset>,
    /// For each canonical position of `prefix`, the level that holds its variable.
    sources: Vec<usize>,
    /// Canonical position of `variable` inside `prefix`.
    position: usize,
    filters: FilterList,
}

enum Verdict {
    Accept,
    /// Rejected; the next state worth trying for the level's variable, if any.
    Skip(Option<usize>),
}

fn single_empty_assignment() -> ScoredAssignmentSet {
    let mut found = ScoredAssignmentSet::with_capacity(1);
    found.insert_min(Assignment::empty(), 0.0);
    found
}

fn build_levels(context: &SearchContext, order: &[VariableId]) -> Result<Vec<Level>, EngineError> {
    let mut levels: Vec<Level> = Vec::with_capacity(order.len());
    let mut previous = Subset::empty();
    for (depth, &variable) in order.iter().enumerate() {
        let prefix = previous.union(&Subset::singleton(variable));
        let excluded = if previous.is_empty() {
            Vec::new()
        } else {
            vec![previous.clone()]
        };
        let sources = prefix
            .iter()
            .map(|v| {
                order[..=depth]
                    .iter()
                    .position(|&o| o == v)
                    .ok_or_else(|| EngineError::Internal(format!("{:?} missing from order", v)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let position = prefix
            .index_of(variable)
            .ok_or_else(|| EngineError::Internal(format!("{:?} missing from prefix", variable)))?;
        let filters = context.filters(&prefix, &excluded)?;
        levels.push(Level {
            variable,
            domain: context.domain(variable)?,
            prefix: prefix.clone(),
            excluded,
            sources,
            position,
            filters,
        });
        previous = prefix;
    }
    Ok(levels)
}

fn check(filters: &[Arc<dyn SubsetFilter>], position: usize, assignment: &Assignment) -> Verdict {
    let current = assignment[position];
    let mut rejected = false;
    let mut next = current + 1;
    for filter in filters {
        if filter.is_valid(assignment) {
            continue;
        }
        rejected = true;
        match filter.next_valid_state(position, assignment) {
            None => return Verdict::Skip(None),
            Some(state) if state <= current => {
                warn!(
                    ?filter,
                    state, current, "Filter proposed a state that does not advance; stepping by one"
                );
            }
            Some(state) => next = next.max(state),
        }
    }
    if rejected {
        Verdict::Skip(Some(next))
    } else {
        Verdict::Accept
    }
}

/// Enumerates the admissible assignments of `subset` by ordered branch-and-bound.
///
/// Variables are ordered greedily by filter strength. Each prefix of the order has its own
/// filter group (the prefix, with the previous prefix excluded), so a partial assignment is
/// dropped as soon as a constraint between already assigned variables fails. Rejected
/// states are skipped ahead using the filters' hints, and prefixes whose accumulated score
/// already exceeds the ceiling are dropped as well.
///
/// The returned assignments follow the canonical order of `subset`.
#[instrument(skip_all, name = "branch_and_bound", fields(variables = subset.len()))]
pub fn branch_and_bound(
    context: &SearchContext,
    subset: &Subset,
) -> Result<ScoredAssignmentSet, EngineError> {
    if subset.is_empty() {
        return Ok(single_empty_assignment());
    }

    let order = greedy_order(context.problem.filter_tables(), subset);
    let levels = build_levels(context, &order)?;
    let depth = levels.len();
    let max_states = context.max_states();
    let ceiling = context.score_ceiling();
    let scored = context.has_scores();

    let mut digits = vec![0usize; depth];
    let mut prefix_scores = vec![0.0f64; depth + 1];
    let mut found = ScoredAssignmentSet::new();
    let mut last_emitted: Option<Assignment> = None;
    let mut level = 0;

    'search: loop {
        context.check_cancelled()?;
        let current = &levels[level];
        let assignment: Assignment = current
            .sources
            .iter()
            .map(|&l| levels[l].domain.state(digits[l]))
            .collect();
        let state = assignment[current.position];

        let next_state = match check(&current.filters, current.position, &assignment) {
            Verdict::Skip(next) => next,
            Verdict::Accept => {
                let delta = if scored {
                    context.score(&current.prefix, &current.excluded, &assignment)?
                } else {
                    0.0
                };
                let total = prefix_scores[level] + delta;
                if total > ceiling {
                    Some(state + 1)
                } else if level + 1 < depth {
                    prefix_scores[level + 1] = total;
                    level += 1;
                    digits[level] = 0;
                    continue 'search;
                } else {
                    if found.len() >= max_states {
                        return Err(EngineError::TooManyStates {
                            subset: subset.clone(),
                            max_states,
                            last_state: last_emitted.unwrap_or(assignment),
                        });
                    }
                    found.insert_min(assignment.clone(), total);
                    last_emitted = Some(assignment);
                    Some(state + 1)
                }
            }
        };

        let mut next_digit = next_state.and_then(|s| levels[level].domain.digit_at_or_after(s));
        loop {
            if let Some(digit) = next_digit {
                digits[level] = digit;
                break;
            }
            if level == 0 {
                break 'search;
            }
            level -= 1;
            let domain = levels[level].domain;
            next_digit = domain.digit_at_or_after(domain.state(digits[level]) + 1);
        }
    }

    debug!(
        states = found.len(),
        first = ?levels.first().map(|l| l.variable),
        "Enumeration finished"
    );
    Ok(found)
}

/// Enumerates `subset` by checking every combination of states against all its filters.
#[instrument(skip_all, name = "exhaustive", fields(variables = subset.len()))]
pub fn exhaustive(
    context: &SearchContext,
    subset: &Subset,
) -> Result<ScoredAssignmentSet, EngineError> {
    if subset.is_empty() {
        return Ok(single_empty_assignment());
    }

    let domains: Vec<DomainView> = subset
        .iter()
        .map(|v| context.domain(v))
        .collect::<Result<_, _>>()?;
    let filters = context.filters(subset, &[])?;
    let max_states = context.max_states();
    let ceiling = context.score_ceiling();
    let scored = context.has_scores();

    let mut found = ScoredAssignmentSet::new();
    let mut last_emitted: Option<Assignment> = None;
    for digits in domains.iter().map(|d| 0..d.len()).multi_cartesian_product() {
        context.check_cancelled()?;
        let assignment: Assignment = digits
            .iter()
            .zip(&domains)
            .map(|(&digit, domain)| domain.state(digit))
            .collect();
        if !filters.iter().all(|f| f.is_valid(&assignment)) {
            continue;
        }
        let score = if scored {
            context.score(subset, &[], &assignment)?
        } else {
            0.0
        };
        if score > ceiling {
            continue;
        }
        if found.len() >= max_states {
            return Err(EngineError::TooManyStates {
                subset: subset.clone(),
                max_states,
                last_state: last_emitted.unwrap_or(assignment),
            });
        }
        found.insert_min(assignment.clone(), score);
        last_emitted = Some(assignment);
    }

    debug!(states = found.len(), "Exhaustive enumeration finished");
    Ok(found)
}
