use super::cache::{FilterCache, FilterList};
use super::cancel::CancellationToken;
use super::config::SolveConfig;
use super::error::EngineError;
use super::progress::ProgressReporter;
use crate::core::filters::collect_filters;
use crate::core::models::assignment::Assignment;
use crate::core::models::ids::VariableId;
use crate::core::models::subset::Subset;
use crate::core::problem::Problem;
use std::collections::HashMap;
use tracing::debug;

/// The states a variable may take during one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainView {
    /// Every state in `0..n`.
    Range(usize),
    /// Only the given state.
    Fixed(usize),
}

impl DomainView {
    #[inline]
    pub fn len(&self) -> usize {
        match *self {
            DomainView::Range(n) => n,
            DomainView::Fixed(_) => 1,
        }
    }

    /// The state behind the `digit`-th entry of the view.
    #[inline]
    pub fn state(&self, digit: usize) -> usize {
        match *self {
            DomainView::Range(_) => digit,
            DomainView::Fixed(state) => state,
        }
    }

    /// The first entry whose state is at least `state`.
    pub fn digit_at_or_after(&self, state: usize) -> Option<usize> {
        match *self {
            DomainView::Range(n) => (state < n).then_some(state),
            DomainView::Fixed(fixed) => (state <= fixed).then_some(0),
        }
    }
}

/// Everything the tasks of one query share.
pub struct SearchContext<'a> {
    pub problem: &'a Problem,
    pub config: &'a SolveConfig,
    pub reporter: &'a ProgressReporter<'a>,
    cancel: &'a CancellationToken,
    domains: HashMap<VariableId, DomainView>,
    cache: FilterCache,
}

impl<'a> SearchContext<'a> {
    /// Resolves the domain of every queried variable, collapsing fixed ones.
    pub fn new(
        problem: &'a Problem,
        config: &'a SolveConfig,
        reporter: &'a ProgressReporter<'a>,
        cancel: &'a CancellationToken,
        variables: &Subset,
    ) -> Result<Self, EngineError> {
        let mut domains = HashMap::with_capacity(variables.len());
        for variable in variables {
            let num_states = problem.domains().num_states(variable)?;
            if num_states == 0 {
                return Err(EngineError::EmptyDomain { variable });
            }
            let view = match config.fixed.get(&variable) {
                Some(&state) if state >= num_states => {
                    return Err(EngineError::FixedStateOutOfRange {
                        variable,
                        state,
                        num_states,
                    });
                }
                Some(&state) => DomainView::Fixed(state),
                None => DomainView::Range(num_states),
            };
            domains.insert(variable, view);
        }
        for variable in config.fixed.keys().filter(|v| !variables.contains(**v)) {
            debug!(?variable, "Ignoring fixed variable outside the query");
        }

        Ok(Self {
            problem,
            config,
            reporter,
            cancel,
            domains,
            cache: FilterCache::new(config.cache_filters),
        })
    }

    pub fn domain(&self, variable: VariableId) -> Result<DomainView, EngineError> {
        self.domains.get(&variable).copied().ok_or_else(|| {
            EngineError::Internal(format!("variable {:?} is not part of the query", variable))
        })
    }

    /// Filters for `subset` given the already filtered `excluded` parts.
    pub fn filters(&self, subset: &Subset, excluded: &[Subset]) -> Result<FilterList, EngineError> {
        self.cache.get_or_try_insert_with(subset, excluded, || {
            collect_filters(self.problem.filter_tables(), subset, excluded)
                .map_err(EngineError::from)
        })
    }

    pub fn strength(&self, subset: &Subset, excluded: &[Subset]) -> f64 {
        self.problem
            .filter_tables()
            .iter()
            .map(|t| t.strength(subset, excluded))
            .sum()
    }

    #[inline]
    pub fn has_scores(&self) -> bool {
        !self.problem.score_tables().is_empty()
    }

    /// Score of the terms new to `subset` given `excluded`.
    pub fn score(
        &self,
        subset: &Subset,
        excluded: &[Subset],
        assignment: &Assignment,
    ) -> Result<f64, EngineError> {
        let mut total = 0.0;
        for table in self.problem.score_tables() {
            let score = table.score(subset, excluded, assignment)?;
            if score.is_nan() || score < 0.0 {
                return Err(EngineError::InvalidScore {
                    subset: subset.clone(),
                    score,
                });
            }
            total += score;
        }
        Ok(total)
    }

    #[inline]
    pub fn check_cancelled(&self) -> Result<(), EngineError> {
        if self.cancel.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }

    #[inline]
    pub fn max_states(&self) -> usize {
        self.config.max_states
    }

    #[inline]
    pub fn score_ceiling(&self) -> f64 {
        self.config.score_ceiling
    }
}
