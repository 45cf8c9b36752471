use super::ScoreTable;
use crate::core::domain::ProviderError;
use crate::core::filters::{FilterTable, SubsetFilter, is_new_scope};
use crate::core::models::assignment::Assignment;
use crate::core::models::subset::Subset;
use std::collections::HashMap;
use std::sync::Arc;

/// One score term: a lookup table over the joint states of `scope`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTerm {
    pub scope: Subset,
    pub entries: HashMap<Assignment, f64>,
    /// Score of every tuple without an explicit entry.
    pub default: f64,
    /// Tuples scoring above this are infeasible.
    pub max: Option<f64>,
}

impl ScoreTerm {
    pub fn new(scope: Subset, default: f64) -> Self {
        Self {
            scope,
            entries: HashMap::new(),
            default,
            max: None,
        }
    }

    pub fn with_entry(mut self, states: Vec<usize>, score: f64) -> Self {
        self.entries.insert(Assignment::new(states), score);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    #[inline]
    pub fn evaluate(&self, tuple: &Assignment) -> f64 {
        self.entries.get(tuple).copied().unwrap_or(self.default)
    }
}

/// Score table backed by explicit per-tuple scores.
///
/// Terms carrying a `max` double as a filter table, so the same table can be registered
/// with a [`Problem`](crate::core::problem::Problem) both as scores and as filters.
///
/// By default every limit is hard. With [`with_max_violations`](Self::with_max_violations)
/// an assignment may exceed up to that many limits; each filter then counts the violated
/// limits of every term inside its scope, not only the new ones, since the count only grows
/// as variables are added.
#[derive(Debug, Default, Clone)]
pub struct TabulatedScoreTable {
    terms: Vec<Arc<ScoreTerm>>,
    max_violations: Option<usize>,
}

impl TabulatedScoreTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_term(&mut self, term: ScoreTerm) {
        self.terms.push(Arc::new(term));
    }

    pub fn with_term(mut self, term: ScoreTerm) -> Self {
        self.add_term(term);
        self
    }

    /// Lets an assignment exceed up to `max_violations` term limits.
    pub fn with_max_violations(mut self, max_violations: usize) -> Self {
        self.max_violations = Some(max_violations);
        self
    }

    pub fn max_violations(&self) -> Option<usize> {
        self.max_violations
    }

    pub fn terms(&self) -> impl Iterator<Item = &ScoreTerm> {
        self.terms.iter().map(|t| t.as_ref())
    }

    pub fn has_limits(&self) -> bool {
        self.terms.iter().any(|t| t.max.is_some())
    }

    fn applicable<'a, 'b>(
        &'a self,
        subset: &'b Subset,
        excluded: &'b [Subset],
    ) -> impl Iterator<Item = &'a Arc<ScoreTerm>> + use<'a, 'b> {
        self.terms
            .iter()
            .filter(move |t| is_new_scope(&t.scope, subset, excluded))
    }

    /// Limited terms the filter for `subset` has to look at.
    fn limited_terms(&self, subset: &Subset, excluded: &[Subset]) -> Vec<&Arc<ScoreTerm>> {
        match self.max_violations {
            None => self
                .applicable(subset, excluded)
                .filter(|t| t.max.is_some())
                .collect(),
            Some(_) => {
                let inside: Vec<_> = self
                    .terms
                    .iter()
                    .filter(|t| t.max.is_some() && t.scope.is_subset_of(subset))
                    .collect();
                // one excluded part already counted all of them
                let counted = excluded
                    .iter()
                    .any(|e| inside.iter().all(|t| t.scope.is_subset_of(e)));
                if counted { Vec::new() } else { inside }
            }
        }
    }
}

impl ScoreTable for TabulatedScoreTable {
    fn score(
        &self,
        subset: &Subset,
        excluded: &[Subset],
        assignment: &Assignment,
    ) -> Result<f64, ProviderError> {
        let mut total = 0.0;
        for term in self.applicable(subset, excluded) {
            let positions = term
                .scope
                .positions_in(subset)
                .ok_or("score term scope is not inside the scored subset")?;
            total += term.evaluate(&assignment.project(&positions));
        }
        Ok(total)
    }

    fn interactions(&self) -> Vec<Subset> {
        self.terms.iter().map(|t| t.scope.clone()).collect()
    }
}

#[derive(Debug)]
struct ScoreLimitFilter {
    limits: Vec<(Vec<usize>, Arc<ScoreTerm>)>,
    allowed_violations: usize,
}

impl SubsetFilter for ScoreLimitFilter {
    fn is_valid(&self, assignment: &Assignment) -> bool {
        let mut violations = 0;
        for (positions, term) in &self.limits {
            if let Some(max) = term.max {
                if term.evaluate(&assignment.project(positions)) > max {
                    violations += 1;
                    if violations > self.allowed_violations {
                        return false;
                    }
                }
            }
        }
        true
    }
}

impl FilterTable for TabulatedScoreTable {
    fn filter(
        &self,
        subset: &Subset,
        excluded: &[Subset],
    ) -> Result<Option<Arc<dyn SubsetFilter>>, ProviderError> {
        let limits: Vec<_> = self
            .limited_terms(subset, excluded)
            .into_iter()
            .filter_map(|t| t.scope.positions_in(subset).map(|p| (p, Arc::clone(t))))
            .collect();
        if limits.is_empty() {
            return Ok(None);
        }
        Ok(Some(Arc::new(ScoreLimitFilter {
            limits,
            allowed_violations: self.max_violations.unwrap_or(0),
        })))
    }

    fn strength(&self, subset: &Subset, excluded: &[Subset]) -> f64 {
        let count = self
            .applicable(subset, excluded)
            .filter(|t| t.max.is_some())
            .count();
        1.0 - 0.5f64.powi(count as i32)
    }

    fn interactions(&self) -> Vec<Subset> {
        ScoreTable::interactions(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filters::test_utils::variable_ids;
    use crate::core::models::ids::VariableId;
    use itertools::Itertools;

    fn table_over_three() -> (Vec<VariableId>, TabulatedScoreTable) {
        let v = variable_ids(3);
        let table = TabulatedScoreTable::new()
            .with_term(
                ScoreTerm::new(Subset::new(vec![v[0], v[1]]), 1.0).with_entry(vec![0, 0], 0.0),
            )
            .with_term(
                ScoreTerm::new(Subset::new(vec![v[1], v[2]]), 2.0)
                    .with_entry(vec![1, 1], 5.0)
                    .with_max(4.0),
            );
        (v, table)
    }

    #[test]
    fn score_sums_terms_inside_subset() {
        let (v, table) = table_over_three();
        let all = Subset::new(v.clone());
        let score = table
            .score(&all, &[], &Assignment::new(vec![0, 0, 0]))
            .unwrap();
        assert_eq!(score, 2.0);

        let pair = Subset::new(vec![v[0], v[1]]);
        let score = table.score(&pair, &[], &Assignment::new(vec![1, 0])).unwrap();
        assert_eq!(score, 1.0);
    }

    #[test]
    fn score_skips_terms_covered_by_excluded() {
        let (v, table) = table_over_three();
        let all = Subset::new(v.clone());
        let excluded = [Subset::new(vec![v[0], v[1]])];
        let score = table
            .score(&all, &excluded, &Assignment::new(vec![1, 0, 0]))
            .unwrap();
        assert_eq!(score, 2.0);
    }

    #[test]
    fn terms_with_max_act_as_filters() {
        let (v, table) = table_over_three();
        assert!(table.has_limits());
        let all = Subset::new(v.clone());
        let filter = table.filter(&all, &[]).unwrap().unwrap();
        assert!(filter.is_valid(&Assignment::new(vec![0, 1, 0])));
        assert!(!filter.is_valid(&Assignment::new(vec![0, 1, 1])));

        let pair = Subset::new(vec![v[0], v[1]]);
        assert!(table.filter(&pair, &[]).unwrap().is_none());
        assert!((table.strength(&all, &[]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn interactions_report_every_scope() {
        let (v, table) = table_over_three();
        assert_eq!(
            ScoreTable::interactions(&table),
            vec![Subset::new(vec![v[0], v[1]]), Subset::new(vec![v[1], v[2]])]
        );
    }

    /// Three pairwise terms that are each violated when both ends take state 1.
    fn budget_table(max_violations: usize) -> (Vec<VariableId>, TabulatedScoreTable) {
        let v = variable_ids(3);
        let mut table = TabulatedScoreTable::new().with_max_violations(max_violations);
        for (a, b) in [(0, 1), (1, 2), (0, 2)] {
            table.add_term(
                ScoreTerm::new(Subset::new(vec![v[a], v[b]]), 0.0)
                    .with_entry(vec![1, 1], 1.0)
                    .with_max(0.5),
            );
        }
        (v, table)
    }

    #[test]
    fn violation_budget_matches_counting_every_combination() {
        for budget in 0..=3 {
            let (v, table) = budget_table(budget);
            let all = Subset::new(v.clone());
            let filter = table.filter(&all, &[]).unwrap().unwrap();
            for states in (0..3).map(|_| 0..2usize).multi_cartesian_product() {
                let ones = states.iter().filter(|&&s| s == 1).count();
                // k variables at state 1 violate k choose 2 of the pairwise limits
                let violated = ones * ones.saturating_sub(1) / 2;
                assert_eq!(
                    filter.is_valid(&Assignment::new(states.clone())),
                    violated <= budget,
                    "budget {} states {:?}",
                    budget,
                    states
                );
            }
        }
    }

    #[test]
    fn violation_budget_counts_terms_from_every_excluded_part() {
        let v = variable_ids(3);
        let left = Subset::new(vec![v[0], v[1]]);
        let right = Subset::new(vec![v[1], v[2]]);
        let all = Subset::new(v.clone());
        let table = TabulatedScoreTable::new()
            .with_max_violations(1)
            .with_term(
                ScoreTerm::new(left.clone(), 0.0)
                    .with_entry(vec![1, 1], 1.0)
                    .with_max(0.5),
            )
            .with_term(
                ScoreTerm::new(right.clone(), 0.0)
                    .with_entry(vec![1, 1], 1.0)
                    .with_max(0.5),
            );

        // a part that already holds every limited term needs no second look
        assert!(table.filter(&all, &[all.clone()]).unwrap().is_none());

        // no term is new to the union, yet the two sides together may exceed the budget
        let filter = table.filter(&all, &[left, right]).unwrap().unwrap();
        assert!(!filter.is_valid(&Assignment::new(vec![1, 1, 1])));
        assert!(filter.is_valid(&Assignment::new(vec![1, 1, 0])));
        assert!(filter.is_valid(&Assignment::new(vec![0, 1, 1])));
    }
}
