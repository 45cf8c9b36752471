use crate::core::models::assignment::Assignment;
use std::cmp::Ordering;

/// An assignment with its cumulative score.
///
/// Ordered by score first (lower is better), then by assignment, so sorting a list of
/// them yields the result order of a query.
#[derive(Debug, Clone)]
pub struct ScoredAssignment {
    pub assignment: Assignment,
    pub score: f64,
}

impl ScoredAssignment {
    pub fn new(assignment: Assignment, score: f64) -> Self {
        Self { assignment, score }
    }
}

impl PartialEq for ScoredAssignment {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for ScoredAssignment {}

impl PartialOrd for ScoredAssignment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredAssignment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.assignment.cmp(&other.assignment))
    }
}
