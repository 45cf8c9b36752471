use super::state::ScoredAssignment;
use crate::core::models::assignment::Assignment;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// The admissible assignments of one node with their cumulative scores.
///
/// An assignment that is absent is infeasible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoredAssignmentSet {
    entries: HashMap<Assignment, f64>,
}

impl ScoredAssignmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Inserts `assignment`, keeping the lower score if it is already present.
    ///
    /// Returns `true` if the stored score changed.
    pub fn insert_min(&mut self, assignment: Assignment, score: f64) -> bool {
        match self.entries.entry(assignment) {
            Entry::Vacant(slot) => {
                slot.insert(score);
                true
            }
            Entry::Occupied(mut slot) if score < *slot.get() => {
                slot.insert(score);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, assignment: &Assignment) -> Option<f64> {
        self.entries.get(assignment).copied()
    }

    pub fn contains(&self, assignment: &Assignment) -> bool {
        self.entries.contains_key(assignment)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Assignment, f64)> {
        self.entries.iter().map(|(a, &s)| (a, s))
    }

    /// All entries, best first.
    pub fn to_sorted_vec(&self) -> Vec<ScoredAssignment> {
        let mut items: Vec<ScoredAssignment> = self
            .entries
            .iter()
            .map(|(a, &s)| ScoredAssignment::new(a.clone(), s))
            .collect();
        items.sort();
        items
    }

    pub fn into_sorted_vec(self) -> Vec<ScoredAssignment> {
        let mut items: Vec<ScoredAssignment> = self
            .entries
            .into_iter()
            .map(|(a, s)| ScoredAssignment::new(a, s))
            .collect();
        items.sort();
        items
    }

    pub fn best(&self) -> Option<ScoredAssignment> {
        self.entries
            .iter()
            .map(|(a, &s)| ScoredAssignment::new(a.clone(), s))
            .min()
    }
}

impl FromIterator<(Assignment, f64)> for ScoredAssignmentSet {
    fn from_iter<I: IntoIterator<Item = (Assignment, f64)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (assignment, score) in iter {
            set.insert_min(assignment, score);
        }
        set
    }
}

impl Extend<(Assignment, f64)> for ScoredAssignmentSet {
    fn extend<I: IntoIterator<Item = (Assignment, f64)>>(&mut self, iter: I) {
        for (assignment, score) in iter {
            self.insert_min(assignment, score);
        }
    }
}
