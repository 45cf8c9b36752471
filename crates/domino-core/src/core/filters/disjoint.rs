use super::{FilterTable, SubsetFilter};
use crate::core::domain::ProviderError;
use crate::core::models::assignment::Assignment;
use crate::core::models::ids::VariableId;
use crate::core::models::subset::Subset;
use petgraph::unionfind::UnionFind;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// The relation enforced between the members of one disjoint set.
///
/// `states` are the states of the members present in the filtered scope, in canonical
/// order; `at` indexes into `states`.
pub trait SetRule: fmt::Debug + Send + Sync + 'static {
    fn is_ok(states: &[usize]) -> bool;

    /// Next state worth trying for the member at `at`, all other members fixed.
    fn next_state(states: &[usize], at: usize) -> Option<usize>;
}

/// Members of a set take pairwise distinct states.
#[derive(Debug)]
pub struct Exclusion;

/// Members of a set all take the same state.
#[derive(Debug)]
pub struct Equality;

/// Members of a set are interchangeable: only non-decreasing state sequences are kept.
#[derive(Debug)]
pub struct Equivalence;

impl SetRule for Exclusion {
    fn is_ok(states: &[usize]) -> bool {
        let mut sorted = states.to_vec();
        sorted.sort_unstable();
        sorted.windows(2).all(|w| w[0] != w[1])
    }

    fn next_state(states: &[usize], at: usize) -> Option<usize> {
        let mut candidate = states[at] + 1;
        while states
            .iter()
            .enumerate()
            .any(|(i, &s)| i != at && s == candidate)
        {
            candidate += 1;
        }
        Some(candidate)
    }
}

impl SetRule for Equality {
    fn is_ok(states: &[usize]) -> bool {
        states.windows(2).all(|w| w[0] == w[1])
    }

    fn next_state(states: &[usize], at: usize) -> Option<usize> {
        let current = states[at];
        let target = states
            .iter()
            .enumerate()
            .find(|(i, _)| *i != at)
            .map(|(_, &s)| s)?;
        (target > current).then_some(target)
    }
}

impl SetRule for Equivalence {
    fn is_ok(states: &[usize]) -> bool {
        states.windows(2).all(|w| w[0] <= w[1])
    }

    fn next_state(states: &[usize], at: usize) -> Option<usize> {
        let current = states[at];
        let lower = states[..at].iter().copied().max().unwrap_or(0);
        let upper = states[at + 1..].iter().copied().min();
        if current < lower {
            Some(lower)
        } else if upper.is_some_and(|u| current > u) {
            None
        } else {
            Some(current + 1)
        }
    }
}

/// Shared machinery for tables whose constraints act on disjoint sets of variables.
///
/// Sets added through [`add_set`](Self::add_set) and [`add_pair`](Self::add_pair) that
/// share a variable are merged.
#[derive(Debug)]
pub struct DisjointSetsFilterTable<R: SetRule> {
    elements: Vec<VariableId>,
    index: HashMap<VariableId, usize>,
    unions: Vec<(usize, usize)>,
    sets: Vec<Subset>,
    rule: PhantomData<R>,
}

pub type ExclusionFilterTable = DisjointSetsFilterTable<Exclusion>;
pub type EqualityFilterTable = DisjointSetsFilterTable<Equality>;
pub type EquivalenceFilterTable = DisjointSetsFilterTable<Equivalence>;

impl<R: SetRule> Default for DisjointSetsFilterTable<R> {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
            index: HashMap::new(),
            unions: Vec::new(),
            sets: Vec::new(),
            rule: PhantomData,
        }
    }
}

impl<R: SetRule> DisjointSetsFilterTable<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_set(&mut self, variables: impl IntoIterator<Item = VariableId>) {
        let members: Vec<usize> = variables.into_iter().map(|v| self.index_of(v)).collect();
        if let Some((&first, rest)) = members.split_first() {
            self.unions.extend(rest.iter().map(|&m| (first, m)));
        }
        self.rebuild_sets();
    }

    pub fn add_pair(&mut self, a: VariableId, b: VariableId) {
        self.add_set([a, b]);
    }

    /// The current sets with at least two members.
    pub fn sets(&self) -> &[Subset] {
        &self.sets
    }

    fn index_of(&mut self, variable: VariableId) -> usize {
        if let Some(&i) = self.index.get(&variable) {
            return i;
        }
        let i = self.elements.len();
        self.elements.push(variable);
        self.index.insert(variable, i);
        i
    }

    fn rebuild_sets(&mut self) {
        let mut uf = UnionFind::<usize>::new(self.elements.len());
        for &(a, b) in &self.unions {
            uf.union(a, b);
        }
        let mut groups: HashMap<usize, Vec<VariableId>> = HashMap::new();
        for (i, &v) in self.elements.iter().enumerate() {
            groups.entry(uf.find(i)).or_default().push(v);
        }
        let mut sets: Vec<Subset> = groups
            .into_values()
            .filter(|members| members.len() > 1)
            .map(Subset::new)
            .collect();
        sets.sort();
        self.sets = sets;
    }

    /// Positions (in `subset`) of the members of every set that needs checking.
    fn relevant_members(&self, subset: &Subset, excluded: &[Subset]) -> Vec<Vec<usize>> {
        self.sets
            .iter()
            .filter_map(|set| {
                let present = set.intersection(subset);
                if present.len() < 2 || excluded.iter().any(|e| present.is_subset_of(e)) {
                    return None;
                }
                present.positions_in(subset)
            })
            .collect()
    }
}

#[derive(Debug)]
struct DisjointSetsFilter<R: SetRule> {
    members: Vec<Vec<usize>>,
    rule: PhantomData<R>,
}

impl<R: SetRule> SubsetFilter for DisjointSetsFilter<R> {
    fn is_valid(&self, assignment: &Assignment) -> bool {
        self.members.iter().all(|positions| {
            let states: Vec<usize> = positions.iter().map(|&p| assignment[p]).collect();
            R::is_ok(&states)
        })
    }

    fn next_valid_state(&self, pos: usize, assignment: &Assignment) -> Option<usize> {
        for positions in &self.members {
            if let Some(at) = positions.iter().position(|&p| p == pos) {
                let states: Vec<usize> = positions.iter().map(|&p| assignment[p]).collect();
                if !R::is_ok(&states) {
                    return R::next_state(&states, at);
                }
            }
        }
        Some(assignment[pos] + 1)
    }
}

impl<R: SetRule> FilterTable for DisjointSetsFilterTable<R> {
    fn filter(
        &self,
        subset: &Subset,
        excluded: &[Subset],
    ) -> Result<Option<Arc<dyn SubsetFilter>>, ProviderError> {
        let members = self.relevant_members(subset, excluded);
        if members.is_empty() {
            return Ok(None);
        }
        Ok(Some(Arc::new(DisjointSetsFilter::<R> {
            members,
            rule: PhantomData,
        })))
    }

    fn strength(&self, subset: &Subset, excluded: &[Subset]) -> f64 {
        let remaining: f64 = self
            .relevant_members(subset, excluded)
            .iter()
            .map(|m| 0.1f64.powi(m.len() as i32))
            .product();
        1.0 - remaining
    }

    fn interactions(&self) -> Vec<Subset> {
        self.sets.clone()
    }
}
