use super::ids::VariableId;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;

/// Variables that are already resolved, mapped to their fixed state.
pub type PartialAssignment = BTreeMap<VariableId, usize>;

/// One joint choice of a state index per variable of a [`Subset`](super::subset::Subset).
///
/// Entries follow the canonical order of the subset the assignment belongs to. The
/// assignment itself does not know its subset; callers carry the pair together.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Assignment {
    states: Vec<usize>,
}

impl Assignment {
    pub fn new(states: Vec<usize>) -> Self {
        Self { states }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[usize] {
        &self.states
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = usize> + '_ {
        self.states.iter().copied()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<usize> {
        self.states.get(index).copied()
    }

    /// Picks the entries at `positions`, in that order.
    ///
    /// `positions` usually comes from [`Subset::positions_in`](super::subset::Subset::positions_in).
    pub fn project(&self, positions: &[usize]) -> Assignment {
        Assignment {
            states: positions.iter().map(|&p| self.states[p]).collect(),
        }
    }

    pub fn into_vec(self) -> Vec<usize> {
        self.states
    }
}

impl Index<usize> for Assignment {
    type Output = usize;

    fn index(&self, index: usize) -> &Self::Output {
        &self.states[index]
    }
}

impl From<Vec<usize>> for Assignment {
    fn from(states: Vec<usize>) -> Self {
        Self::new(states)
    }
}

impl FromIterator<usize> for Assignment {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, s) in self.states.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", s)?;
        }
        write!(f, ")")
    }
}
