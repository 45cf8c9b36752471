use super::ids::VariableId;
use std::fmt;

/// A duplicate-free, canonically ordered collection of variables.
///
/// Two subsets built from the same variables compare equal regardless of the order in
/// which the variables were supplied, so subsets can be used directly as map keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Subset {
    variables: Vec<VariableId>,
}

impl Subset {
    /// Normalizes the given variables into a subset (sorted, duplicates removed).
    pub fn new(variables: impl IntoIterator<Item = VariableId>) -> Self {
        let mut variables: Vec<VariableId> = variables.into_iter().collect();
        variables.sort_unstable();
        variables.dedup();
        Self { variables }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn singleton(variable: VariableId) -> Self {
        Self {
            variables: vec![variable],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[VariableId] {
        &self.variables
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = VariableId> + '_ {
        self.variables.iter().copied()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<VariableId> {
        self.variables.get(index).copied()
    }

    pub fn contains(&self, variable: VariableId) -> bool {
        self.variables.binary_search(&variable).is_ok()
    }

    /// Position of `variable` in the canonical order.
    pub fn index_of(&self, variable: VariableId) -> Option<usize> {
        self.variables.iter().position(|&v| v == variable)
    }

    pub fn union(&self, other: &Subset) -> Subset {
        let mut merged = Vec::with_capacity(self.len() + other.len());
        let (mut i, mut j) = (0, 0);
        while i < self.len() && j < other.len() {
            let (a, b) = (self.variables[i], other.variables[j]);
            if a < b {
                merged.push(a);
                i += 1;
            } else if b < a {
                merged.push(b);
                j += 1;
            } else {
                merged.push(a);
                i += 1;
                j += 1;
            }
        }
        merged.extend_from_slice(&self.variables[i..]);
        merged.extend_from_slice(&other.variables[j..]);
        Subset { variables: merged }
    }

    pub fn intersection(&self, other: &Subset) -> Subset {
        Subset {
            variables: self
                .variables
                .iter()
                .copied()
                .filter(|&v| other.contains(v))
                .collect(),
        }
    }

    pub fn difference(&self, other: &Subset) -> Subset {
        Subset {
            variables: self
                .variables
                .iter()
                .copied()
                .filter(|&v| !other.contains(v))
                .collect(),
        }
    }

    pub fn is_subset_of(&self, other: &Subset) -> bool {
        self.variables.iter().all(|&v| other.contains(v))
    }

    pub fn is_disjoint(&self, other: &Subset) -> bool {
        self.variables.iter().all(|&v| !other.contains(v))
    }

    /// Maps every variable of `self` to its position inside `superset`.
    ///
    /// Returns `None` if `self` is not contained in `superset`. The returned permutation is
    /// what [`Assignment::project`](super::assignment::Assignment::project) consumes.
    pub fn positions_in(&self, superset: &Subset) -> Option<Vec<usize>> {
        self.variables
            .iter()
            .map(|&v| superset.index_of(v))
            .collect()
    }
}

impl FromIterator<VariableId> for Subset {
    fn from_iter<I: IntoIterator<Item = VariableId>>(iter: I) -> Self {
        Subset::new(iter)
    }
}

impl From<Vec<VariableId>> for Subset {
    fn from(variables: Vec<VariableId>) -> Self {
        Subset::new(variables)
    }
}

impl<'a> IntoIterator for &'a Subset {
    type Item = VariableId;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, VariableId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.variables.iter().copied()
    }
}

impl fmt::Display for Subset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.variables.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", v)?;
        }
        write!(f, "]")
    }
}
