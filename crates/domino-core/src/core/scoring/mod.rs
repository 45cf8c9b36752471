//! Additive score terms over small scopes.
//!
//! Scores are non-negative and lower is better. Like filters, a score table is asked about
//! a scope together with the parts of it that were already scored on their own, and only
//! sums the terms that are new to the scope.

pub mod tabulated;

use super::domain::ProviderError;
use super::models::assignment::Assignment;
use super::models::subset::Subset;
use std::fmt;

pub trait ScoreTable: fmt::Debug + Send + Sync {
    /// Sum of the terms whose scope lies in `subset` and not wholly in one of `excluded`.
    ///
    /// `assignment` follows the canonical order of `subset`.
    fn score(
        &self,
        subset: &Subset,
        excluded: &[Subset],
        assignment: &Assignment,
    ) -> Result<f64, ProviderError>;

    /// Scopes of the terms this table knows about.
    fn interactions(&self) -> Vec<Subset> {
        Vec::new()
    }
}
