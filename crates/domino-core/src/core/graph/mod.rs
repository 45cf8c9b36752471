//! Graphs over variables and subsets.
//!
//! Vertices of an [`InteractionGraph`] built for a subset follow the canonical order of
//! that subset, so vertex `i` carries `subset[i]`.

pub mod interaction;
pub mod junction;

use super::models::ids::VariableId;
use super::models::subset::Subset;
use petgraph::graph::UnGraph;

/// Undirected graph with one vertex per variable and an edge wherever two variables share
/// a constraint.
pub type InteractionGraph = UnGraph<VariableId, ()>;

/// Undirected graph whose vertices are subsets of variables; a junction tree is one.
pub type SubsetGraph = UnGraph<Subset, ()>;
