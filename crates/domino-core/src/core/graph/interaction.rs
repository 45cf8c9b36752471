use super::InteractionGraph;
use crate::core::models::subset::Subset;
use itertools::Itertools;
use petgraph::graph::NodeIndex;

/// Builds the interaction graph of `variables` from constraint scopes.
///
/// Scopes are restricted to `variables` first; a scope reaching outside only connects
/// the variables it shares with the query.
pub fn build_interaction_graph(variables: &Subset, scopes: &[Subset]) -> InteractionGraph {
    let mut graph = InteractionGraph::with_capacity(variables.len(), scopes.len());
    for v in variables {
        graph.add_node(v);
    }
    for scope in scopes {
        let Some(positions) = scope.intersection(variables).positions_in(variables) else {
            continue;
        };
        for (a, b) in positions.into_iter().tuple_combinations() {
            graph.update_edge(NodeIndex::new(a), NodeIndex::new(b), ());
        }
    }
    graph
}
