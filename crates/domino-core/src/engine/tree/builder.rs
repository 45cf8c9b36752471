use super::MergeTree;
use crate::core::graph::junction::{covered_variables, junction_tree};
use crate::core::graph::{InteractionGraph, SubsetGraph};
use crate::core::models::ids::VariableId;
use crate::core::models::subset::Subset;
use crate::engine::error::EngineError;
use petgraph::algo::connected_components;
use petgraph::graph::NodeIndex;
use std::collections::HashSet;
use tracing::debug;

/// Derives a merge tree from an interaction graph via its junction tree.
///
/// Returns `None` for a graph without vertices.
pub fn from_interaction_graph(graph: &InteractionGraph) -> Option<MergeTree> {
    let junction = junction_tree(graph);
    debug!(
        cliques = junction.node_count(),
        largest = junction.node_weights().map(Subset::len).max().unwrap_or(0),
        "Built junction tree"
    );
    contract(&junction)
}

/// Builds a merge tree from a caller-supplied tree of subsets.
///
/// The graph must be a tree (one component, one edge fewer than vertices) whose subsets
/// lie inside `variables` and together cover them.
pub fn from_subset_graph(
    graph: &SubsetGraph,
    variables: &Subset,
) -> Result<MergeTree, EngineError> {
    if graph.node_count() == 0 {
        return Err(EngineError::not_a_tree("the subset graph has no vertices"));
    }
    if graph.node_count() != graph.edge_count() + 1 {
        return Err(EngineError::not_a_tree(format!(
            "{} vertices but {} edges",
            graph.node_count(),
            graph.edge_count()
        )));
    }
    let components = connected_components(graph);
    if components != 1 {
        return Err(EngineError::not_a_tree(format!(
            "the subset graph has {} connected components",
            components
        )));
    }
    if let Some(outside) = graph.node_weights().find(|s| !s.is_subset_of(variables)) {
        return Err(EngineError::not_a_tree(format!(
            "vertex {} reaches outside the queried variables",
            outside
        )));
    }
    let covered = covered_variables(graph);
    if &covered != variables {
        return Err(EngineError::not_a_tree(format!(
            "the vertices cover {} instead of {}",
            covered, variables
        )));
    }

    contract(graph).ok_or_else(|| EngineError::not_a_tree("the subset graph is empty"))
}

/// Turns a tree of subsets into a binary merge tree.
///
/// The tree is rooted at its first vertex and walked depth first. Each vertex contributes
/// one single-variable leaf for every variable not already placed by an earlier vertex, and
/// those leaves are folded together with the trees of its children, in that order.
fn contract(graph: &SubsetGraph) -> Option<MergeTree> {
    if graph.node_count() == 0 {
        return None;
    }

    // Depth-first pre-order, children sorted by index for determinism.
    let mut pre_order: Vec<NodeIndex> = Vec::with_capacity(graph.node_count());
    let mut children: Vec<Vec<NodeIndex>> = vec![Vec::new(); graph.node_count()];
    let mut visited = vec![false; graph.node_count()];
    let root = NodeIndex::new(0);
    let mut stack = vec![root];
    visited[root.index()] = true;
    while let Some(vertex) = stack.pop() {
        pre_order.push(vertex);
        let mut next: Vec<NodeIndex> = graph
            .neighbors(vertex)
            .filter(|n| !visited[n.index()])
            .collect();
        next.sort();
        next.dedup();
        for &n in &next {
            visited[n.index()] = true;
        }
        children[vertex.index()] = next.clone();
        stack.extend(next.into_iter().rev());
    }

    let mut placed: HashSet<VariableId> = HashSet::new();
    let mut own_leaves: Vec<Vec<VariableId>> = vec![Vec::new(); graph.node_count()];
    for &vertex in &pre_order {
        own_leaves[vertex.index()] = graph[vertex].iter().filter(|&v| placed.insert(v)).collect();
    }

    let mut built: Vec<Option<MergeTree>> = vec![None; graph.node_count()];
    for &vertex in pre_order.iter().rev() {
        let leaves = own_leaves[vertex.index()]
            .iter()
            .map(|&v| MergeTree::leaf(Subset::singleton(v)));
        let subtrees: Vec<MergeTree> = children[vertex.index()]
            .iter()
            .filter_map(|c| built[c.index()].take())
            .collect();
        built[vertex.index()] = MergeTree::chain(leaves.chain(subtrees));
    }
    built[root.index()].take()
}
