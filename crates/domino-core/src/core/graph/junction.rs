use super::{InteractionGraph, SubsetGraph};
use crate::core::models::subset::Subset;
use petgraph::algo::min_spanning_tree;
use petgraph::data::Element;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// Eliminates vertices in minimum-degree order, returning the elimination cliques.
///
/// Each clique is a vertex together with its neighbours at the time it was eliminated.
/// The fill edges added along the way make the graph chordal.
fn eliminate(graph: &InteractionGraph) -> Vec<BTreeSet<usize>> {
    let n = graph.node_count();
    let mut adjacency: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
    for edge in graph.raw_edges() {
        let (a, b) = (edge.source().index(), edge.target().index());
        if a != b {
            adjacency[a].insert(b);
            adjacency[b].insert(a);
        }
    }

    let mut remaining: BTreeSet<usize> = (0..n).collect();
    let mut cliques = Vec::with_capacity(n);
    while let Some(vertex) = remaining
        .iter()
        .copied()
        .min_by_key(|&v| (adjacency[v].len(), v))
    {
        let neighbours: Vec<usize> = adjacency[vertex].iter().copied().collect();
        for (i, &a) in neighbours.iter().enumerate() {
            for &b in &neighbours[i + 1..] {
                adjacency[a].insert(b);
                adjacency[b].insert(a);
            }
        }
        for &u in &neighbours {
            adjacency[u].remove(&vertex);
        }
        let mut clique: BTreeSet<usize> = neighbours.into_iter().collect();
        clique.insert(vertex);
        trace!(vertex, size = clique.len(), "Eliminated vertex");
        cliques.push(clique);
        remaining.remove(&vertex);
    }
    cliques
}

/// Drops every clique contained in another one, keeping elimination order.
fn maximal_cliques(cliques: Vec<BTreeSet<usize>>) -> Vec<BTreeSet<usize>> {
    let mut kept: Vec<BTreeSet<usize>> = Vec::with_capacity(cliques.len());
    for (i, clique) in cliques.iter().enumerate() {
        let dominated = cliques.iter().enumerate().any(|(j, other)| {
            i != j
                && clique.is_subset(other)
                && (clique.len() < other.len() || j < i)
        });
        if !dominated {
            kept.push(clique.clone());
        }
    }
    kept
}

/// Builds a junction tree of the interaction graph.
///
/// The graph is triangulated by minimum-degree elimination, its maximal cliques are
/// connected by a maximum-weight spanning tree (weight = size of the intersection), and
/// disconnected pieces are then chained together through consecutive cliques. The result
/// is a tree whose vertices cover every variable of the graph.
pub fn junction_tree(graph: &InteractionGraph) -> SubsetGraph {
    let cliques = maximal_cliques(eliminate(graph));
    debug!(cliques = cliques.len(), "Found maximal cliques");

    let mut weighted: UnGraph<usize, i64> = UnGraph::with_capacity(cliques.len(), 0);
    for i in 0..cliques.len() {
        weighted.add_node(i);
    }
    for i in 0..cliques.len() {
        for j in i + 1..cliques.len() {
            let shared = cliques[i].intersection(&cliques[j]).count();
            if shared > 0 {
                weighted.add_edge(NodeIndex::new(i), NodeIndex::new(j), -(shared as i64));
            }
        }
    }

    let mut tree = SubsetGraph::with_capacity(cliques.len(), cliques.len().saturating_sub(1));
    for clique in &cliques {
        tree.add_node(clique.iter().map(|&i| graph[NodeIndex::new(i)]).collect());
    }

    let mut components = UnionFind::<usize>::new(cliques.len());
    for element in min_spanning_tree(&weighted) {
        if let Element::Edge { source, target, .. } = element {
            tree.add_edge(NodeIndex::new(source), NodeIndex::new(target), ());
            components.union(source, target);
        }
    }
    for i in 1..cliques.len() {
        if components.union(i - 1, i) {
            tree.add_edge(NodeIndex::new(i - 1), NodeIndex::new(i), ());
        }
    }
    tree
}

/// Union of the subsets on the vertices of `graph`.
pub fn covered_variables(graph: &SubsetGraph) -> Subset {
    graph
        .node_weights()
        .fold(Subset::empty(), |acc, subset| acc.union(subset))
}
