//! Binary merge trees.
//!
//! A [`MergeTree`] describes in which order node tables are combined. Leaves are
//! enumerated directly; every internal node joins the tables of its two children on the
//! variables they share. Trees are either derived from a problem's interaction graph, built
//! from a caller-supplied [`SubsetGraph`], or composed by hand with [`MergeTree::leaf`] and
//! [`MergeTree::join`].

pub mod builder;

use super::error::EngineError;
use crate::core::graph::SubsetGraph;
use crate::core::models::subset::Subset;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MergeNodeId(usize);

impl MergeNodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeNode {
    pub subset: Subset,
    pub children: Option<(MergeNodeId, MergeNodeId)>,
}

impl MergeNode {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// An arena-backed binary tree of subsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeTree {
    nodes: Vec<MergeNode>,
    root: MergeNodeId,
}

/// A decomposition supplied by the caller instead of the derived one.
#[derive(Debug, Clone)]
pub enum TreeSpec {
    /// A tree of subsets (for instance a junction tree), contracted into a merge tree.
    Subsets(SubsetGraph),
    /// A merge tree used as is.
    Explicit(MergeTree),
}

impl MergeTree {
    pub fn leaf(subset: impl Into<Subset>) -> Self {
        Self {
            nodes: vec![MergeNode {
                subset: subset.into(),
                children: None,
            }],
            root: MergeNodeId(0),
        }
    }

    /// A new root over `left` and `right`, scoped to the union of both.
    pub fn join(left: MergeTree, right: MergeTree) -> Self {
        let offset = left.nodes.len();
        let left_root = left.root;
        let right_root = MergeNodeId(right.root.0 + offset);
        let subset = left.scope().union(right.scope());

        let mut nodes = left.nodes;
        nodes.reserve(right.nodes.len() + 1);
        nodes.extend(right.nodes.into_iter().map(|node| MergeNode {
            subset: node.subset,
            children: node
                .children
                .map(|(l, r)| (MergeNodeId(l.0 + offset), MergeNodeId(r.0 + offset))),
        }));
        let root = MergeNodeId(nodes.len());
        nodes.push(MergeNode {
            subset,
            children: Some((left_root, right_root)),
        });
        Self { nodes, root }
    }

    /// Joins `trees` left to right; `None` when there are none.
    pub fn chain(trees: impl IntoIterator<Item = MergeTree>) -> Option<Self> {
        trees.into_iter().reduce(MergeTree::join)
    }

    #[inline]
    pub fn root(&self) -> MergeNodeId {
        self.root
    }

    #[inline]
    pub fn node(&self, id: MergeNodeId) -> &MergeNode {
        &self.nodes[id.0]
    }

    /// Variables covered by the whole tree.
    #[inline]
    pub fn scope(&self) -> &Subset {
        &self.nodes[self.root.0].subset
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn leaves(&self) -> impl Iterator<Item = MergeNodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_leaf())
            .map(|(i, _)| MergeNodeId(i))
    }

    pub fn find(&self, subset: &Subset) -> Option<MergeNodeId> {
        self.nodes
            .iter()
            .position(|n| &n.subset == subset)
            .map(MergeNodeId)
    }

    /// Nodes with their depth, parents before children, left before right.
    pub fn pre_order(&self) -> Vec<(MergeNodeId, usize)> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(self.root, 0)];
        while let Some((id, depth)) = stack.pop() {
            order.push((id, depth));
            if let Some((left, right)) = self.node(id).children {
                stack.push((right, depth + 1));
                stack.push((left, depth + 1));
            }
        }
        order
    }

    /// Nodes with every child listed before its parent.
    pub fn post_order(&self) -> Vec<MergeNodeId> {
        let mut order: Vec<MergeNodeId> =
            self.pre_order().into_iter().map(|(id, _)| id).collect();
        order.reverse();
        order
    }

    pub fn depth(&self) -> usize {
        self.pre_order().iter().map(|&(_, d)| d).max().unwrap_or(0)
    }

    /// Checks that this tree is a valid decomposition of `variables`.
    ///
    /// Every variable must sit in exactly one leaf, no leaf may be empty, every internal
    /// node must be scoped to the union of its children and the root to `variables`.
    pub fn validate(&self, variables: &Subset) -> Result<(), EngineError> {
        let mut seen = HashSet::with_capacity(variables.len());
        for id in self.leaves() {
            let subset = &self.node(id).subset;
            if subset.is_empty() {
                return Err(EngineError::not_a_tree("a leaf has no variables"));
            }
            for v in subset {
                if !variables.contains(v) {
                    return Err(EngineError::not_a_tree(format!(
                        "variable {:?} is not part of the query",
                        v
                    )));
                }
                if !seen.insert(v) {
                    return Err(EngineError::not_a_tree(format!(
                        "variable {:?} appears in more than one leaf",
                        v
                    )));
                }
            }
        }
        for node in &self.nodes {
            if let Some((left, right)) = node.children {
                let union = self.node(left).subset.union(&self.node(right).subset);
                if union != node.subset {
                    return Err(EngineError::not_a_tree(format!(
                        "node {} is not the union of its children",
                        node.subset
                    )));
                }
            }
        }
        if self.scope() != variables || seen.len() != variables.len() {
            return Err(EngineError::not_a_tree(format!(
                "the tree covers {} instead of {}",
                self.scope(),
                variables
            )));
        }
        Ok(())
    }
}

impl fmt::Display for MergeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, depth) in self.pre_order() {
            writeln!(f, "{:indent$}{}", "", self.node(id).subset, indent = depth * 2)?;
        }
        Ok(())
    }
}
