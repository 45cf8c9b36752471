use crate::core::models::assignment::{Assignment, PartialAssignment};
use crate::core::models::ids::VariableId;
use crate::core::models::subset::Subset;
use crate::core::problem::Problem;
use crate::engine::cancel::CancellationToken;
use crate::engine::config::{SearchStrategy, SolveConfig};
use crate::engine::context::SearchContext;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::ScoredAssignment;
use crate::engine::table::ScoredAssignmentSet;
use crate::engine::tasks::enumeration::{branch_and_bound, exhaustive};
use crate::engine::tasks::merge::{MergeInput, merge};
use crate::engine::tasks::ordering::greedy_order;
use crate::engine::tree::builder;
use crate::engine::tree::{MergeNodeId, MergeTree, TreeSpec};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

/// The outcome of a query.
#[derive(Debug, Clone)]
pub struct SolveResult {
    variables: Subset,
    solutions: Vec<ScoredAssignment>,
    merge_tree: Option<MergeTree>,
    nodes: HashMap<Subset, ScoredAssignmentSet>,
}

impl SolveResult {
    /// The queried variables; every solution follows their canonical order.
    pub fn variables(&self) -> &Subset {
        &self.variables
    }

    /// All admissible assignments, best first, ties broken by assignment.
    pub fn solutions(&self) -> &[ScoredAssignment] {
        &self.solutions
    }

    pub fn best(&self) -> Option<&ScoredAssignment> {
        self.solutions.first()
    }

    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredAssignment> {
        self.solutions.iter()
    }

    /// The tree the query was merged along, if the merge-tree strategy was used.
    pub fn merge_tree(&self) -> Option<&MergeTree> {
        self.merge_tree.as_ref()
    }

    /// Subsets that have a table in this result.
    pub fn node_subsets(&self) -> impl Iterator<Item = &Subset> {
        self.nodes.keys()
    }

    pub fn node_assignment_count(&self, subset: &Subset) -> Result<usize, EngineError> {
        self.node_table(subset).map(ScoredAssignmentSet::len)
    }

    /// The table of the node scoped to `subset`, sorted like the final solutions.
    pub fn node_assignments(&self, subset: &Subset) -> Result<Vec<ScoredAssignment>, EngineError> {
        self.node_table(subset).map(ScoredAssignmentSet::to_sorted_vec)
    }

    /// Projects the solutions onto `subset`, keeping the lowest score of each projection.
    pub fn restricted_to(&self, subset: &Subset) -> Result<Vec<ScoredAssignment>, EngineError> {
        let positions = subset.positions_in(&self.variables).ok_or_else(|| {
            EngineError::UnknownSubset {
                subset: subset.clone(),
            }
        })?;
        let projected: ScoredAssignmentSet = self
            .solutions
            .iter()
            .map(|s| (s.assignment.project(&positions), s.score))
            .collect();
        Ok(projected.into_sorted_vec())
    }

    pub fn into_solutions(self) -> Vec<ScoredAssignment> {
        self.solutions
    }

    fn node_table(&self, subset: &Subset) -> Result<&ScoredAssignmentSet, EngineError> {
        self.nodes
            .get(subset)
            .ok_or_else(|| EngineError::UnknownSubset {
                subset: subset.clone(),
            })
    }
}

impl<'r> IntoIterator for &'r SolveResult {
    type Item = &'r ScoredAssignment;
    type IntoIter = std::slice::Iter<'r, ScoredAssignment>;

    fn into_iter(self) -> Self::IntoIter {
        self.solutions.iter()
    }
}

/// Finds every admissible assignment of `variables`.
pub fn run(
    problem: &Problem,
    variables: &Subset,
    config: &SolveConfig,
    reporter: &ProgressReporter,
) -> Result<SolveResult, EngineError> {
    run_with_cancellation(problem, variables, config, reporter, &CancellationToken::new())
}

/// Like [`run`], with the variables in `fixed` collapsed to the given states.
///
/// Entries of `fixed` override those already present in `config.fixed`.
pub fn run_given(
    problem: &Problem,
    variables: &Subset,
    fixed: &PartialAssignment,
    config: &SolveConfig,
    reporter: &ProgressReporter,
) -> Result<SolveResult, EngineError> {
    let mut config = config.clone();
    config.fixed.extend(fixed.iter().map(|(&v, &s)| (v, s)));
    run(problem, variables, &config, reporter)
}

/// Like [`run`], giving up with [`EngineError::Cancelled`] once `cancel` is triggered.
#[instrument(skip_all, name = "solve_workflow", fields(variables = variables.len()))]
pub fn run_with_cancellation(
    problem: &Problem,
    variables: &Subset,
    config: &SolveConfig,
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<SolveResult, EngineError> {
    // === Phase 0: Preparation ===
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    info!(
        strategy = %config.strategy,
        max_states = config.max_states,
        "Starting query over {} variable(s).",
        variables.len()
    );
    let context = SearchContext::new(problem, config, reporter, cancel, variables)?;
    let merge_tree = match config.strategy {
        SearchStrategy::MergeTree => plan(problem, variables, config)?,
        _ => {
            if config.merge_tree.is_some() {
                warn!(strategy = %config.strategy, "Ignoring the supplied merge tree");
            }
            None
        }
    };
    reporter.report(Progress::PhaseFinish);

    // === Phase 1: Enumeration and merging ===
    reporter.report(Progress::PhaseStart { name: "Search" });
    let nodes: HashMap<Subset, ScoredAssignmentSet> = match &merge_tree {
        Some(tree) => {
            reporter.report(Progress::TaskStart {
                total_steps: tree.len() as u64,
            });
            let nodes = evaluate(&context, tree, tree.root())?;
            reporter.report(Progress::TaskFinish);
            nodes
                .into_iter()
                .map(|(id, table)| (tree.node(id).subset.clone(), table))
                .collect()
        }
        None => {
            let table = match config.strategy {
                SearchStrategy::Exhaustive => exhaustive(&context, variables)?,
                _ => branch_and_bound(&context, variables)?,
            };
            report_node(&context, variables, &table);
            HashMap::from([(variables.clone(), table)])
        }
    };
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Organize results ===
    let solutions = nodes
        .get(variables)
        .map(ScoredAssignmentSet::to_sorted_vec)
        .ok_or_else(|| EngineError::Internal(format!("no table for the root {}", variables)))?;

    info!(
        best = ?solutions.first().map(|s| s.score),
        "Query complete. {} admissible assignment(s).",
        solutions.len()
    );
    Ok(SolveResult {
        variables: variables.clone(),
        solutions,
        merge_tree,
        nodes,
    })
}

/// The merge tree a merge-tree query over `variables` would use.
///
/// Returns `None` when `variables` is empty; such a query is answered by a single node.
pub fn plan(
    problem: &Problem,
    variables: &Subset,
    config: &SolveConfig,
) -> Result<Option<MergeTree>, EngineError> {
    if variables.is_empty() {
        return Ok(None);
    }
    let tree = match &config.merge_tree {
        Some(TreeSpec::Subsets(graph)) => builder::from_subset_graph(graph, variables)?,
        Some(TreeSpec::Explicit(tree)) => tree.clone(),
        None => builder::from_interaction_graph(&problem.interaction_graph(variables))
            .ok_or_else(|| EngineError::Internal("interaction graph has no vertices".into()))?,
    };
    tree.validate(variables)?;
    debug!(nodes = tree.len(), depth = tree.depth(), "Planned merge tree");
    Ok(Some(tree))
}

/// The order in which a leaf over `subset` would assign its variables.
pub fn variable_order(problem: &Problem, subset: &Subset) -> Vec<VariableId> {
    greedy_order(problem.filter_tables(), subset)
}

type NodeTables = Vec<(MergeNodeId, ScoredAssignmentSet)>;

/// Computes the table of `id` and every node below it; the node's own table comes last.
fn evaluate(
    context: &SearchContext,
    tree: &MergeTree,
    id: MergeNodeId,
) -> Result<NodeTables, EngineError> {
    context.check_cancelled()?;
    let node = tree.node(id);

    let Some((left_id, right_id)) = node.children else {
        let table = branch_and_bound(context, &node.subset)?;
        report_node(context, &node.subset, &table);
        return Ok(vec![(id, table)]);
    };

    #[cfg(feature = "parallel")]
    let (left, right) = rayon::join(
        || evaluate(context, tree, left_id),
        || evaluate(context, tree, right_id),
    );

    #[cfg(not(feature = "parallel"))]
    let (left, right) = (
        evaluate(context, tree, left_id),
        evaluate(context, tree, right_id),
    );

    let mut tables = left?;
    let right = right?;
    let table = match (tables.last(), right.last()) {
        (Some((_, left_table)), Some((_, right_table))) => merge(
            context,
            MergeInput {
                subset: &tree.node(left_id).subset,
                table: left_table,
            },
            MergeInput {
                subset: &tree.node(right_id).subset,
                table: right_table,
            },
        )?,
        _ => return Err(EngineError::Internal("a child produced no table".into())),
    };
    report_node(context, &node.subset, &table);

    tables.extend(right);
    tables.push((id, table));
    Ok(tables)
}

fn report_node(context: &SearchContext, subset: &Subset, table: &ScoredAssignmentSet) {
    debug!(subset = %subset, states = table.len(), "Node complete");
    context.reporter.report(Progress::NodeComplete {
        variables: subset.len(),
        states: table.len(),
    });
    context.reporter.report(Progress::TaskIncrement);
}

/// Scores a single complete assignment of `variables` against every filter and score table.
///
/// Returns `None` when a filter rejects it.
pub fn evaluate_assignment(
    problem: &Problem,
    variables: &Subset,
    assignment: &Assignment,
) -> Result<Option<f64>, EngineError> {
    let filters = crate::core::filters::collect_filters(problem.filter_tables(), variables, &[])?;
    if !filters.iter().all(|f| f.is_valid(assignment)) {
        return Ok(None);
    }
    let mut total = 0.0;
    for table in problem.score_tables() {
        total += table.score(variables, &[], assignment)?;
    }
    Ok(Some(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filters::allowed::AllowedStatesFilterTable;
    use crate::core::filters::allowed_tuples::AllowedTuplesFilterTable;
    use crate::core::filters::disjoint::{
        EqualityFilterTable, EquivalenceFilterTable, ExclusionFilterTable,
    };
    use crate::core::filters::forbidden::ForbiddenTuplesFilterTable;
    use crate::core::graph::SubsetGraph;
    use crate::core::models::variable::VariableTable;
    use crate::core::scoring::tabulated::{ScoreTerm, TabulatedScoreTable};
    use crate::engine::config::{SolveConfigBuilder, TruncationPolicy};
    use itertools::Itertools;
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    fn variables(sizes: &[usize]) -> (VariableTable, Vec<VariableId>) {
        let mut table = VariableTable::new();
        let ids = sizes
            .iter()
            .enumerate()
            .map(|(i, &n)| table.add(format!("x{}", i), n).unwrap())
            .collect();
        (table, ids)
    }

    fn config(max_states: usize) -> SolveConfig {
        SolveConfigBuilder::new().max_states(max_states).build().unwrap()
    }

    fn with_strategy(max_states: usize, strategy: SearchStrategy) -> SolveConfig {
        SolveConfigBuilder::new()
            .max_states(max_states)
            .strategy(strategy)
            .build()
            .unwrap()
    }

    fn pairs(result: &SolveResult) -> Vec<(Vec<usize>, f64)> {
        result
            .iter()
            .map(|s| (s.assignment.as_slice().to_vec(), s.score))
            .collect()
    }

    /// x, y, z binary; (x, y) = (0, 0) and (y, z) = (1, 1) are forbidden.
    fn three_variable_problem() -> (Problem, Vec<VariableId>) {
        let (vars, ids) = variables(&[2, 2, 2]);
        let mut forbidden = ForbiddenTuplesFilterTable::new();
        forbidden.add_term(
            Subset::new(vec![ids[0], ids[1]]),
            [Assignment::new(vec![0, 0])],
        );
        forbidden.add_term(
            Subset::new(vec![ids[1], ids[2]]),
            [Assignment::new(vec![1, 1])],
        );
        let problem = Problem::new(Arc::new(vars)).with_filter_table(Arc::new(forbidden));
        (problem, ids)
    }

    #[test]
    fn three_variable_scenario_has_four_admissible_assignments() {
        let (problem, ids) = three_variable_problem();
        let all = Subset::new(ids.clone());
        let result = run(&problem, &all, &config(100), &ProgressReporter::new()).unwrap();
        // y = 0 forces x = 1, y = 1 forces z = 0; the other variable stays free.
        let mut got: Vec<Vec<usize>> = result
            .iter()
            .map(|s| s.assignment.as_slice().to_vec())
            .collect();
        got.sort();
        assert_eq!(
            got,
            vec![vec![0, 1, 0], vec![1, 0, 0], vec![1, 0, 1], vec![1, 1, 0]]
        );
        assert!(
            result
                .iter()
                .all(|s| !(s.assignment[0] == 0 && s.assignment[1] == 0))
        );
        assert!(
            result
                .iter()
                .all(|s| !(s.assignment[1] == 1 && s.assignment[2] == 1))
        );
        let tree = result.merge_tree().unwrap();
        tree.validate(&all).unwrap();
    }

    #[test]
    fn twenty_binary_variables_overflow_instead_of_truncating() {
        let (vars, ids) = variables(&[2; 20]);
        let problem = Problem::new(Arc::new(vars));
        let all = Subset::new(ids);
        for strategy in [
            SearchStrategy::MergeTree,
            SearchStrategy::BranchAndBound,
            SearchStrategy::Exhaustive,
        ] {
            let err = run(
                &problem,
                &all,
                &with_strategy(100, strategy),
                &ProgressReporter::new(),
            )
            .unwrap_err();
            assert!(
                matches!(err, EngineError::TooManyStates { max_states: 100, .. }),
                "{} gave {:?}",
                strategy,
                err
            );
        }
    }

    #[test]
    fn empty_query_returns_one_empty_assignment() {
        let (vars, _) = variables(&[2]);
        let problem = Problem::new(Arc::new(vars));
        let result = run(
            &problem,
            &Subset::empty(),
            &config(1),
            &ProgressReporter::new(),
        )
        .unwrap();
        assert_eq!(result.len(), 1);
        assert!(result.best().unwrap().assignment.is_empty());
        assert_eq!(result.best().unwrap().score, 0.0);
        assert!(result.merge_tree().is_none());
    }

    #[test]
    fn solutions_are_sorted_by_score_then_assignment() {
        let (vars, ids) = variables(&[3, 2]);
        let scores = TabulatedScoreTable::new()
            .with_term(
                ScoreTerm::new(Subset::singleton(ids[0]), 1.0)
                    .with_entry(vec![2], 0.0)
                    .with_entry(vec![0], 3.0),
            )
            .with_term(ScoreTerm::new(Subset::singleton(ids[1]), 0.0).with_entry(vec![0], 0.5));
        let problem = Problem::new(Arc::new(vars)).with_score_table(Arc::new(scores));
        let all = Subset::new(ids);
        let result = run(&problem, &all, &config(100), &ProgressReporter::new()).unwrap();
        let got: Vec<Vec<usize>> = result
            .iter()
            .map(|s| s.assignment.as_slice().to_vec())
            .collect();
        assert_eq!(
            got,
            vec![
                vec![2, 1],
                vec![2, 0],
                vec![1, 1],
                vec![1, 0],
                vec![0, 1],
                vec![0, 0]
            ]
        );
        assert_eq!(result.best().unwrap().score, 0.0);
    }

    #[test]
    fn strategies_agree_on_a_scored_problem() {
        let (vars, ids) = variables(&[3, 3, 3, 2]);
        let mut exclusion = ExclusionFilterTable::new();
        exclusion.add_pair(ids[0], ids[1]);
        exclusion.add_pair(ids[1], ids[2]);
        let scores = TabulatedScoreTable::new()
            .with_term(
                ScoreTerm::new(Subset::new(vec![ids[0], ids[2]]), 1.0).with_entry(vec![0, 0], 0.0),
            )
            .with_term(
                ScoreTerm::new(Subset::new(vec![ids[2], ids[3]]), 0.0).with_entry(vec![1, 1], 4.0),
            );
        let problem = Problem::new(Arc::new(vars))
            .with_filter_table(Arc::new(exclusion))
            .with_score_table(Arc::new(scores));
        let all = Subset::new(ids);
        let reference = run(
            &problem,
            &all,
            &with_strategy(1000, SearchStrategy::Exhaustive),
            &ProgressReporter::new(),
        )
        .unwrap();
        for strategy in [SearchStrategy::MergeTree, SearchStrategy::BranchAndBound] {
            let result = run(
                &problem,
                &all,
                &with_strategy(1000, strategy),
                &ProgressReporter::new(),
            )
            .unwrap();
            assert_eq!(pairs(&result), pairs(&reference), "{}", strategy);
        }
    }

    #[test]
    fn repeated_queries_are_identical() {
        let (problem, ids) = three_variable_problem();
        let all = Subset::new(ids);
        let first = run(&problem, &all, &config(100), &ProgressReporter::new()).unwrap();
        let second = run(&problem, &all, &config(100), &ProgressReporter::new()).unwrap();
        assert_eq!(pairs(&first), pairs(&second));
    }

    #[test]
    fn independent_halves_merge_to_the_sum_of_their_scores() {
        let (vars, ids) = variables(&[2, 2]);
        let scores = TabulatedScoreTable::new()
            .with_term(ScoreTerm::new(Subset::singleton(ids[0]), 1.5).with_entry(vec![1], 0.25))
            .with_term(ScoreTerm::new(Subset::singleton(ids[1]), 2.0).with_entry(vec![0], 0.5));
        let problem = Problem::new(Arc::new(vars)).with_score_table(Arc::new(scores));
        let all = Subset::new(ids.clone());
        let result = run(&problem, &all, &config(10), &ProgressReporter::new()).unwrap();
        let left = result.node_assignments(&Subset::singleton(ids[0])).unwrap();
        let right = result.node_assignments(&Subset::singleton(ids[1])).unwrap();
        for a in &left {
            for b in &right {
                let merged = Assignment::new(vec![a.assignment[0], b.assignment[0]]);
                let score = result
                    .iter()
                    .find(|s| s.assignment == merged)
                    .map(|s| s.score);
                assert_eq!(score, Some(a.score + b.score));
            }
        }
    }

    #[test]
    fn keep_best_never_loses_the_optimum_of_independent_variables() {
        let (vars, ids) = variables(&[4, 4, 4, 4]);
        let mut scores = TabulatedScoreTable::new();
        for (i, &v) in ids.iter().enumerate() {
            scores.add_term(
                ScoreTerm::new(Subset::singleton(v), 2.0).with_entry(vec![i], 0.0),
            );
        }
        let problem = Problem::new(Arc::new(vars)).with_score_table(Arc::new(scores));
        let all = Subset::new(ids);
        let full = run(&problem, &all, &config(1000), &ProgressReporter::new()).unwrap();

        let mut previous_best = f64::INFINITY;
        for max_states in [4, 8, 16, 64] {
            let truncated = SolveConfigBuilder::new()
                .max_states(max_states)
                .truncation(TruncationPolicy::KeepBest)
                .build()
                .unwrap();
            let result = run(&problem, &all, &truncated, &ProgressReporter::new()).unwrap();
            assert!(result.len() <= max_states);
            let best = result.best().unwrap().score;
            assert!(best <= previous_best);
            assert_eq!(best, full.best().unwrap().score);
            for kept in result.iter() {
                assert!(full.solutions().contains(kept));
            }
            previous_best = best;
        }
    }

    #[test]
    fn explicit_tree_is_used_and_every_node_can_be_inspected() {
        let (problem, ids) = three_variable_problem();
        let all = Subset::new(ids.clone());
        let tree = MergeTree::join(
            MergeTree::leaf(Subset::new(vec![ids[0], ids[1]])),
            MergeTree::leaf(Subset::singleton(ids[2])),
        );
        let config = SolveConfigBuilder::new()
            .max_states(100)
            .merge_tree(TreeSpec::Explicit(tree.clone()))
            .build()
            .unwrap();
        let result = run(&problem, &all, &config, &ProgressReporter::new()).unwrap();
        assert_eq!(result.merge_tree(), Some(&tree));
        assert_eq!(
            result
                .node_assignment_count(&Subset::new(vec![ids[0], ids[1]]))
                .unwrap(),
            3
        );
        assert_eq!(
            result
                .node_assignment_count(&Subset::singleton(ids[2]))
                .unwrap(),
            2
        );
        assert_eq!(result.node_assignment_count(&all).unwrap(), 4);
        assert!(matches!(
            result.node_assignments(&Subset::singleton(ids[0])),
            Err(EngineError::UnknownSubset { .. })
        ));
    }

    #[test]
    fn malformed_trees_are_rejected_before_enumeration() {
        let (problem, ids) = three_variable_problem();
        let all = Subset::new(ids.clone());

        let overlapping = MergeTree::join(
            MergeTree::leaf(Subset::new(vec![ids[0], ids[1]])),
            MergeTree::leaf(Subset::new(vec![ids[1], ids[2]])),
        );
        let mut cycle = SubsetGraph::default();
        let a = cycle.add_node(Subset::singleton(ids[0]));
        let b = cycle.add_node(Subset::singleton(ids[1]));
        let c = cycle.add_node(Subset::singleton(ids[2]));
        cycle.add_edge(a, b, ());
        cycle.add_edge(b, c, ());
        cycle.add_edge(c, a, ());

        let seen = Mutex::new(0usize);
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::NodeComplete { .. } = event {
                *seen.lock().unwrap() += 1;
            }
        }));
        for spec in [TreeSpec::Explicit(overlapping), TreeSpec::Subsets(cycle)] {
            let config = SolveConfigBuilder::new()
                .max_states(100)
                .merge_tree(spec)
                .build()
                .unwrap();
            assert!(matches!(
                run(&problem, &all, &config, &reporter),
                Err(EngineError::NotATree { .. })
            ));
        }
        assert_eq!(*seen.lock().unwrap(), 0);
    }

    #[test]
    fn subset_graph_tree_is_contracted() {
        let (problem, ids) = three_variable_problem();
        let all = Subset::new(ids.clone());
        let mut graph = SubsetGraph::default();
        let a = graph.add_node(Subset::new(vec![ids[0], ids[1]]));
        let b = graph.add_node(Subset::new(vec![ids[1], ids[2]]));
        graph.add_edge(a, b, ());
        let config = SolveConfigBuilder::new()
            .max_states(100)
            .merge_tree(TreeSpec::Subsets(graph))
            .build()
            .unwrap();
        let result = run(&problem, &all, &config, &ProgressReporter::new()).unwrap();
        assert_eq!(result.len(), 4);
        assert!(result.merge_tree().unwrap().leaves().count() == 3);
    }

    #[test]
    fn cancelled_query_fails_without_a_result() {
        let (problem, ids) = three_variable_problem();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = run_with_cancellation(
            &problem,
            &Subset::new(ids),
            &config(100),
            &ProgressReporter::new(),
            &cancel,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
    }

    #[test]
    fn empty_domain_is_reported() {
        let (vars, ids) = variables(&[2, 0]);
        let problem = Problem::new(Arc::new(vars));
        let err = run(
            &problem,
            &Subset::new(ids.clone()),
            &config(10),
            &ProgressReporter::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::EmptyDomain { variable } if variable == ids[1]));
    }

    #[test]
    fn run_given_collapses_fixed_variables() {
        let (problem, ids) = three_variable_problem();
        let all = Subset::new(ids.clone());
        let fixed = BTreeMap::from([(ids[1], 1)]);
        let result = run_given(&problem, &all, &fixed, &config(100), &ProgressReporter::new())
            .unwrap();
        let got: Vec<Vec<usize>> = result
            .iter()
            .map(|s| s.assignment.as_slice().to_vec())
            .collect();
        assert_eq!(got, vec![vec![0, 1, 0], vec![1, 1, 0]]);
    }

    #[test]
    fn restricted_to_keeps_the_best_score_per_projection() {
        let (vars, ids) = variables(&[2, 3]);
        let scores = TabulatedScoreTable::new().with_term(
            ScoreTerm::new(Subset::new(vec![ids[0], ids[1]]), 5.0)
                .with_entry(vec![0, 2], 1.0)
                .with_entry(vec![1, 0], 2.0),
        );
        let problem = Problem::new(Arc::new(vars)).with_score_table(Arc::new(scores));
        let all = Subset::new(ids.clone());
        let result = run(&problem, &all, &config(100), &ProgressReporter::new()).unwrap();
        let restricted = result.restricted_to(&Subset::singleton(ids[0])).unwrap();
        let got: Vec<(usize, f64)> = restricted
            .iter()
            .map(|s| (s.assignment[0], s.score))
            .collect();
        assert_eq!(got, vec![(0, 1.0), (1, 2.0)]);

        assert!(matches!(
            result.restricted_to(&Subset::singleton(VariableId::default())),
            Err(EngineError::UnknownSubset { .. })
        ));
    }

    #[test]
    fn progress_reports_every_node() {
        let (problem, ids) = three_variable_problem();
        let all = Subset::new(ids);
        let nodes = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::NodeComplete { variables, .. } = event {
                nodes.lock().unwrap().push(variables);
            }
        }));
        let result = run(&problem, &all, &config(100), &reporter).unwrap();
        drop(reporter);
        let nodes = nodes.into_inner().unwrap();
        assert_eq!(nodes.len(), result.merge_tree().unwrap().len());
        assert_eq!(nodes.iter().filter(|&&n| n == 3).count(), 1);
    }

    #[test]
    fn variable_order_puts_constrained_variables_first() {
        let (vars, ids) = variables(&[3, 3, 3]);
        let mut allowed = AllowedStatesFilterTable::new();
        allowed.set_allowed_states(ids[1], [0]);
        let mut equivalence = EquivalenceFilterTable::new();
        equivalence.add_pair(ids[1], ids[2]);
        let problem = Problem::new(Arc::new(vars))
            .with_filter_table(Arc::new(allowed))
            .with_filter_table(Arc::new(equivalence));
        let order = variable_order(&problem, &Subset::new(ids.clone()));
        assert_eq!(order, vec![ids[1], ids[2], ids[0]]);
    }

    #[test]
    fn evaluate_assignment_applies_filters_and_scores() {
        let (problem, ids) = three_variable_problem();
        let all = Subset::new(ids);
        assert_eq!(
            evaluate_assignment(&problem, &all, &Assignment::new(vec![0, 1, 0])).unwrap(),
            Some(0.0)
        );
        assert_eq!(
            evaluate_assignment(&problem, &all, &Assignment::new(vec![0, 0, 0])).unwrap(),
            None
        );
    }

    /// A small random problem over every built-in filter kind, with integer-valued score
    /// entries so sums are exact in any order. Variable indices wrap around the number of
    /// variables.
    #[derive(Debug, Clone)]
    struct RandomProblem {
        sizes: Vec<usize>,
        exclusions: Vec<(usize, usize)>,
        equalities: Vec<(usize, usize)>,
        equivalences: Vec<(usize, usize)>,
        allowed_states: Vec<(usize, Vec<usize>)>,
        forbidden: Vec<(usize, usize, usize, usize)>,
        allowed_tuples: Vec<(usize, usize, Vec<(usize, usize)>)>,
        scores: Vec<(usize, usize, usize, u8)>,
        limits: Vec<(usize, usize, usize)>,
        max_violations: Option<usize>,
    }

    impl RandomProblem {
        fn build(&self) -> (Problem, Subset) {
            let (vars, ids) = variables(&self.sizes);
            let n = ids.len();
            // distinct (a, b) in canonical order, with their states swapped to match
            let ordered = |a: usize, b: usize, sa: usize, sb: usize| {
                let (a, b) = (a % n, b % n);
                match a.cmp(&b) {
                    std::cmp::Ordering::Less => Some((a, b, sa, sb)),
                    std::cmp::Ordering::Greater => Some((b, a, sb, sa)),
                    std::cmp::Ordering::Equal => None,
                }
            };

            let mut exclusion = ExclusionFilterTable::new();
            for &(a, b) in &self.exclusions {
                if let Some((a, b, ..)) = ordered(a, b, 0, 0) {
                    exclusion.add_pair(ids[a], ids[b]);
                }
            }
            let mut equality = EqualityFilterTable::new();
            for &(a, b) in &self.equalities {
                if let Some((a, b, ..)) = ordered(a, b, 0, 0) {
                    equality.add_pair(ids[a], ids[b]);
                }
            }
            let mut equivalence = EquivalenceFilterTable::new();
            for &(a, b) in &self.equivalences {
                if let Some((a, b, ..)) = ordered(a, b, 0, 0) {
                    equivalence.add_pair(ids[a], ids[b]);
                }
            }
            let mut allowed = AllowedStatesFilterTable::new();
            for (a, states) in &self.allowed_states {
                allowed.intersect(ids[a % n], states.iter().copied());
            }
            let mut forbidden = ForbiddenTuplesFilterTable::new();
            for &(a, b, sa, sb) in &self.forbidden {
                if let Some((lo, hi, slo, shi)) = ordered(a, b, sa, sb) {
                    forbidden.add_term(
                        Subset::new(vec![ids[lo], ids[hi]]),
                        [Assignment::new(vec![slo, shi])],
                    );
                }
            }
            let mut allowed_tuples = AllowedTuplesFilterTable::new();
            for (a, b, tuples) in &self.allowed_tuples {
                if let Some((lo, hi, ..)) = ordered(*a, *b, 0, 0) {
                    let swapped = lo != a % n;
                    let tuples = tuples.iter().map(|&(sa, sb)| {
                        if swapped {
                            Assignment::new(vec![sb, sa])
                        } else {
                            Assignment::new(vec![sa, sb])
                        }
                    });
                    allowed_tuples.set_allowed_tuples(Subset::new(vec![ids[lo], ids[hi]]), tuples);
                }
            }

            let mut scores = TabulatedScoreTable::new();
            for &(a, b, state, value) in &self.scores {
                let term = match ordered(a, b, state, state) {
                    Some((lo, hi, ..)) => {
                        ScoreTerm::new(Subset::new(vec![ids[lo], ids[hi]]), f64::from(value))
                            .with_entry(vec![state, state], 0.0)
                    }
                    None => ScoreTerm::new(Subset::singleton(ids[a % n]), 1.0)
                        .with_entry(vec![state], f64::from(value)),
                };
                scores.add_term(term);
            }

            // each limited term is violated when both ends share its state
            let mut limited = TabulatedScoreTable::new();
            if let Some(max_violations) = self.max_violations {
                limited = limited.with_max_violations(max_violations);
            }
            for &(a, b, state) in &self.limits {
                if let Some((lo, hi, ..)) = ordered(a, b, 0, 0) {
                    limited.add_term(
                        ScoreTerm::new(Subset::new(vec![ids[lo], ids[hi]]), 0.0)
                            .with_entry(vec![state, state], 1.0)
                            .with_max(0.5),
                    );
                }
            }
            let limited = Arc::new(limited);

            let problem = Problem::new(Arc::new(vars))
                .with_filter_table(Arc::new(exclusion))
                .with_filter_table(Arc::new(equality))
                .with_filter_table(Arc::new(equivalence))
                .with_filter_table(Arc::new(allowed))
                .with_filter_table(Arc::new(forbidden))
                .with_filter_table(Arc::new(allowed_tuples))
                .with_filter_table(limited.clone())
                .with_score_table(Arc::new(scores))
                .with_score_table(limited);
            (problem, Subset::new(ids))
        }

        /// Every combination checked by hand against the problem's own tables.
        fn brute_force(&self, problem: &Problem, all: &Subset) -> Vec<(Vec<usize>, f64)> {
            let mut found: Vec<ScoredAssignment> = self
                .sizes
                .iter()
                .map(|&n| 0..n)
                .multi_cartesian_product()
                .filter_map(|states| {
                    let assignment = Assignment::new(states);
                    evaluate_assignment(problem, all, &assignment)
                        .unwrap()
                        .map(|score| ScoredAssignment::new(assignment, score))
                })
                .collect();
            found.sort();
            found
                .into_iter()
                .map(|s| (s.assignment.into_vec(), s.score))
                .collect()
        }
    }

    fn arb_problem() -> impl Strategy<Value = RandomProblem> {
        let pair = || prop::collection::vec((0usize..5, 0usize..5), 0..3);
        (
            prop::collection::vec(1usize..=3, 1..=5),
            pair(),
            pair(),
            pair(),
            prop::collection::vec((0usize..5, prop::collection::vec(0usize..3, 0..3)), 0..3),
            prop::collection::vec((0usize..5, 0usize..5, 0usize..3, 0usize..3), 0..4),
            prop::collection::vec(
                (
                    0usize..5,
                    0usize..5,
                    prop::collection::vec((0usize..3, 0usize..3), 0..5),
                ),
                0..3,
            ),
            prop::collection::vec((0usize..5, 0usize..5, 0usize..3, 0u8..5), 0..6),
            prop::collection::vec((0usize..5, 0usize..5, 0usize..3), 0..4),
            prop::option::of(0usize..3),
        )
            .prop_map(
                |(
                    sizes,
                    exclusions,
                    equalities,
                    equivalences,
                    allowed_states,
                    forbidden,
                    allowed_tuples,
                    scores,
                    limits,
                    max_violations,
                )| RandomProblem {
                    sizes,
                    exclusions,
                    equalities,
                    equivalences,
                    allowed_states,
                    forbidden,
                    allowed_tuples,
                    scores,
                    limits,
                    max_violations,
                },
            )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Every strategy finds exactly the brute-force admissible set with the same scores.
        #[test]
        fn no_false_negatives(random in arb_problem()) {
            let (problem, all) = random.build();
            let expected = random.brute_force(&problem, &all);
            for strategy in [
                SearchStrategy::MergeTree,
                SearchStrategy::BranchAndBound,
                SearchStrategy::Exhaustive,
            ] {
                let result = run(
                    &problem,
                    &all,
                    &with_strategy(10_000, strategy),
                    &ProgressReporter::new(),
                )
                .unwrap();
                prop_assert_eq!(pairs(&result), expected.clone(), "{}", strategy);
            }
        }

        /// Derived trees place every variable in exactly one leaf and scope nodes to unions.
        #[test]
        fn derived_trees_are_valid(random in arb_problem()) {
            let (problem, all) = random.build();
            let tree = plan(&problem, &all, &config(1)).unwrap().unwrap();
            prop_assert!(tree.validate(&all).is_ok());
            let mut leaf_variables: Vec<VariableId> = tree
                .leaves()
                .flat_map(|id| tree.node(id).subset.iter().collect::<Vec<_>>())
                .collect();
            leaf_variables.sort();
            prop_assert_eq!(leaf_variables, all.iter().collect::<Vec<_>>());
        }

        /// Truncated results hold only genuine solutions, within the bound.
        #[test]
        fn truncated_results_are_genuine(random in arb_problem(), max_states in 1usize..6) {
            let (problem, all) = random.build();
            let full = run(&problem, &all, &config(10_000), &ProgressReporter::new()).unwrap();
            let truncated = SolveConfigBuilder::new()
                .max_states(max_states)
                .truncation(TruncationPolicy::KeepBest)
                .build()
                .unwrap();
            match run(&problem, &all, &truncated, &ProgressReporter::new()) {
                Ok(result) => {
                    prop_assert!(result.len() <= max_states);
                    for kept in result.iter() {
                        prop_assert!(full.solutions().contains(kept));
                    }
                }
                // leaves stay strict
                Err(EngineError::TooManyStates { subset, .. }) => {
                    prop_assert_eq!(subset.len(), 1);
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }
    }
}
