use super::{query_variables, subset_names};
use crate::cli::TreeArgs;
use crate::error::{CliError, Result};
use domino_engine::core::graph::junction::junction_tree;
use domino_engine::core::io::problem_file::load_problem;
use domino_engine::core::models::variable::VariableTable;
use domino_engine::engine::tree::MergeTree;
use domino_engine::engine::tree::builder::from_interaction_graph;
use tracing::info;

pub fn run(args: TreeArgs) -> Result<()> {
    info!("Loading problem from {:?}", &args.query.problem);
    let loaded = load_problem(&args.query.problem)?;
    let variables = query_variables(&loaded, &args.query.variables)?;
    if variables.is_empty() {
        return Err(CliError::Argument(
            "The query has no variables; there is no tree to print.".to_string(),
        ));
    }

    let graph = loaded.problem.interaction_graph(&variables);

    if args.junction {
        let junction = junction_tree(&graph);
        println!("Junction tree ({} clique(s)):", junction.node_count());
        for index in junction.node_indices() {
            println!(
                "  #{}: [{}]",
                index.index(),
                subset_names(&loaded.variables, &junction[index])
            );
        }
        for (a, b) in junction
            .edge_indices()
            .filter_map(|edge| junction.edge_endpoints(edge))
        {
            println!("  #{} -- #{}", a.index(), b.index());
        }
        println!();
    }

    let tree = from_interaction_graph(&graph)
        .ok_or_else(|| CliError::Argument("The interaction graph is empty.".to_string()))?;
    println!(
        "Merge tree ({} node(s), depth {}):",
        tree.len(),
        tree.depth()
    );
    print!("{}", render(&tree, &loaded.variables));
    Ok(())
}

fn render(tree: &MergeTree, variables: &VariableTable) -> String {
    let mut out = String::new();
    for (id, depth) in tree.pre_order() {
        let node = tree.node(id);
        let marker = if node.is_leaf() { "-" } else { "+" };
        out.push_str(&format!(
            "{:indent$}{} [{}]\n",
            "",
            marker,
            subset_names(variables, &node.subset),
            indent = depth * 2
        ));
    }
    out
}
