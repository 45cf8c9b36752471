use super::query_variables;
use crate::cli::QueryArgs;
use crate::error::Result;
use domino_engine::core::io::problem_file::load_problem;
use domino_engine::workflows;
use tracing::info;

pub fn run(args: QueryArgs) -> Result<()> {
    info!("Loading problem from {:?}", &args.problem);
    let loaded = load_problem(&args.problem)?;
    let variables = query_variables(&loaded, &args.variables)?;

    let order = workflows::solve::variable_order(&loaded.problem, &variables);
    println!("Enumeration order ({} variable(s)):", order.len());
    for (position, variable) in order.iter().enumerate() {
        println!(
            "{:>4}  {}",
            position + 1,
            loaded.variables.name(*variable).unwrap_or("?")
        );
    }
    Ok(())
}
