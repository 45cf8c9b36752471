use super::{format_assignment, query_variables, subset_names};
use crate::cli::SolveArgs;
use crate::config::PartialSolveSettings;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use domino_engine::core::io::problem_file::load_problem;
use domino_engine::core::models::subset::Subset;
use domino_engine::engine::progress::ProgressReporter;
use domino_engine::workflows;
use tracing::{info, warn};

pub fn run(args: SolveArgs) -> Result<()> {
    info!("Loading problem from {:?}", &args.query.problem);
    let loaded = load_problem(&args.query.problem)?;

    let partial_settings = match &args.config {
        Some(path) => PartialSolveSettings::from_file(path)?,
        None => PartialSolveSettings::default(),
    };
    info!("Merging settings from file and CLI arguments...");
    let settings = partial_settings.merge_with_cli(&args, &loaded.variables)?;
    let variables = query_variables(&loaded, &args.query.variables)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Searching {} variable(s) with strategy '{}'...",
        variables.len(),
        settings.core.strategy
    );
    let result = workflows::solve::run(&loaded.problem, &variables, &settings.core, &reporter)?;
    info!(
        "Workflow finished, received {} assignment(s).",
        result.len()
    );

    let (shown_subset, solutions) = if args.restrict_to.is_empty() {
        (variables.clone(), result.solutions().to_vec())
    } else {
        let subset = Subset::new(loaded.resolve(&args.restrict_to)?);
        let restricted = result.restricted_to(&subset)?;
        (subset, restricted)
    };

    if solutions.is_empty() {
        warn!("Search completed but found no admissible assignment.");
        println!("Warning: no admissible assignment exists.");
        return Ok(());
    }

    println!(
        "Found {} admissible assignment(s) over [{}]; showing the best {}.",
        solutions.len(),
        subset_names(&loaded.variables, &shown_subset),
        settings.num_solutions.min(solutions.len())
    );
    for (rank, solution) in solutions.iter().take(settings.num_solutions).enumerate() {
        println!(
            "{:>4}  {:>12.4}  {}",
            rank + 1,
            solution.score,
            format_assignment(&loaded.variables, &shown_subset, &solution.assignment)
        );
    }
    Ok(())
}
