use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "Domino CLI - find the best joint assignments of discrete variables under subset filters and additive scores.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE).
    /// DOMINO_LOG, when set, takes `tracing` filter directives instead
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs, including per-node span timings, to a file in addition to the console
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Enumerate the admissible assignments of a problem, best first.
    Solve(SolveArgs),
    /// Print the merge tree a query would be merged along.
    Tree(TreeArgs),
    /// Print the order in which a single node would assign its variables.
    Order(QueryArgs),
}

/// The problem and the variables a command works on.
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Path to the problem file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub problem: PathBuf,

    /// Variables to query, by name. Defaults to every variable of the problem.
    #[arg(long = "variables", value_name = "NAME", value_delimiter = ',')]
    pub variables: Vec<String>,
}

/// Arguments for the `solve` subcommand.
#[derive(Args, Debug)]
pub struct SolveArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Path to a settings file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Search Overrides ---
    /// Override the maximum number of assignments any node may hold.
    #[arg(short = 'm', long, value_name = "INT")]
    pub max_states: Option<usize>,

    /// Override the score above which assignments are discarded.
    #[arg(long, value_name = "FLOAT")]
    pub score_ceiling: Option<f64>,

    /// Override the search strategy ('merge-tree', 'branch-and-bound' or 'exhaustive').
    #[arg(long, value_name = "NAME")]
    pub strategy: Option<String>,

    /// Override the truncation policy ('strict' or 'keep-best').
    #[arg(long, value_name = "NAME")]
    pub truncation: Option<String>,

    /// Disable the per-query filter cache, overriding the settings file.
    #[arg(long)]
    pub no_filter_cache: bool,

    /// Fix a variable to a state before searching. Can be used multiple times.
    /// Example: --fix x=2
    #[arg(long = "fix", value_name = "NAME=STATE")]
    pub fixed: Vec<String>,

    // --- Output Overrides ---
    /// Override the number of solutions to print.
    #[arg(short, long, value_name = "INT")]
    pub num_solutions: Option<usize>,

    /// Print solutions projected onto these variables only.
    #[arg(long = "restrict-to", value_name = "NAME", value_delimiter = ',')]
    pub restrict_to: Vec<String>,

    /// Set a specific configuration value, overriding the settings file.
    /// Can be used multiple times. Example: -S search.max-states=5000
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `tree` subcommand.
#[derive(Args, Debug)]
pub struct TreeArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Also print the junction tree the merge tree was derived from.
    #[arg(long)]
    pub junction: bool,
}
