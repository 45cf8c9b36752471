use crate::cli::SolveArgs;
use crate::error::{CliError, Result};
use crate::utils::parser;
use domino_engine::core::models::assignment::PartialAssignment;
use domino_engine::core::models::variable::VariableTable;
use domino_engine::engine::config::{self as core_config, SearchStrategy, TruncationPolicy};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

const DEFAULT_MAX_STATES: usize = 100_000;
const DEFAULT_NUM_SOLUTIONS: usize = 10;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialSearchConfig {
    #[serde(rename = "max-states")]
    max_states: Option<usize>,
    #[serde(rename = "score-ceiling")]
    score_ceiling: Option<f64>,
    strategy: Option<String>,
    truncation: Option<String>,
    #[serde(rename = "cache-filters")]
    cache_filters: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialOutputConfig {
    #[serde(rename = "num-solutions")]
    num_solutions: Option<usize>,
}

/// A settings file as written by the user; every field is optional.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialSolveSettings {
    search: Option<PartialSearchConfig>,
    output: Option<PartialOutputConfig>,
}

/// Fully resolved settings of a `solve` invocation.
#[derive(Debug)]
pub struct SolveSettings {
    pub core: core_config::SolveConfig,
    pub num_solutions: usize,
}

impl PartialSolveSettings {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading settings from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Resolves the final settings. Flags win over `-S` overrides, which win over the file.
    pub fn merge_with_cli(
        mut self,
        args: &SolveArgs,
        variables: &VariableTable,
    ) -> Result<SolveSettings> {
        self.apply_set_values(&args.set_values)?;

        let search = self.search.take().unwrap_or_default();
        let output = self.output.take().unwrap_or_default();

        let strategy = args
            .strategy
            .as_deref()
            .or(search.strategy.as_deref())
            .map(str::parse::<SearchStrategy>)
            .transpose()
            .map_err(|e| CliError::Config(e.to_string()))?;
        let truncation = args
            .truncation
            .as_deref()
            .or(search.truncation.as_deref())
            .map(str::parse::<TruncationPolicy>)
            .transpose()
            .map_err(|e| CliError::Config(e.to_string()))?;

        let mut builder = core_config::SolveConfigBuilder::new()
            .max_states(
                args.max_states
                    .or(search.max_states)
                    .unwrap_or(DEFAULT_MAX_STATES),
            )
            .strategy(strategy.unwrap_or_default())
            .truncation(truncation.unwrap_or_default())
            .fixed(Self::resolve_fixed(&args.fixed, variables)?);

        if let Some(ceiling) = args.score_ceiling.or(search.score_ceiling) {
            builder = builder.score_ceiling(ceiling);
        }
        builder = builder.cache_filters(if args.no_filter_cache {
            false
        } else {
            search.cache_filters.unwrap_or(true)
        });

        let core = builder.build().map_err(|e| CliError::Config(e.to_string()))?;
        Ok(SolveSettings {
            core,
            num_solutions: args
                .num_solutions
                .or(output.num_solutions)
                .unwrap_or(DEFAULT_NUM_SOLUTIONS),
        })
    }

    fn resolve_fixed(fixed: &[String], variables: &VariableTable) -> Result<PartialAssignment> {
        let mut resolved = PartialAssignment::new();
        for entry in fixed {
            let (name, state) =
                parser::parse_fixed_state(entry).map_err(|e| CliError::Argument(e.to_string()))?;
            let id = variables.find_by_name(name).ok_or_else(|| {
                CliError::Argument(format!("Unknown variable '{}' in --fix", name))
            })?;
            if resolved.insert(id, state).is_some() {
                return Err(CliError::Argument(format!(
                    "Variable '{}' is fixed more than once",
                    name
                )));
            }
        }
        Ok(resolved)
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value_str) =
                parser::parse_key_value(kv_pair).map_err(|e| CliError::Config(e.to_string()))?;
            let invalid = |kind: &str| {
                CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value_str))
            };

            match key {
                "search.max-states" => {
                    self.search.get_or_insert_with(Default::default).max_states =
                        Some(value_str.parse().map_err(|_| invalid("integer"))?);
                }
                "search.score-ceiling" => {
                    self.search.get_or_insert_with(Default::default).score_ceiling =
                        Some(value_str.parse().map_err(|_| invalid("float"))?);
                }
                "search.strategy" => {
                    self.search.get_or_insert_with(Default::default).strategy =
                        Some(value_str.to_string());
                }
                "search.truncation" => {
                    self.search.get_or_insert_with(Default::default).truncation =
                        Some(value_str.to_string());
                }
                "search.cache-filters" => {
                    self.search.get_or_insert_with(Default::default).cache_filters =
                        Some(value_str.parse().map_err(|_| invalid("boolean"))?);
                }
                "output.num-solutions" => {
                    self.output.get_or_insert_with(Default::default).num_solutions =
                        Some(value_str.parse().map_err(|_| invalid("integer"))?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unknown configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}
