use crate::core::filters::allowed::AllowedStatesFilterTable;
use crate::core::filters::allowed_tuples::AllowedTuplesFilterTable;
use crate::core::filters::disjoint::{
    EqualityFilterTable, EquivalenceFilterTable, ExclusionFilterTable,
};
use crate::core::filters::forbidden::ForbiddenTuplesFilterTable;
use crate::core::models::assignment::Assignment;
use crate::core::models::ids::VariableId;
use crate::core::models::subset::Subset;
use crate::core::models::variable::{VariableTable, VariableTableError};
use crate::core::problem::Problem;
use crate::core::scoring::tabulated::{ScoreTerm, TabulatedScoreTable};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProblemFile {
    /// Number of score limits an assignment may exceed.
    #[serde(rename = "max-violations")]
    max_violations: Option<usize>,
    #[serde(default)]
    variable: Vec<VariableEntry>,
    #[serde(default)]
    filter: Vec<FilterEntry>,
    #[serde(default)]
    score: Vec<ScoreEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VariableEntry {
    name: String,
    states: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "type", deny_unknown_fields)]
enum FilterEntry {
    Exclusion {
        variables: Vec<String>,
    },
    Equality {
        variables: Vec<String>,
    },
    Equivalence {
        variables: Vec<String>,
    },
    AllowedStates {
        variable: String,
        states: Vec<usize>,
    },
    Forbidden {
        variables: Vec<String>,
        tuples: Vec<Vec<usize>>,
    },
    #[serde(alias = "allowed")]
    AllowedTuples {
        variables: Vec<String>,
        tuples: Vec<Vec<usize>>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScoreEntry {
    variables: Vec<String>,
    #[serde(default)]
    default: f64,
    max: Option<f64>,
    #[serde(default)]
    entries: Vec<ScoreTupleEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScoreTupleEntry {
    states: Vec<usize>,
    score: f64,
}

#[derive(Debug, Error)]
pub enum ProblemFileError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Variable '{0}' is declared more than once")]
    DuplicateVariable(String),
    #[error("Unknown variable '{0}' referenced in problem file")]
    UnknownVariable(String),
    #[error("Invalid tuple {states:?} over {variables:?}: {reason}")]
    InvalidTuple {
        variables: Vec<String>,
        states: Vec<usize>,
        reason: String,
    },
}

/// A problem read from disk, along with the table naming its variables.
#[derive(Debug, Clone)]
pub struct LoadedProblem {
    pub variables: Arc<VariableTable>,
    pub problem: Problem,
}

impl LoadedProblem {
    /// Resolves variable names to identifiers.
    pub fn resolve(&self, names: &[String]) -> Result<Vec<VariableId>, ProblemFileError> {
        resolve_names(&self.variables, names)
    }
}

/// Reads a problem description from a TOML file.
///
/// The file declares `[[variable]]` entries (`name`, `states`), `[[filter]]` entries
/// tagged by `type` (`exclusion`, `equality`, `equivalence`, `allowed-states`,
/// `forbidden`, `allowed-tuples`) and `[[score]]` terms (`variables`, `default`, optional
/// `max`, `entries`). A top-level `max-violations` lets assignments exceed that many score
/// limits. Tuples are written in the order the entry lists its variables.
pub fn load_problem(path: &Path) -> Result<LoadedProblem, ProblemFileError> {
    let path_str = path.to_string_lossy().to_string();
    debug!("Loading problem from file: {}", path_str);
    let content = std::fs::read_to_string(path).map_err(|e| ProblemFileError::Io {
        path: path_str.clone(),
        source: e,
    })?;
    parse_problem(&content, &path_str)
}

/// Parses a problem description; `origin` only labels errors.
pub fn parse_problem(content: &str, origin: &str) -> Result<LoadedProblem, ProblemFileError> {
    let file: ProblemFile = toml::from_str(content).map_err(|e| ProblemFileError::Toml {
        path: origin.to_string(),
        source: e,
    })?;

    let mut variables = VariableTable::new();
    for entry in &file.variable {
        variables
            .add(entry.name.clone(), entry.states)
            .map_err(|VariableTableError::DuplicateName(name)| {
                ProblemFileError::DuplicateVariable(name)
            })?;
    }

    let mut exclusion = ExclusionFilterTable::new();
    let mut equality = EqualityFilterTable::new();
    let mut equivalence = EquivalenceFilterTable::new();
    let mut allowed = AllowedStatesFilterTable::new();
    let mut forbidden = ForbiddenTuplesFilterTable::new();
    let mut allowed_tuples = AllowedTuplesFilterTable::new();

    for entry in file.filter {
        match entry {
            FilterEntry::Exclusion { variables: names } => {
                exclusion.add_set(resolve_names(&variables, &names)?);
            }
            FilterEntry::Equality { variables: names } => {
                equality.add_set(resolve_names(&variables, &names)?);
            }
            FilterEntry::Equivalence { variables: names } => {
                equivalence.add_set(resolve_names(&variables, &names)?);
            }
            FilterEntry::AllowedStates { variable, states } => {
                let id = resolve_names(&variables, std::slice::from_ref(&variable))?[0];
                allowed.intersect(id, states);
            }
            FilterEntry::Forbidden {
                variables: names,
                tuples,
            } => {
                let scope = TupleLayout::new(&variables, &names)?;
                let tuples = tuples
                    .into_iter()
                    .map(|t| scope.canonical(&variables, &names, t))
                    .collect::<Result<Vec<_>, _>>()?;
                forbidden.add_term(scope.subset, tuples);
            }
            FilterEntry::AllowedTuples {
                variables: names,
                tuples,
            } => {
                let scope = TupleLayout::new(&variables, &names)?;
                let tuples = tuples
                    .into_iter()
                    .map(|t| scope.canonical(&variables, &names, t))
                    .collect::<Result<Vec<_>, _>>()?;
                allowed_tuples.set_allowed_tuples(scope.subset, tuples);
            }
        }
    }

    let mut scores = TabulatedScoreTable::new();
    if let Some(max_violations) = file.max_violations {
        scores = scores.with_max_violations(max_violations);
    }
    for entry in file.score {
        let layout = TupleLayout::new(&variables, &entry.variables)?;
        let mut term = ScoreTerm::new(layout.subset.clone(), entry.default);
        for tuple in entry.entries {
            let states = layout.canonical(&variables, &entry.variables, tuple.states)?;
            term = term.with_entry(states.into_vec(), tuple.score);
        }
        if let Some(max) = entry.max {
            term = term.with_max(max);
        }
        scores.add_term(term);
    }

    info!(
        variables = variables.len(),
        score_terms = scores.terms().count(),
        "Loaded problem from '{}'",
        origin
    );

    let variables = Arc::new(variables);
    let mut problem = Problem::new(variables.clone())
        .with_filter_table(Arc::new(exclusion))
        .with_filter_table(Arc::new(equality))
        .with_filter_table(Arc::new(equivalence))
        .with_filter_table(Arc::new(allowed))
        .with_filter_table(Arc::new(forbidden))
        .with_filter_table(Arc::new(allowed_tuples));
    let scores = Arc::new(scores);
    if scores.has_limits() {
        problem.add_filter_table(scores.clone());
    }
    problem.add_score_table(scores);

    Ok(LoadedProblem { variables, problem })
}

fn resolve_names(
    table: &VariableTable,
    names: &[String],
) -> Result<Vec<VariableId>, ProblemFileError> {
    names
        .iter()
        .map(|name| {
            table
                .find_by_name(name)
                .ok_or_else(|| ProblemFileError::UnknownVariable(name.clone()))
        })
        .collect()
}

/// How tuples written in file order map onto the canonical order of their scope.
struct TupleLayout {
    subset: Subset,
    /// For each canonical position, the index of that variable in the file's list.
    order: Vec<usize>,
}

impl TupleLayout {
    fn new(table: &VariableTable, names: &[String]) -> Result<Self, ProblemFileError> {
        let ids = resolve_names(table, names)?;
        let subset = Subset::new(ids.iter().copied());
        if subset.len() != ids.len() {
            return Err(ProblemFileError::InvalidTuple {
                variables: names.to_vec(),
                states: Vec::new(),
                reason: "a variable is listed more than once".to_string(),
            });
        }
        let order = subset
            .iter()
            .filter_map(|v| ids.iter().position(|&id| id == v))
            .collect();
        Ok(Self { subset, order })
    }

    fn canonical(
        &self,
        table: &VariableTable,
        names: &[String],
        states: Vec<usize>,
    ) -> Result<Assignment, ProblemFileError> {
        let invalid = |reason: String| ProblemFileError::InvalidTuple {
            variables: names.to_vec(),
            states: states.clone(),
            reason,
        };
        if states.len() != names.len() {
            return Err(invalid(format!(
                "expected {} states, found {}",
                names.len(),
                states.len()
            )));
        }
        for (name, &state) in names.iter().zip(&states) {
            let num_states = table
                .find_by_name(name)
                .and_then(|id| table.get(id))
                .map_or(0, |v| v.num_states);
            if state >= num_states {
                return Err(invalid(format!(
                    "state {} is out of range for '{}' ({} states)",
                    state, name, num_states
                )));
            }
        }
        Ok(self.order.iter().map(|&i| states[i]).collect())
    }
}
