use thiserror::Error;

use super::config::ConfigError;
use crate::core::domain::ProviderError;
use crate::core::models::assignment::Assignment;
use crate::core::models::ids::VariableId;
use crate::core::models::subset::Subset;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Not a valid merge tree: {reason}")]
    NotATree { reason: String },

    #[error("Variable {variable:?} has no candidate states")]
    EmptyDomain { variable: VariableId },

    #[error(
        "Subset {subset} has more than {max_states} admissible states (last admitted {last_state})"
    )]
    TooManyStates {
        subset: Subset,
        max_states: usize,
        /// The last assignment that still fit under `max_states`.
        last_state: Assignment,
    },

    #[error("No assignment table exists for subset {subset}")]
    UnknownSubset { subset: Subset },

    #[error("Search was cancelled")]
    Cancelled,

    #[error("External provider failed: {source}")]
    Provider {
        #[from]
        source: ProviderError,
    },

    #[error("Score table returned {score} for subset {subset}; scores must be non-negative")]
    InvalidScore { subset: Subset, score: f64 },

    #[error(
        "Fixed state {state} of variable {variable:?} is out of range ({num_states} states)"
    )]
    FixedStateOutOfRange {
        variable: VariableId,
        state: usize,
        num_states: usize,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal logic error: {0}")]
    Internal(String),
}

impl EngineError {
    pub(crate) fn not_a_tree(reason: impl Into<String>) -> Self {
        Self::NotATree {
            reason: reason.into(),
        }
    }
}
