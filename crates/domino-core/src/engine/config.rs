use super::tree::TreeSpec;
use crate::core::models::assignment::PartialAssignment;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// What happens when a node would hold more than `max_states` assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TruncationPolicy {
    /// Any overflow fails the query with `TooManyStates`.
    #[default]
    Strict,
    /// Merge nodes keep their `max_states` best assignments; leaf enumeration stays strict.
    KeepBest,
}

/// How the assignments of the queried variables are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchStrategy {
    /// Enumerate single-variable leaves and merge them bottom-up along a merge tree.
    #[default]
    MergeTree,
    /// Branch-and-bound over all queried variables at once.
    BranchAndBound,
    /// Check every combination of the queried variables.
    Exhaustive,
}

impl FromStr for TruncationPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Self::Strict),
            "keep-best" => Ok(Self::KeepBest),
            other => Err(ConfigError::InvalidParameter {
                name: "truncation",
                reason: format!("unknown policy '{}'", other),
            }),
        }
    }
}

impl fmt::Display for TruncationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strict => "strict",
            Self::KeepBest => "keep-best",
        })
    }
}

impl FromStr for SearchStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "merge-tree" => Ok(Self::MergeTree),
            "branch-and-bound" => Ok(Self::BranchAndBound),
            "exhaustive" => Ok(Self::Exhaustive),
            other => Err(ConfigError::InvalidParameter {
                name: "strategy",
                reason: format!("unknown strategy '{}'", other),
            }),
        }
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MergeTree => "merge-tree",
            Self::BranchAndBound => "branch-and-bound",
            Self::Exhaustive => "exhaustive",
        })
    }
}

#[derive(Debug, Clone)]
pub struct SolveConfig {
    /// Upper bound on the number of assignments any node may hold.
    pub max_states: usize,
    /// Assignments scoring above this are discarded.
    pub score_ceiling: f64,
    pub truncation: TruncationPolicy,
    pub strategy: SearchStrategy,
    /// A caller-supplied decomposition; derived from the interaction graph when absent.
    pub merge_tree: Option<TreeSpec>,
    pub fixed: PartialAssignment,
    pub cache_filters: bool,
}

#[derive(Default)]
pub struct SolveConfigBuilder {
    max_states: Option<usize>,
    score_ceiling: Option<f64>,
    truncation: Option<TruncationPolicy>,
    strategy: Option<SearchStrategy>,
    merge_tree: Option<TreeSpec>,
    fixed: Option<PartialAssignment>,
    cache_filters: Option<bool>,
}

impl SolveConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_states(mut self, max_states: usize) -> Self {
        self.max_states = Some(max_states);
        self
    }
    pub fn score_ceiling(mut self, ceiling: f64) -> Self {
        self.score_ceiling = Some(ceiling);
        self
    }
    pub fn truncation(mut self, policy: TruncationPolicy) -> Self {
        self.truncation = Some(policy);
        self
    }
    pub fn strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
    pub fn merge_tree(mut self, tree: TreeSpec) -> Self {
        self.merge_tree = Some(tree);
        self
    }
    pub fn fixed(mut self, fixed: PartialAssignment) -> Self {
        self.fixed = Some(fixed);
        self
    }
    pub fn cache_filters(mut self, enabled: bool) -> Self {
        self.cache_filters = Some(enabled);
        self
    }

    pub fn build(self) -> Result<SolveConfig, ConfigError> {
        let max_states = self
            .max_states
            .ok_or(ConfigError::MissingParameter("max_states"))?;
        if max_states == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "max_states",
                reason: "must be at least 1".to_string(),
            });
        }

        let score_ceiling = self.score_ceiling.unwrap_or(f64::INFINITY);
        if score_ceiling.is_nan() || score_ceiling < 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "score_ceiling",
                reason: format!("must be a non-negative number, got {}", score_ceiling),
            });
        }

        Ok(SolveConfig {
            max_states,
            score_ceiling,
            truncation: self.truncation.unwrap_or_default(),
            strategy: self.strategy.unwrap_or_default(),
            merge_tree: self.merge_tree,
            fixed: self.fixed.unwrap_or_default(),
            cache_filters: self.cache_filters.unwrap_or(true),
        })
    }
}
