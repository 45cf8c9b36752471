use super::models::ids::VariableId;
use std::fmt;

/// Opaque failure raised by an external provider (domains, filters, scores).
///
/// The engine never interprets these; it wraps them in
/// [`EngineError::Provider`](crate::engine::error::EngineError::Provider) and hands them
/// back to the caller unchanged.
pub type ProviderError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Supplies the size of each variable's candidate-state domain.
///
/// Implementations must be side-effect free: the engine may query them from several
/// threads at once while sibling subtrees are searched in parallel.
pub trait DomainProvider: fmt::Debug + Send + Sync {
    /// Number of candidate states of `variable`; states are `0..num_states`.
    fn num_states(&self, variable: VariableId) -> Result<usize, ProviderError>;

    /// A human readable label, used only for logging and display.
    fn label(&self, variable: VariableId) -> Option<String> {
        let _ = variable;
        None
    }
}

/// A provider error for a variable the provider has never heard of.
#[derive(Debug, thiserror::Error)]
#[error("Unknown variable {0:?}")]
pub struct UnknownVariable(pub VariableId);
