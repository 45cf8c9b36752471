use super::ids::VariableId;
use super::subset::Subset;
use crate::core::domain::{DomainProvider, ProviderError, UnknownVariable};
use slotmap::SlotMap;
use std::collections::HashMap;
use thiserror::Error;

/// A discrete unknown with a fixed domain `0..num_states`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub num_states: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VariableTableError {
    #[error("A variable named '{0}' already exists")]
    DuplicateName(String),
}

/// In-memory domain provider owning a set of named variables.
///
/// Identifiers are issued in insertion order, so the canonical order of a [`Subset`]
/// built from this table follows the order in which variables were added.
#[derive(Debug, Default, Clone)]
pub struct VariableTable {
    variables: SlotMap<VariableId, Variable>,
    by_name: HashMap<String, VariableId>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        name: impl Into<String>,
        num_states: usize,
    ) -> Result<VariableId, VariableTableError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(VariableTableError::DuplicateName(name));
        }
        let id = self.variables.insert(Variable {
            name: name.clone(),
            num_states,
        });
        self.by_name.insert(name, id);
        Ok(id)
    }

    pub fn get(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<VariableId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: VariableId) -> Option<&str> {
        self.variables.get(id).map(|v| v.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VariableId, &Variable)> {
        self.variables.iter()
    }

    /// Every variable of the table as one subset.
    pub fn all(&self) -> Subset {
        self.variables.keys().collect()
    }
}

impl DomainProvider for VariableTable {
    fn num_states(&self, variable: VariableId) -> Result<usize, ProviderError> {
        self.variables
            .get(variable)
            .map(|v| v.num_states)
            .ok_or_else(|| Box::new(UnknownVariable(variable)) as ProviderError)
    }

    fn label(&self, variable: VariableId) -> Option<String> {
        self.name(variable).map(str::to_string)
    }
}
