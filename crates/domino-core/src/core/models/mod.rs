//! Value types shared by every layer of the engine.
//!
//! Subsets and assignments are small, immutable and freely cloned. Variables are referenced
//! through [`ids::VariableId`] handles issued by a [`variable::VariableTable`].

pub mod assignment;
pub mod ids;
pub mod subset;
pub mod variable;
