//! Computational units of a query.
//!
//! Each submodule performs one step: ordering variables for enumeration, enumerating the
//! admissible states of a node, merging two sibling tables, and truncating oversized ones.

pub mod enumeration;
pub mod merge;
pub mod ordering;
pub mod truncation;
