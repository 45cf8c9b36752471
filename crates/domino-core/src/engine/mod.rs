//! # Engine Module
//!
//! This module implements the search machinery: merge-tree construction, branch-and-bound
//! enumeration of node states, and the dynamic-programming merge of sibling tables.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Query parameters and their builder
//! - **Merge Trees** ([`tree`]) - Binary merge trees, their validation and construction
//! - **Scored Tables** ([`table`], [`state`]) - Per-node sets of scored assignments
//! - **Progress Monitoring** ([`progress`]) - Callbacks for front ends
//! - **Cancellation** ([`cancel`]) - Cooperative cancellation of a running query
//! - **Error Handling** ([`error`]) - Engine-specific error types
//!
//! Search state lives in a per-query context; nothing in this module is global.

pub(crate) mod cache;
pub mod cancel;
pub mod config;
pub(crate) mod context;
pub mod error;
pub mod progress;
pub mod state;
pub mod table;
pub(crate) mod tasks;
pub mod tree;
