//! # Workflows Module
//!
//! High-level entry points that run a complete query against a [`Problem`](crate::core::problem::Problem).
//!
//! ## Overview
//!
//! A query names the variables to solve for and a [`SolveConfig`](crate::engine::config::SolveConfig).
//! The workflow resolves domains, plans a merge tree (or a single node, depending on the
//! search strategy), enumerates the leaves, merges their tables bottom-up to the root and
//! returns the root's assignments sorted by score. The table of every node is kept in the
//! result so callers can inspect partial results.
//!
//! ## Architecture
//!
//! - **Solve Workflow** ([`solve`]) - plain, fixed-variable and cancellable queries,
//!   merge-tree planning and variable ordering helpers.

pub mod solve;
