//! # Domino Engine
//!
//! A library for finding the best joint assignments of discrete variables, each with a
//! finite domain of candidate states, subject to validity filters and additive scores that
//! act on small subsets of those variables.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless value types (`Subset`, `Assignment`,
//!   `VariableTable`), the provider traits through which the engine sees the outside world
//!   (`DomainProvider`, `FilterTable`, `ScoreTable`), the built-in filter and score tables,
//!   interaction-graph utilities (junction trees) and the TOML problem format.
//!
//! - **[`engine`]: The Logic Core.** Query configuration, the binary merge tree, greedy
//!   variable ordering, branch-and-bound enumeration, the dynamic-programming merge of
//!   sibling tables and the truncation policy.
//!
//! - **[`workflows`]: The Public API.** Drives a complete query: builds or validates the
//!   merge tree, enumerates the leaves, merges bottom-up to the root and hands back sorted
//!   results together with per-node tables for introspection.

pub mod core;
pub mod engine;
pub mod workflows;
