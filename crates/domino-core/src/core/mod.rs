//! # Core Module
//!
//! This module provides the building blocks the search engine operates on.
//!
//! ## Architecture
//!
//! - **Value Types** ([`models`]) - Variables, subsets, assignments and identifiers
//! - **Domains** ([`domain`]) - The domain provider interface and its error type
//! - **Filters** ([`filters`]) - The filter capability traits and built-in filter tables
//! - **Scores** ([`scoring`]) - Additive score terms over small scopes
//! - **Problems** ([`problem`]) - A bundle of providers describing one search problem
//! - **Graphs** ([`graph`]) - Interaction graphs and junction-tree decomposition
//! - **File I/O** ([`io`]) - The TOML problem description format
//!
//! Everything here is free of search state: the engine borrows these values for the
//! duration of one query and never mutates them.

pub mod domain;
pub mod filters;
pub mod graph;
pub mod io;
pub mod models;
pub mod problem;
pub mod scoring;
