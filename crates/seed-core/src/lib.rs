//! Planning for dependency-aware fixture seeding.
//!
//! This crate holds the database-agnostic half of a seed run:
//!
//! - [`DependencyGraph`] built from declared tables and catalog [`Relation`]s
//! - [`topological_sort`] ordering tables so referenced rows are inserted first
//! - [`FixtureLoader`] mapping table names to `<table>.json` fixtures
//! - [`SeedError`], shared with the database crates that apply the plan
//!
//! # Example
//!
//! ```
//! use seed_core::{DependencyGraph, Relation};
//!
//! let relations = vec![Relation::new("tag", "user"), Relation::new("article", "user")];
//! let graph = DependencyGraph::build(["user", "tag", "article"], &relations).unwrap();
//! assert_eq!(graph.sort().unwrap(), vec!["user", "tag", "article"]);
//! ```

pub mod error;
mod fixture;
mod graph;
mod sort;

pub use error::{BoxError, SeedError, SeedResult};
pub use fixture::{Fixture, FixtureLoader, PlannedFixture, Record, FIXTURE_EXTENSION};
pub use graph::{filter_relations, DependencyGraph, Relation};
pub use sort::topological_sort;
