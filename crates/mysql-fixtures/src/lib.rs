//! Foreign-key ordered, transactional fixture seeding for MySQL.
//!
//! A seed run:
//!
//! 1. reads key column usages from `information_schema` ([`introspect_relations`])
//! 2. builds and sorts the dependency graph over the [`SchemaRegistry`]
//! 3. loads `<table>.json` fixtures for every table in order
//! 4. inserts everything inside one transaction, rolling back on any failure
//!
//! The database is reached through the [`SeedDatabase`] trait; [`MySqlDatabase`]
//! is the `mysql_async` implementation and [`testing::InMemoryDatabase`] an
//! in-memory one for tests.

mod catalog;
mod client;
pub mod error;
mod insert;
mod registry;
mod seeder;
pub mod testing;

pub use catalog::{introspect_relations, FOREIGN_KEY_QUERY};
pub use client::{new_mysql_pool, MySqlConfig, MySqlDatabase};
pub use error::RegistryError;
pub use insert::{build_insert_statements, json_to_mysql, InsertStatement, DEFAULT_BATCH_SIZE};
pub use registry::{ColumnDescriptor, SchemaRegistry, TableDescriptor};
pub use seeder::{
    resolve_seed_order, seed, seed_database, SeedDatabase, SeedOptions, SeedReport,
    SeedTransaction,
};

pub use seed_core::{SeedError, SeedResult};
