//! Error types for dependency ordering, fixture loading and seeding.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error used to keep driver-specific errors out of this crate's API.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while planning or applying a database seed.
///
/// Every variant except [`SeedError::Insert`] and [`SeedError::Cancelled`] is
/// raised before a transaction is opened, so no rows have been written.
#[derive(Error, Debug)]
pub enum SeedError {
    /// The catalog references a table that is not in the registry.
    #[error("{}", undeclared_message(.table, .referenced_by.as_deref()))]
    UndeclaredTable {
        table: String,
        /// Set when `table` was found as the target of another table's foreign key.
        referenced_by: Option<String>,
    },

    /// The dependency graph contains a cycle passing through `table`.
    #[error("Dependency cycle detected at table '{table}'")]
    CycleDetected { table: String },

    /// The fixture directory could not be listed.
    #[error("Failed to read fixture directory {}: {source}", .path.display())]
    FixtureDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A fixture file exists but is unreadable or not an array of objects.
    #[error("Invalid fixture for table '{table}' ({}): {reason}", .path.display())]
    FixtureParse {
        table: String,
        path: PathBuf,
        reason: String,
    },

    /// A table in the seed order has no registered insert handle.
    #[error("No table descriptor registered for '{table}'")]
    MissingHandle { table: String },

    /// Inserting fixture records failed; the transaction has been rolled back.
    #[error("Failed to insert fixture rows into '{table}': {reason}")]
    Insert { table: String, reason: String },

    /// Catalog query, connection or transaction control failure.
    #[error("Database error while {operation}: {source}")]
    Database {
        operation: String,
        #[source]
        source: BoxError,
    },

    /// The run was cancelled or hit its deadline before committing.
    #[error("Seeding cancelled before commit; transaction rolled back")]
    Cancelled,
}

fn undeclared_message(table: &str, referenced_by: Option<&str>) -> String {
    match referenced_by {
        Some(dependent) => format!(
            "Table '{table}' (referenced by '{dependent}') is not declared in the schema registry"
        ),
        None => format!("Table '{table}' is not declared in the schema registry"),
    }
}

impl SeedError {
    /// Wrap a driver error with a short description of what was being done.
    pub fn database<E>(operation: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        SeedError::Database {
            operation: operation.into(),
            source: source.into(),
        }
    }
}

/// Result type alias for seeding operations.
pub type SeedResult<T> = Result<T, SeedError>;
