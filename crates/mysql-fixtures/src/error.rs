//! Error types for the schema registry.

use thiserror::Error;

/// Errors that can occur while building or loading a schema registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Registry file could not be read.
    #[error("Failed to read registry file: {0}")]
    Io(#[from] std::io::Error),

    /// Registry file is not valid YAML or has the wrong shape.
    #[error("Invalid registry YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The same table is declared twice.
    #[error("Table '{0}' is declared more than once")]
    DuplicateTable(String),

    /// Two columns of one table share a column name or field alias.
    #[error("Table '{table}' declares '{name}' more than once")]
    DuplicateColumn { table: String, name: String },

    /// Table or column name that cannot be quoted as a MySQL identifier.
    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),
}
