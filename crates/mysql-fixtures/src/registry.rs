//! Static registry of the tables fixture seeding may touch.
//!
//! The registry is an explicit, ordered list of [`TableDescriptor`]s built at
//! startup, either from [`SchemaRegistry::application`] or from a YAML file:
//!
//! ```yaml
//! tables:
//!   - name: user
//!     columns:
//!       - name: id
//!       - name: created_at
//!         field: createdAt
//!   - name: tag
//! ```
//!
//! A table without `columns` accepts fixture keys verbatim as column names.

use crate::error::RegistryError;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// A column a fixture record may populate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name in the database
    pub name: String,
    /// Fixture key that maps to this column when it differs from `name`
    #[serde(default)]
    pub field: Option<String>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: None,
        }
    }

    pub fn with_field(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: Some(field.into()),
        }
    }

    /// Whether a fixture record key refers to this column.
    pub fn matches(&self, key: &str) -> bool {
        self.name == key || self.field.as_deref() == Some(key)
    }
}

/// A declared table and the column mapping used to insert into it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Resolve a fixture record key to a column name.
    ///
    /// Returns `None` when the table declares columns and none of them match.
    pub fn column_for<'a>(&'a self, key: &'a str) -> Option<&'a str> {
        if self.columns.is_empty() {
            return Some(key);
        }
        self.columns
            .iter()
            .find(|column| column.matches(key))
            .map(|column| column.name.as_str())
    }

    /// Position of a column in declaration order, used to order INSERT columns.
    pub(crate) fn column_position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == column)
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    tables: Vec<TableDescriptor>,
}

/// Ordered set of declared tables.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    tables: Vec<TableDescriptor>,
    table_map: HashMap<String, usize>,
}

impl SchemaRegistry {
    /// Build a registry, rejecting duplicate or unquotable names.
    pub fn new(tables: Vec<TableDescriptor>) -> Result<Self, RegistryError> {
        let mut table_map = HashMap::with_capacity(tables.len());

        for (idx, table) in tables.iter().enumerate() {
            validate_identifier(&table.name)?;
            if table_map.insert(table.name.clone(), idx).is_some() {
                return Err(RegistryError::DuplicateTable(table.name.clone()));
            }

            let mut seen = HashSet::new();
            for column in &table.columns {
                validate_identifier(&column.name)?;
                let keys = std::iter::once(&column.name).chain(column.field.as_ref());
                for key in keys {
                    if !seen.insert(key.as_str()) {
                        return Err(RegistryError::DuplicateColumn {
                            table: table.name.clone(),
                            name: key.clone(),
                        });
                    }
                }
            }
        }

        Ok(Self { tables, table_map })
    }

    /// Load registry from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse registry from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_yaml::from_str(yaml)?;
        Self::new(file.tables)
    }

    /// Built-in registry for the application schema.
    pub fn application() -> Self {
        let c = ColumnDescriptor::new;
        let f = ColumnDescriptor::with_field;

        let tables = vec![
            TableDescriptor::new(
                "user",
                vec![c("id"), f("created_at", "createdAt"), c("name"), c("code")],
            ),
            TableDescriptor::new(
                "tag",
                vec![
                    c("id"),
                    f("created_at", "createdAt"),
                    f("created_by", "createdBy"),
                    c("name"),
                    f("is_official", "isOfficial"),
                ],
            ),
            TableDescriptor::new(
                "user_tag_relation",
                vec![
                    c("id"),
                    f("created_at", "createdAt"),
                    f("user_id", "userId"),
                    f("tag_id", "tagId"),
                ],
            ),
            TableDescriptor::new(
                "article",
                vec![
                    c("id"),
                    f("created_at", "createdAt"),
                    f("updated_at", "updatedAt"),
                    c("title"),
                    f("article_path", "articlePath"),
                    f("user_id", "userId"),
                ],
            ),
            TableDescriptor::new(
                "article_tag_relation",
                vec![
                    c("id"),
                    f("created_at", "createdAt"),
                    f("article_id", "articleId"),
                    f("tag_id", "tagId"),
                ],
            ),
        ];

        let table_map = tables
            .iter()
            .enumerate()
            .map(|(idx, table)| (table.name.clone(), idx))
            .collect();
        Self { tables, table_map }
    }

    /// Declared table names in declaration order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    pub fn get_table(&self, name: &str) -> Option<&TableDescriptor> {
        self.table_map.get(name).map(|&idx| &self.tables[idx])
    }

    pub fn tables(&self) -> &[TableDescriptor] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Identifiers are quoted with backticks, so they may not contain one.
pub(crate) fn validate_identifier(name: &str) -> Result<(), RegistryError> {
    if name.is_empty() || name.contains('`') || name.contains('\0') {
        return Err(RegistryError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}
