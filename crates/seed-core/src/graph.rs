//! Foreign-key dependency graph over declared tables.
//!
//! The graph maps each declared table to the set of tables it references.
//! Both levels use insertion-ordered containers so that a given registry and
//! catalog always produce the same seed order.

use crate::error::{SeedError, SeedResult};
use indexmap::{IndexMap, IndexSet};
use tracing::debug;

/// A foreign-key usage read from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relation {
    /// Table owning the foreign-key column
    pub table: String,
    /// Table the column points at; `None` for non-FK key usages (e.g. primary keys)
    pub referenced_table: Option<String>,
}

impl Relation {
    pub fn new(table: impl Into<String>, referenced_table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            referenced_table: Some(referenced_table.into()),
        }
    }
}

/// Drop key usages that do not reference another table.
pub fn filter_relations(rows: impl IntoIterator<Item = Relation>) -> Vec<Relation> {
    rows.into_iter()
        .filter(|relation| relation.referenced_table.is_some())
        .collect()
}

/// Mapping from table name to the tables it depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    nodes: IndexMap<String, IndexSet<String>>,
}

impl DependencyGraph {
    /// Build the graph for `declared` tables from catalog `relations`.
    ///
    /// Every declared table becomes a node, even without relations. A relation
    /// naming an undeclared table on either side fails the whole build.
    pub fn build<'a, I>(declared: I, relations: &[Relation]) -> SeedResult<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut nodes: IndexMap<String, IndexSet<String>> = declared
            .into_iter()
            .map(|name| (name.to_string(), IndexSet::new()))
            .collect();

        for relation in relations {
            let Some(referenced) = relation.referenced_table.as_deref() else {
                continue;
            };

            if !nodes.contains_key(&relation.table) {
                return Err(SeedError::UndeclaredTable {
                    table: relation.table.clone(),
                    referenced_by: None,
                });
            }
            if !nodes.contains_key(referenced) {
                return Err(SeedError::UndeclaredTable {
                    table: referenced.to_string(),
                    referenced_by: Some(relation.table.clone()),
                });
            }

            let dependencies = &mut nodes[relation.table.as_str()];
            dependencies.insert(referenced.to_string());
        }

        debug!(
            "Built dependency graph with {} tables and {} edges",
            nodes.len(),
            nodes.values().map(IndexSet::len).sum::<usize>()
        );

        Ok(Self { nodes })
    }

    /// Tables in declaration order.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Direct dependencies of `table`, in discovery order.
    pub fn dependencies(&self, table: &str) -> Option<&IndexSet<String>> {
        self.nodes.get(table)
    }

    pub fn contains(&self, table: &str) -> bool {
        self.nodes.contains_key(table)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Order the tables so each one follows everything it depends on.
    pub fn sort(&self) -> SeedResult<Vec<String>> {
        crate::sort::topological_sort(self)
    }

    pub(crate) fn nodes(&self) -> &IndexMap<String, IndexSet<String>> {
        &self.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_tables_without_relations_are_nodes() {
        let graph = DependencyGraph::build(["user", "tag"], &[]).unwrap();
        assert_eq!(graph.tables().collect::<Vec<_>>(), vec!["user", "tag"]);
        assert!(graph.dependencies("user").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_relations_collapse() {
        let relations = vec![
            Relation::new("user_tag_relation", "user"),
            Relation::new("user_tag_relation", "tag"),
            Relation::new("user_tag_relation", "user"),
        ];
        let graph =
            DependencyGraph::build(["user", "tag", "user_tag_relation"], &relations).unwrap();
        let deps: Vec<_> = graph
            .dependencies("user_tag_relation")
            .unwrap()
            .iter()
            .cloned()
            .collect();
        assert_eq!(deps, vec!["user", "tag"]);
    }

    #[test]
    fn test_undeclared_dependent_table() {
        let relations = vec![Relation::new("audit_log", "user")];
        let err = DependencyGraph::build(["user"], &relations).unwrap_err();
        match err {
            SeedError::UndeclaredTable {
                table,
                referenced_by,
            } => {
                assert_eq!(table, "audit_log");
                assert_eq!(referenced_by, None);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_undeclared_referenced_table() {
        let relations = vec![Relation::new("article", "account")];
        let err = DependencyGraph::build(["article"], &relations).unwrap_err();
        match err {
            SeedError::UndeclaredTable {
                table,
                referenced_by,
            } => {
                assert_eq!(table, "account");
                assert_eq!(referenced_by.as_deref(), Some("article"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_null_references_are_ignored() {
        let rows = vec![
            Relation {
                table: "user".to_string(),
                referenced_table: None,
            },
            Relation::new("tag", "user"),
            Relation {
                table: "not_declared".to_string(),
                referenced_table: None,
            },
        ];
        let relations = filter_relations(rows);
        assert_eq!(relations, vec![Relation::new("tag", "user")]);

        let graph = DependencyGraph::build(["user", "tag"], &relations).unwrap();
        assert!(graph.dependencies("tag").unwrap().contains("user"));
    }

    #[test]
    fn test_self_reference_is_kept_as_edge() {
        let relations = vec![Relation::new("category", "category")];
        let graph = DependencyGraph::build(["category"], &relations).unwrap();
        assert!(graph.dependencies("category").unwrap().contains("category"));
    }
}
