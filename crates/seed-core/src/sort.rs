//! Topological ordering of the dependency graph.
//!
//! Depth-first traversal with an explicit stack, so large schemas cannot
//! exhaust the call stack. Each table carries one of three marks; meeting a
//! table that is still in progress means the graph has a cycle.

use crate::error::{SeedError, SeedResult};
use crate::graph::DependencyGraph;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

struct Frame {
    node: usize,
    next_dependency: usize,
}

/// Order every table after all of its dependencies.
///
/// Roots are taken in the graph's declaration order and dependencies in the
/// order they were discovered, so identical input always yields identical
/// output. Any cycle, including a table referencing itself, aborts the sort.
pub fn topological_sort(graph: &DependencyGraph) -> SeedResult<Vec<String>> {
    let nodes = graph.nodes();
    let mut marks = vec![Mark::Unvisited; nodes.len()];
    let mut sorted = Vec::with_capacity(nodes.len());
    let mut stack: Vec<Frame> = Vec::new();

    for root in 0..nodes.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }

        marks[root] = Mark::InProgress;
        stack.push(Frame {
            node: root,
            next_dependency: 0,
        });

        while let Some(frame) = stack.last_mut() {
            let (name, dependencies) = nodes
                .get_index(frame.node)
                .expect("stack frames only hold valid node indices");

            let Some(dependency) = dependencies.get_index(frame.next_dependency) else {
                marks[frame.node] = Mark::Done;
                sorted.push(name.clone());
                stack.pop();
                continue;
            };
            frame.next_dependency += 1;

            let index =
                nodes
                    .get_index_of(dependency)
                    .ok_or_else(|| SeedError::UndeclaredTable {
                        table: dependency.clone(),
                        referenced_by: Some(name.clone()),
                    })?;

            match marks[index] {
                Mark::Done => {}
                Mark::InProgress => {
                    return Err(SeedError::CycleDetected {
                        table: dependency.clone(),
                    });
                }
                Mark::Unvisited => {
                    marks[index] = Mark::InProgress;
                    stack.push(Frame {
                        node: index,
                        next_dependency: 0,
                    });
                }
            }
        }
    }

    debug!("Seed order: {}", sorted.join(", "));
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Relation;

    fn graph(tables: &[&str], edges: &[(&str, &str)]) -> DependencyGraph {
        let relations: Vec<Relation> = edges
            .iter()
            .map(|(table, referenced)| Relation::new(*table, *referenced))
            .collect();
        DependencyGraph::build(tables.iter().copied(), &relations).unwrap()
    }

    fn position(order: &[String], table: &str) -> usize {
        order.iter().position(|t| t == table).unwrap()
    }

    #[test]
    fn test_user_tag_article_order() {
        let g = graph(
            &["user", "tag", "article"],
            &[("tag", "user"), ("article", "user")],
        );
        assert_eq!(g.sort().unwrap(), vec!["user", "tag", "article"]);
    }

    #[test]
    fn test_dependencies_precede_dependents_regardless_of_declaration() {
        let g = graph(
            &[
                "article_tag_relation",
                "user_tag_relation",
                "article",
                "tag",
                "user",
            ],
            &[
                ("article_tag_relation", "article"),
                ("article_tag_relation", "tag"),
                ("user_tag_relation", "user"),
                ("user_tag_relation", "tag"),
                ("article", "user"),
                ("tag", "user"),
            ],
        );
        let order = g.sort().unwrap();
        assert_eq!(
            order,
            vec![
                "user",
                "article",
                "tag",
                "article_tag_relation",
                "user_tag_relation"
            ]
        );
        assert!(position(&order, "tag") < position(&order, "user_tag_relation"));
    }

    #[test]
    fn test_repeated_sorts_are_identical() {
        let g = graph(
            &["c", "b", "a", "d"],
            &[("c", "a"), ("b", "a"), ("d", "c"), ("d", "b")],
        );
        let first = g.sort().unwrap();
        for _ in 0..10 {
            assert_eq!(g.sort().unwrap(), first);
        }
    }

    #[test]
    fn test_two_node_cycle() {
        let g = graph(&["a", "b"], &[("a", "b"), ("b", "a")]);
        match g.sort().unwrap_err() {
            SeedError::CycleDetected { table } => assert_eq!(table, "a"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let g = graph(&["user", "category"], &[("category", "category")]);
        match g.sort().unwrap_err() {
            SeedError::CycleDetected { table } => assert_eq!(table, "category"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_cycle_behind_acyclic_prefix() {
        let g = graph(
            &["root", "x", "y", "z"],
            &[("x", "root"), ("x", "y"), ("y", "z"), ("z", "x")],
        );
        assert!(matches!(
            g.sort(),
            Err(SeedError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_empty_graph() {
        let g = graph(&[], &[]);
        assert!(g.sort().unwrap().is_empty());
    }

    #[test]
    fn test_long_chain_does_not_recurse() {
        let names: Vec<String> = (0..20_000).map(|i| format!("t{i}")).collect();
        let relations: Vec<Relation> = names
            .windows(2)
            .map(|pair| Relation::new(pair[0].clone(), pair[1].clone()))
            .collect();
        let g = DependencyGraph::build(names.iter().map(String::as_str), &relations).unwrap();
        let order = g.sort().unwrap();
        assert_eq!(order.first().map(String::as_str), Some("t19999"));
        assert_eq!(order.last().map(String::as_str), Some("t0"));
    }
}
