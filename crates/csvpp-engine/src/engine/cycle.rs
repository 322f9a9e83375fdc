//! Dependency ordering with cycle detection.
//!
//! Variables must be resolved after everything they reference. A depth-first
//! walk emits each node once all of its dependencies have been emitted; a
//! node reached again while it is still on the walk's path closes a cycle.

use std::collections::HashSet;

use super::deps::DependencyGraph;
use super::error::{EngineError, Result};

/// Order the graph so every node comes after all of its dependencies.
/// A cycle is an error naming the ids that form it, first id repeated last.
pub fn topological_sort(graph: &DependencyGraph) -> Result<Vec<String>> {
    let mut visiting = HashSet::new();
    let mut done = HashSet::new();
    let mut path = Vec::new();
    let mut order = Vec::with_capacity(graph.len());

    for node in graph.nodes() {
        visit(node, graph, &mut visiting, &mut done, &mut path, &mut order)?;
    }
    Ok(order)
}

fn visit(
    current: &str,
    graph: &DependencyGraph,
    visiting: &mut HashSet<String>,
    done: &mut HashSet<String>,
    path: &mut Vec<String>,
    order: &mut Vec<String>,
) -> Result<()> {
    if done.contains(current) {
        return Ok(());
    }
    if visiting.contains(current) {
        let start = path.iter().position(|id| id == current).unwrap_or(0);
        let mut cycle = path[start..].to_vec();
        cycle.push(current.to_string());
        return Err(EngineError::CyclicDependency(cycle));
    }

    visiting.insert(current.to_string());
    path.push(current.to_string());

    for dep in graph.dependencies(current) {
        visit(dep, graph, visiting, done, path, order)?;
    }

    path.pop();
    visiting.remove(current);
    done.insert(current.to_string());
    order.push(current.to_string());
    Ok(())
}
