//! Dependency extraction for statically defined variables.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::cell_ref::CellRef;
use super::entity::Entity;
use super::error::{EngineError, Result};
use crate::builtins;

/// Every variable id referenced anywhere in `entity`, deduplicated, in
/// depth-first order of first appearance.
///
/// Builtin variables and ids that read as a cell with a row (`a1`, `b12`)
/// are skipped unless `defined` says otherwise: they resolve without static
/// ordering. Column arguments to builtin functions (`cellabove(b)`) are
/// skipped for the same reason.
pub fn extract_variable_references(entity: &Entity, defined: &impl Fn(&str) -> bool) -> Vec<String> {
    let mut found = Vec::new();
    collect(entity, defined, &mut found);
    found
}

fn collect(entity: &Entity, defined: &impl Fn(&str) -> bool, found: &mut Vec<String>) {
    match entity {
        Entity::Reference(id) => {
            if found.contains(id) {
                return;
            }
            if defined(id) || !resolves_without_definition(id) {
                found.push(id.clone());
            }
        }
        Entity::FunctionCall(call) if builtins::function(&call.id).is_some() => {
            for argument in &call.arguments {
                match argument {
                    Entity::Reference(id) if !defined(id) && CellRef::from_str(id).is_some() => {}
                    other => collect(other, defined, found),
                }
            }
        }
        Entity::Function(function) => {
            let mut inner = Vec::new();
            collect(&function.body, defined, &mut inner);
            for id in inner {
                if !function.arguments.contains(&id) && !found.contains(&id) {
                    found.push(id);
                }
            }
        }
        _ => {
            for child in entity.children() {
                collect(child, defined, found);
            }
        }
    }
}

fn resolves_without_definition(id: &str) -> bool {
    builtins::variable(id).is_some() || CellRef::from_str(id).is_some_and(|r| r.row.is_some())
}

/// Variable id -> the other variable ids its definition references.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Build the graph for a set of variable definitions. Any reference to an
    /// id outside the set is reported, all at once, before anything is sorted.
    pub fn new(variables: &HashMap<String, Entity>) -> Result<Self> {
        let defined = |id: &str| variables.contains_key(id);
        let mut edges = BTreeMap::new();
        let mut undefined = BTreeSet::new();

        for (id, entity) in variables {
            let references = extract_variable_references(entity, &defined);
            undefined.extend(references.iter().filter(|r| !defined(r)).cloned());
            edges.insert(id.clone(), references);
        }

        if !undefined.is_empty() {
            return Err(EngineError::UndefinedVariables(undefined.into_iter().collect()));
        }
        Ok(DependencyGraph { edges })
    }

    /// Build directly from adjacency lists. Edge targets without their own
    /// entry are added as leaves.
    pub fn from_edges<I, S>(edges: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<S>)>,
        S: Into<String>,
    {
        let mut graph = BTreeMap::new();
        for (id, targets) in edges {
            let targets: Vec<String> = targets.into_iter().map(Into::into).collect();
            for target in &targets {
                graph.entry(target.clone()).or_insert_with(Vec::new);
            }
            graph.insert(id.into(), targets);
        }
        DependencyGraph { edges: graph }
    }

    /// Node ids in sorted order.
    pub fn nodes(&self) -> impl Iterator<Item = &String> {
        self.edges.keys()
    }

    /// Direct dependencies of `id`, in the order they were collected.
    pub fn dependencies(&self, id: &str) -> &[String] {
        self.edges.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parse_formula;

    fn refs(formula: &str, defined: &[&str]) -> Vec<String> {
        let ast = parse_formula(formula).unwrap();
        extract_variable_references(&ast, &|id: &str| defined.contains(&id))
    }

    #[test]
    fn test_extract_in_first_appearance_order() {
        assert_eq!(
            refs("=ADD($$b, MUL($$a, $$b)) + $$c", &["a", "b", "c"]),
            vec!["b", "a", "c"]
        );
    }

    #[test]
    fn test_extract_skips_builtins_and_cells() {
        assert_eq!(refs("=$$rownum + A1 + $$x", &["x"]), vec!["x"]);
        assert!(refs("=cellabove(B) * 2", &[]).is_empty());
    }

    #[test]
    fn test_defined_names_win_over_cell_syntax() {
        assert_eq!(refs("=a1 + 1", &["a1"]), vec!["a1"]);
    }

    #[test]
    fn test_unknown_names_are_still_reported() {
        assert_eq!(refs("=$$nope", &[]), vec!["nope"]);
    }

    #[test]
    fn test_graph_reports_every_undefined_variable() {
        let variables = HashMap::from([
            ("a".to_string(), parse_formula("=$$zed + $$b").unwrap()),
            ("b".to_string(), parse_formula("=$$alpha").unwrap()),
        ]);
        assert_eq!(
            DependencyGraph::new(&variables),
            Err(EngineError::UndefinedVariables(vec!["alpha".into(), "zed".into()]))
        );
    }

    #[test]
    fn test_graph_edges() {
        let variables = HashMap::from([
            ("a".to_string(), parse_formula("=$$b * $$b").unwrap()),
            ("b".to_string(), Entity::Number(2.0)),
        ]);
        let graph = DependencyGraph::new(&variables).unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.dependencies("a"), ["b".to_string()]);
        assert!(graph.dependencies("b").is_empty());
    }

    #[test]
    fn test_from_edges_adds_leaves() {
        let graph = DependencyGraph::from_edges([("a", vec!["b"])]);
        assert_eq!(graph.nodes().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
