//! Variable and function definitions for one compiled source file.
//!
//! Ids are case-folded before storage and lookup. User definitions always
//! win; the builtin registry is consulted only when the user maps miss.

use log::debug;
use std::collections::HashMap;

use super::cell_ref::CellRef;
use super::deps::DependencyGraph;
use super::cycle::topological_sort;
use super::entity::{CellReference, Entity, ExpandScope, Function, Position, RuntimeValue};
use super::error::{EngineError, Result};
use crate::builtins;

/// What a function id refers to.
#[derive(Clone, Debug, PartialEq)]
pub enum FunctionLookup<'a> {
    User(&'a Function),
    Builtin(RuntimeValue),
}

#[derive(Clone, Debug, Default)]
pub struct Scope {
    variables: HashMap<String, Entity>,
    functions: HashMap<String, Function>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or redefine) a variable. Last write wins.
    pub fn define_variable(&mut self, id: &str, entity: Entity) {
        self.variables.insert(id.to_lowercase(), entity);
    }

    /// Define (or redefine) a function. Last write wins.
    pub fn define_function(&mut self, id: &str, function: Function) {
        self.functions.insert(id.to_lowercase(), function);
    }

    /// Bind `id` to a spreadsheet cell, as `[[var=id]]` does. Inside an
    /// expand the binding only exists for the expand's rows.
    pub fn bind_cell_variable(&mut self, id: &str, cell_ref: CellRef, expand: Option<ExpandScope>) {
        let mut reference = CellReference::new(cell_ref);
        reference.scoped_to_expand = expand;
        self.define_variable(id, Entity::CellReference(reference));
    }

    /// True if `id` is a user variable or a builtin variable.
    pub fn is_variable_defined(&self, id: &str) -> bool {
        let id = id.to_lowercase();
        self.variables.contains_key(&id) || builtins::variable(&id).is_some()
    }

    /// True if `id` is a user function or a builtin function.
    pub fn is_function_defined(&self, id: &str) -> bool {
        let id = id.to_lowercase();
        self.functions.contains_key(&id) || builtins::function(&id).is_some()
    }

    /// True if `id` names a variable that can be referenced from `position`.
    /// Expand-scoped bindings are only visible on their expand's rows.
    pub fn is_in_scope(&self, id: &str, position: &Position) -> bool {
        let id = id.to_lowercase();
        match self.variables.get(&id) {
            Some(entity) => expand_scope_of(entity).is_none_or(|s| s.contains(position.row_index)),
            None => builtins::variable(&id).is_some(),
        }
    }

    /// Resolve a variable as seen from `position`. Builtins come back as an
    /// unevaluated [`Entity::RuntimeValue`].
    pub fn lookup_variable(&self, id: &str, position: &Position) -> Result<Entity> {
        let id = id.to_lowercase();
        if let Some(entity) = self.variables.get(&id) {
            if let Some(expand) = expand_scope_of(entity) {
                if !expand.contains(position.row_index) {
                    return Err(EngineError::OutOfScope {
                        id,
                        range: expand.to_string(),
                        row: position.row_index + 1,
                    });
                }
            }
            return Ok(entity.clone());
        }
        builtins::variable(&id)
            .map(Entity::RuntimeValue)
            .ok_or(EngineError::UndefinedVariable(id))
    }

    pub fn lookup_function(&self, id: &str) -> Result<FunctionLookup<'_>> {
        let id = id.to_lowercase();
        if let Some(function) = self.functions.get(&id) {
            return Ok(FunctionLookup::User(function));
        }
        builtins::function(&id)
            .map(FunctionLookup::Builtin)
            .ok_or(EngineError::UndefinedFunction(id))
    }

    pub fn variables(&self) -> &HashMap<String, Entity> {
        &self.variables
    }

    pub fn functions(&self) -> &HashMap<String, Function> {
        &self.functions
    }

    /// Resolve every statically defined variable against the others, in
    /// dependency order, replacing each definition with its resolved value.
    pub fn resolve_variables(&mut self) -> Result<()> {
        let graph = DependencyGraph::new(&self.variables)?;
        let order = topological_sort(&graph)?;
        debug!("resolving {} variables in order {:?}", order.len(), order);

        let mut resolved: HashMap<String, Entity> = HashMap::with_capacity(order.len());
        for id in &order {
            let mut value = self.variables[id].clone();
            for dependency in graph.dependencies(id) {
                let replacement = HashMap::from([(dependency.clone(), resolved[dependency].clone())]);
                value = value.substitute(&replacement);
            }
            resolved.insert(id.clone(), value);
        }

        self.variables = resolved;
        Ok(())
    }
}

fn expand_scope_of(entity: &Entity) -> Option<ExpandScope> {
    match entity {
        Entity::CellReference(reference) => reference.scoped_to_expand,
        _ => None,
    }
}
