//! Per-cell reference resolution.
//!
//! Each pass collects the references still left in the tree, then rebuilds
//! the tree once with every one of them replaced: user functions are inlined,
//! builtins are computed at the cell's position and variables take their
//! scope value. Passes repeat until nothing resolvable is left. A pass that
//! leaves the tree unchanged is a stall.
//!
//! Calls to functions nobody defines (`SUM`, `IF`, ...) are spreadsheet
//! functions and are left alone. A bare identifier nobody defines is kept
//! as a cell if it reads as one (`a1`), and is an error otherwise.

use log::trace;

use super::cell_ref::CellRef;
use super::entity::{CellReference, Entity, FunctionCall, Position};
use super::error::{EngineError, Result};
use super::scope::{FunctionLookup, Scope};

/// Upper bound on substitution passes for a single cell. Mutually recursive
/// functions never stop producing new references.
pub const MAX_PASSES: usize = 256;

/// Fully resolve `ast` as seen from `position`.
pub fn resolve(ast: &Entity, position: &Position, scope: &Scope) -> Result<Entity> {
    let mut current = ast.clone();

    for pass in 0..MAX_PASSES {
        let references = pending_references(&current, scope);
        if references.is_empty() {
            return Ok(current);
        }
        trace!(
            "row {} cell {} pass {}: resolving {:?}",
            position.row_index, position.cell_index, pass, references
        );
        let next = resolve_pass(&current, position, scope)?;
        if next == current {
            return Err(EngineError::DidNotConverge(references));
        }
        current = next;
    }

    Err(EngineError::DidNotConverge(pending_references(&current, scope)))
}

/// Ids of every reference a pass would act on, depth-first.
pub fn pending_references(ast: &Entity, scope: &Scope) -> Vec<String> {
    let mut ids = Vec::new();
    ast.walk(&mut |entity| match entity {
        Entity::Reference(id) => ids.push(id.clone()),
        Entity::FunctionCall(call) if scope.is_function_defined(&call.id) => {
            ids.push(format!("{}()", call.id))
        }
        _ => {}
    });
    ids
}

fn resolve_pass(entity: &Entity, position: &Position, scope: &Scope) -> Result<Entity> {
    match entity {
        Entity::Reference(id) => resolve_variable(id, position, scope),
        Entity::FunctionCall(call) => resolve_call(call, position, scope),
        Entity::RuntimeValue(value) => value.call(position, &[]),
        _ => Ok(entity.clone()),
    }
}

fn resolve_variable(id: &str, position: &Position, scope: &Scope) -> Result<Entity> {
    if scope.is_variable_defined(id) {
        return match scope.lookup_variable(id, position)? {
            Entity::RuntimeValue(value) => value.call(position, &[]),
            value => Ok(value),
        };
    }
    match CellRef::from_str(id) {
        Some(cell_ref) if cell_ref.row.is_some() => {
            Ok(Entity::CellReference(CellReference::new(cell_ref)))
        }
        _ => Err(EngineError::UndefinedVariable(id.to_string())),
    }
}

fn resolve_call(call: &FunctionCall, position: &Position, scope: &Scope) -> Result<Entity> {
    if !scope.is_function_defined(&call.id) {
        return Ok(Entity::FunctionCall(FunctionCall {
            id: call.id.clone(),
            arguments: resolve_all(&call.arguments, position, scope)?,
            infix: call.infix,
        }));
    }

    match scope.lookup_function(&call.id)? {
        FunctionLookup::User(function) => function.apply(&call.arguments),
        FunctionLookup::Builtin(value) => {
            let arguments = call
                .arguments
                .iter()
                .map(|argument| match argument {
                    // Bare column names are the argument itself, not a variable.
                    Entity::Reference(id)
                        if !scope.is_variable_defined(id) && CellRef::from_str(id).is_some() =>
                    {
                        Ok(argument.clone())
                    }
                    other => resolve_pass(other, position, scope),
                })
                .collect::<Result<Vec<_>>>()?;
            value.call(position, &arguments)
        }
    }
}

fn resolve_all(entities: &[Entity], position: &Position, scope: &Scope) -> Result<Vec<Entity>> {
    entities
        .iter()
        .map(|e| resolve_pass(e, position, scope))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ExpandScope, parse_code_section, parse_formula};

    fn scope_from(code: &str) -> Scope {
        let section = parse_code_section(code).unwrap();
        let mut scope = Scope::new();
        for (id, value) in section.variables {
            scope.define_variable(&id, value);
        }
        for function in section.functions {
            scope.define_function(&function.id.clone(), function);
        }
        scope.resolve_variables().unwrap();
        scope
    }

    fn compile(formula: &str, scope: &Scope, position: Position) -> Result<String> {
        let ast = parse_formula(formula)?;
        Ok(resolve(&ast, &position, scope)?.evaluate(&position))
    }

    #[test]
    fn test_ast_without_references_is_unchanged() {
        let ast = parse_formula("=SUM(A1:A5) * 2").unwrap();
        let resolved = resolve(&ast, &Position::default(), &Scope::new()).unwrap();
        assert_eq!(resolved, ast);
    }

    #[test]
    fn test_variable_resolves_and_is_idempotent() {
        let scope = scope_from("x := 1");
        let ast = parse_formula("=$$x").unwrap();
        let p = Position::default();
        let once = resolve(&ast, &p, &scope).unwrap();
        assert_eq!(once, Entity::Number(1.0));
        assert_eq!(resolve(&once, &p, &scope).unwrap(), once);
    }

    #[test]
    fn test_nested_variables() {
        let scope = scope_from("foo := 1\nbar := ADD($$foo, 2)");
        assert_eq!(compile("=$$bar", &scope, Position::default()).unwrap(), "ADD(1, 2)");
    }

    #[test]
    fn test_user_functions_are_inlined() {
        let scope = scope_from("rate := 0.2\ndef tax(amount) amount * $$rate\ndef total(a) a + tax(a)");
        assert_eq!(
            compile("=total(B2)", &scope, Position::default()).unwrap(),
            "B2 + B2 * 0.2"
        );
    }

    #[test]
    fn test_function_argument_count_is_checked() {
        let scope = scope_from("def f(a, b) a + b");
        assert!(matches!(
            compile("=f(1)", &scope, Position::default()),
            Err(EngineError::ArgumentCount { expected: 2, given: 1, .. })
        ));
    }

    #[test]
    fn test_builtins_use_the_cell_position() {
        let scope = Scope::new();
        let p = Position::new(3, 1, 8);
        assert_eq!(compile("=$$rownum * 10", &scope, p).unwrap(), "4 * 10");
        assert_eq!(compile("=cellabove(C) + celladjacent(A)", &scope, p).unwrap(), "C3 + A4");
        assert_eq!(compile("=SUM(B1, $$cellref)", &scope, p).unwrap(), "SUM(B1, B4)");
    }

    #[test]
    fn test_builtin_inside_user_function() {
        let scope = scope_from("def prev(col) cellabove(col)");
        let p = Position::new(5, 0, 6);
        assert_eq!(compile("=prev(D) + 1", &scope, p).unwrap(), "D5 + 1");
    }

    #[test]
    fn test_spreadsheet_functions_are_left_alone() {
        let scope = scope_from("x := 3");
        assert_eq!(
            compile("=IF(A1 > $$x, \"big\", \"small\")", &scope, Position::default()).unwrap(),
            "IF(A1 > 3, \"big\", \"small\")"
        );
    }

    #[test]
    fn test_undefined_references() {
        let scope = Scope::new();
        assert_eq!(
            compile("=$$missing", &scope, Position::default()),
            Err(EngineError::UndefinedVariable("missing".into()))
        );
    }

    #[test]
    fn test_out_of_scope_variable() {
        let mut scope = Scope::new();
        let expand = ExpandScope {
            starts_at: 1,
            ends_at: Some(3),
        };
        scope.bind_cell_variable("price", CellRef::new(1, 1), Some(expand));
        assert_eq!(compile("=$$price * 2", &scope, Position::new(2, 2, 3)).unwrap(), "B3 * 2");
        assert!(matches!(
            compile("=$$price * 2", &scope, Position::new(4, 2, 5)),
            Err(EngineError::OutOfScope { .. })
        ));
    }

    #[test]
    fn test_nested_calls_of_the_same_function() {
        let scope = scope_from("def sq(a) a * a");
        assert_eq!(
            compile("=sq(sq(2))", &scope, Position::default()).unwrap(),
            "2 * 2 * (2 * 2)"
        );
    }

    #[test]
    fn test_recursive_functions_do_not_converge() {
        let scope = scope_from("def f(x) f(x)");
        assert!(matches!(
            compile("=f(1)", &scope, Position::default()),
            Err(EngineError::DidNotConverge(_))
        ));

        let scope = scope_from("def ping(x) pong(x)\ndef pong(x) ping(x)");
        assert!(matches!(
            compile("=ping(1)", &scope, Position::default()),
            Err(EngineError::DidNotConverge(_))
        ));
    }
}
