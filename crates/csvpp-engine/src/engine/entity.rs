//! The entity model: every node a csv++ AST can hold.
//!
//! - [`Entity`] - closed sum type of literals, references and calls
//! - [`Position`] - the row/cell/line an entity is being evaluated at
//! - [`RuntimeValue`] - a builtin computed at the position it is referenced
//!
//! Entities are immutable once built. Substitution always produces a new tree
//! so sub-trees handed out by a [`Scope`](super::Scope) can be shared between
//! cells. Identifiers are lower-cased once, at construction.

use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;
use std::fmt;

use super::cell_ref::CellRef;
use super::error::{EngineError, Result};

/// Where in the spreadsheet an entity is being evaluated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    pub row_index: usize,
    pub cell_index: usize,
    pub line_number: usize,
}

impl Position {
    pub fn new(row_index: usize, cell_index: usize, line_number: usize) -> Self {
        Position {
            row_index,
            cell_index,
            line_number,
        }
    }
}

/// The final row range of an expanded row. `ends_at` of None is unbounded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExpandScope {
    pub starts_at: usize,
    pub ends_at: Option<usize>,
}

impl ExpandScope {
    pub fn contains(&self, row_index: usize) -> bool {
        row_index >= self.starts_at && self.ends_at.is_none_or(|end| row_index <= end)
    }
}

impl fmt::Display for ExpandScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ends_at {
            Some(end) => write!(f, "{}-{}", self.starts_at + 1, end + 1),
            None => write!(f, "{}-", self.starts_at + 1),
        }
    }
}

/// Signature shared by every builtin: `(position, call arguments) -> value`.
pub type RuntimeFn = fn(&Position, &[Entity]) -> Result<Entity>;

/// A builtin value computed where it is referenced. Never memoized.
#[derive(Clone, Copy)]
pub struct RuntimeValue {
    name: &'static str,
    resolve: RuntimeFn,
}

impl RuntimeValue {
    pub const fn new(name: &'static str, resolve: RuntimeFn) -> Self {
        RuntimeValue { name, resolve }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn call(&self, position: &Position, arguments: &[Entity]) -> Result<Entity> {
        (self.resolve)(position, arguments)
    }
}

impl PartialEq for RuntimeValue {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RuntimeValue({})", self.name)
    }
}

/// A reference to a spreadsheet cell, column, row or range.
#[derive(Clone, Debug, PartialEq)]
pub struct CellReference {
    pub cell_ref: CellRef,
    /// Set when the reference was bound by `[[var=]]` inside an expand. The
    /// row then follows the row being evaluated.
    pub scoped_to_expand: Option<ExpandScope>,
}

impl CellReference {
    pub fn new(cell_ref: CellRef) -> Self {
        CellReference {
            cell_ref,
            scoped_to_expand: None,
        }
    }

    /// Build from explicit indices; at least one axis must be given.
    pub fn from_indices(col: Option<usize>, row: Option<usize>) -> Result<Self> {
        if col.is_none() && row.is_none() {
            return Err(EngineError::InvalidCellReference(
                "a cell reference needs a row or a column".to_string(),
            ));
        }
        Ok(CellReference::new(CellRef {
            col,
            row,
            ..CellRef::default()
        }))
    }

    /// Build from raw A1 text.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(CellReference::new(text.parse()?))
    }

    pub fn scoped_to(mut self, expand: ExpandScope) -> Self {
        self.scoped_to_expand = Some(expand);
        self
    }

    pub fn evaluate(&self, position: &Position) -> String {
        match self.scoped_to_expand {
            Some(_) => self.cell_ref.with_row(position.row_index).to_string(),
            None => self.cell_ref.to_string(),
        }
    }
}

/// A call to a function (`ADD(a, b)`) or an operator. Operators have
/// `infix` set: two arguments render `a + b`, one renders as negation `-a`.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionCall {
    pub id: String,
    pub arguments: Vec<Entity>,
    pub infix: bool,
}

impl FunctionCall {
    /// Binding strength if this call is an operator.
    pub fn precedence(&self) -> Option<u8> {
        match (self.infix, self.arguments.len()) {
            (true, 1) => Some(UNARY_PRECEDENCE),
            (true, _) => infix_precedence(&self.id),
            _ => None,
        }
    }
}

/// A user-defined function: `def id(arguments) body`.
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub id: String,
    pub arguments: Vec<String>,
    pub body: Box<Entity>,
}

impl Function {
    pub fn new(id: &str, arguments: Vec<String>, body: Entity) -> Self {
        Function {
            id: id.to_lowercase(),
            arguments: arguments.iter().map(|a| a.to_lowercase()).collect(),
            body: Box::new(body),
        }
    }

    /// Inline a call: a copy of the body with every formal argument replaced
    /// by the corresponding call argument.
    pub fn apply(&self, arguments: &[Entity]) -> Result<Entity> {
        if arguments.len() != self.arguments.len() {
            return Err(EngineError::ArgumentCount {
                id: self.id.clone(),
                expected: self.arguments.len(),
                given: arguments.len(),
            });
        }
        let bindings: HashMap<String, Entity> = self
            .arguments
            .iter()
            .cloned()
            .zip(arguments.iter().cloned())
            .collect();
        Ok(self.body.substitute(&bindings))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Entity {
    Number(f64),
    /// Text with the surrounding quotes stripped.
    String(String),
    Boolean(bool),
    Date(NaiveDate),
    CellReference(CellReference),
    /// An identifier: a variable, or a cell reference if nothing defines it.
    Reference(String),
    FunctionCall(FunctionCall),
    Function(Function),
    RuntimeValue(RuntimeValue),
}

impl Entity {
    pub fn reference(id: &str) -> Entity {
        Entity::Reference(id.to_lowercase())
    }

    pub fn function_call(id: &str, arguments: Vec<Entity>) -> Entity {
        Entity::FunctionCall(FunctionCall {
            id: id.to_lowercase(),
            arguments,
            infix: false,
        })
    }

    pub fn infix(operator: &str, left: Entity, right: Entity) -> Entity {
        Entity::FunctionCall(FunctionCall {
            id: operator.to_lowercase(),
            arguments: vec![left, right],
            infix: true,
        })
    }

    /// A unary operator applied to `operand`, e.g. `-A1`.
    pub fn prefix(operator: &str, operand: Entity) -> Entity {
        Entity::FunctionCall(FunctionCall {
            id: operator.to_string(),
            arguments: vec![operand],
            infix: true,
        })
    }

    pub fn cell_reference(cell_ref: CellRef) -> Entity {
        Entity::CellReference(CellReference::new(cell_ref))
    }

    /// Render the entity as spreadsheet formula text at `position`.
    pub fn evaluate(&self, position: &Position) -> String {
        match self {
            Entity::Number(n) => format_number(*n),
            Entity::String(s) => format!("\"{}\"", s.replace('"', "\"\"")),
            Entity::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Entity::Date(d) => format!("DATE({}, {}, {})", d.year(), d.month(), d.day()),
            Entity::CellReference(r) => r.evaluate(position),
            Entity::Reference(id) => match CellRef::from_str(id) {
                Some(cell_ref) => cell_ref.to_string(),
                None => id.clone(),
            },
            Entity::FunctionCall(call) => evaluate_call(call, position),
            Entity::Function(function) => function.body.evaluate(position),
            // Argument errors cannot surface here: builtins taking arguments
            // are always invoked by the resolver, never rendered bare.
            Entity::RuntimeValue(value) => value
                .call(position, &[])
                .map(|e| e.evaluate(position))
                .unwrap_or_else(|_| "#REF!".to_string()),
        }
    }

    /// Direct sub-entities, in source order.
    pub fn children(&self) -> Vec<&Entity> {
        match self {
            Entity::FunctionCall(call) => call.arguments.iter().collect(),
            Entity::Function(function) => vec![function.body.as_ref()],
            _ => Vec::new(),
        }
    }

    /// Depth-first, pre-order traversal.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Entity)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// A copy of this tree with every `Reference` named in `replacements`
    /// swapped for its replacement.
    pub fn substitute(&self, replacements: &HashMap<String, Entity>) -> Entity {
        match self {
            Entity::Reference(id) => match replacements.get(id) {
                Some(replacement) => replacement.clone(),
                None => self.clone(),
            },
            Entity::FunctionCall(call) => Entity::FunctionCall(FunctionCall {
                id: call.id.clone(),
                arguments: call
                    .arguments
                    .iter()
                    .map(|a| a.substitute(replacements))
                    .collect(),
                infix: call.infix,
            }),
            Entity::Function(function) => {
                // Formal arguments shadow outer names.
                let inner: HashMap<String, Entity> = replacements
                    .iter()
                    .filter(|(id, _)| !function.arguments.contains(id))
                    .map(|(id, e)| (id.clone(), e.clone()))
                    .collect();
                Entity::Function(Function {
                    id: function.id.clone(),
                    arguments: function.arguments.clone(),
                    body: Box::new(function.body.substitute(&inner)),
                })
            }
            _ => self.clone(),
        }
    }
}

/// Negation binds tighter than every infix operator, `^` included.
pub const UNARY_PRECEDENCE: u8 = 6;

/// Binding strength of an infix operator; higher binds tighter.
pub fn infix_precedence(operator: &str) -> Option<u8> {
    match operator {
        "=" | "<>" | "<" | ">" | "<=" | ">=" => Some(1),
        "&" => Some(2),
        "+" | "-" => Some(3),
        "*" | "/" => Some(4),
        "^" => Some(5),
        _ => None,
    }
}

fn evaluate_call(call: &FunctionCall, position: &Position) -> String {
    if call.infix {
        let precedence = call.precedence().unwrap_or(0);
        match call.arguments.as_slice() {
            [operand] => {
                return format!(
                    "{}{}",
                    call.id,
                    evaluate_operand(operand, position, precedence, false)
                );
            }
            [left, right] => {
                return format!(
                    "{} {} {}",
                    evaluate_operand(left, position, precedence, false),
                    call.id,
                    evaluate_operand(right, position, precedence, true)
                );
            }
            _ => {}
        }
    }

    let arguments = call
        .arguments
        .iter()
        .map(|a| a.evaluate(position))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}({})", call.id.to_uppercase(), arguments)
}

fn evaluate_operand(entity: &Entity, position: &Position, parent: u8, right_side: bool) -> String {
    let text = entity.evaluate(position);
    match entity {
        Entity::FunctionCall(call) if call.infix => {
            let precedence = call.precedence().unwrap_or(0);
            if precedence < parent || (right_side && precedence == parent) {
                format!("({})", text)
            } else {
                text
            }
        }
        _ => text,
    }
}

/// Format a number as formula text. Whole numbers render without a fraction.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_row(row_index: usize) -> Position {
        Position::new(row_index, 0, row_index + 1)
    }

    #[test]
    fn test_literals_render_canonical_text() {
        let p = Position::default();
        assert_eq!(Entity::Number(42.0).evaluate(&p), "42");
        assert_eq!(Entity::Number(-1.5).evaluate(&p), "-1.5");
        assert_eq!(Entity::Boolean(true).evaluate(&p), "TRUE");
        assert_eq!(Entity::String("say \"hi\"".into()).evaluate(&p), "\"say \"\"hi\"\"\"");
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(Entity::Date(date).evaluate(&p), "DATE(2024, 1, 31)");
    }

    #[test]
    fn test_identifiers_are_case_folded_at_construction() {
        assert_eq!(Entity::reference("FooBar"), Entity::Reference("foobar".into()));
        assert_eq!(
            Function::new("MyFn", vec!["A".into()], Entity::reference("A")).arguments,
            vec!["a".to_string()]
        );
    }

    #[test]
    fn test_function_call_renders_upper_case() {
        let call = Entity::function_call("add", vec![Entity::Number(1.0), Entity::Number(2.0)]);
        assert_eq!(call.evaluate(&Position::default()), "ADD(1, 2)");
    }

    #[test]
    fn test_infix_keeps_grouping() {
        let p = Position::default();
        let sum = Entity::infix("+", Entity::Number(1.0), Entity::Number(2.0));
        let product = Entity::infix("*", sum.clone(), Entity::Number(3.0));
        assert_eq!(product.evaluate(&p), "(1 + 2) * 3");

        let left_assoc = Entity::infix("-", sum.clone(), Entity::Number(3.0));
        assert_eq!(left_assoc.evaluate(&p), "1 + 2 - 3");

        let right_grouped = Entity::infix("-", Entity::Number(3.0), sum);
        assert_eq!(right_grouped.evaluate(&p), "3 - (1 + 2)");
    }

    #[test]
    fn test_power_is_left_associative_when_rendered() {
        let p = Position::default();
        let left = Entity::infix("^", Entity::infix("^", Entity::Number(2.0), Entity::Number(3.0)), Entity::Number(2.0));
        assert_eq!(left.evaluate(&p), "2 ^ 3 ^ 2");
        let right = Entity::infix("^", Entity::Number(2.0), Entity::infix("^", Entity::Number(3.0), Entity::Number(2.0)));
        assert_eq!(right.evaluate(&p), "2 ^ (3 ^ 2)");
    }

    #[test]
    fn test_negation_renders_as_prefix() {
        let p = Position::default();
        let a1 = Entity::reference("a1");
        assert_eq!(Entity::prefix("-", a1.clone()).evaluate(&p), "-A1");

        let squared = Entity::infix("^", Entity::prefix("-", a1.clone()), Entity::Number(2.0));
        assert_eq!(squared.evaluate(&p), "-A1 ^ 2");

        let negated_power = Entity::prefix("-", Entity::infix("^", a1, Entity::Number(2.0)));
        assert_eq!(negated_power.evaluate(&p), "-(A1 ^ 2)");
    }

    #[test]
    fn test_unresolved_reference_renders_as_cell() {
        assert_eq!(Entity::reference("b12").evaluate(&Position::default()), "B12");
    }

    #[test]
    fn test_expand_scoped_reference_follows_row() {
        let scope = ExpandScope {
            starts_at: 1,
            ends_at: Some(3),
        };
        let r = CellReference::new(CellRef::new(2, 1)).scoped_to(scope);
        assert_eq!(r.evaluate(&at_row(1)), "C2");
        assert_eq!(r.evaluate(&at_row(3)), "C4");
    }

    #[test]
    fn test_expand_scope_contains() {
        let bounded = ExpandScope {
            starts_at: 1,
            ends_at: Some(3),
        };
        assert!(!bounded.contains(0));
        assert!(bounded.contains(1));
        assert!(bounded.contains(3));
        assert!(!bounded.contains(4));
        assert_eq!(bounded.to_string(), "2-4");

        let unbounded = ExpandScope {
            starts_at: 2,
            ends_at: None,
        };
        assert!(unbounded.contains(10_000));
        assert!(!unbounded.contains(1));
    }

    #[test]
    fn test_cell_reference_requires_an_axis() {
        assert!(CellReference::from_indices(None, None).is_err());
        assert_eq!(
            CellReference::from_indices(None, Some(3))
                .unwrap()
                .evaluate(&Position::default()),
            "4"
        );
    }

    #[test]
    fn test_function_apply_substitutes_arguments() {
        let f = Function::new(
            "f",
            vec!["a".into(), "b".into()],
            Entity::infix("+", Entity::reference("a"), Entity::reference("b")),
        );
        // Arguments that mention the other formal name are not rewritten twice.
        let applied = f
            .apply(&[Entity::reference("b"), Entity::Number(2.0)])
            .unwrap();
        assert_eq!(
            applied,
            Entity::infix("+", Entity::reference("b"), Entity::Number(2.0))
        );

        assert!(matches!(
            f.apply(&[Entity::Number(1.0)]),
            Err(EngineError::ArgumentCount { expected: 2, given: 1, .. })
        ));
    }

    #[test]
    fn test_walk_is_depth_first() {
        let tree = Entity::function_call(
            "outer",
            vec![
                Entity::function_call("inner", vec![Entity::reference("x")]),
                Entity::reference("y"),
            ],
        );
        let mut seen = Vec::new();
        tree.walk(&mut |e| {
            if let Entity::Reference(id) | Entity::FunctionCall(FunctionCall { id, .. }) = e {
                seen.push(id.clone());
            }
        });
        assert_eq!(seen, vec!["outer", "inner", "x", "y"]);
    }
}
