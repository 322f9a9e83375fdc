//! Builtin variables and functions and their metadata.
//!
//! Conventions:
//! - Builtin names are lower-case; lookups are case-folded by the caller.
//! - Every builtin is a [`RuntimeValue`]: it is computed from the
//!   [`Position`] it is referenced at and never cached.
//! - If you add a builtin, add an entry to `BUILTIN_VARIABLES` or
//!   `BUILTIN_FUNCTIONS`; nothing else needs registering.

use crate::engine::{
    CellRef, CellReference, EngineError, Entity, Position, Result, RuntimeFn, RuntimeValue,
};

pub struct Builtin {
    pub name: &'static str,
    pub description: &'static str,
    resolve: RuntimeFn,
}

impl Builtin {
    pub fn runtime_value(&self) -> RuntimeValue {
        RuntimeValue::new(self.name, self.resolve)
    }
}

pub const BUILTIN_VARIABLES: &[Builtin] = &[
    Builtin {
        name: "cellnum",
        description: "1-based column number of the current cell",
        resolve: cellnum,
    },
    Builtin {
        name: "cellref",
        description: "A1 reference to the current cell",
        resolve: cellref,
    },
    Builtin {
        name: "rownum",
        description: "1-based row number of the current cell",
        resolve: rownum,
    },
    Builtin {
        name: "rowref",
        description: "Reference to the current row",
        resolve: rowref,
    },
    Builtin {
        name: "rowabove",
        description: "Reference to the row above the current one",
        resolve: rowabove,
    },
    Builtin {
        name: "rowbelow",
        description: "Reference to the row below the current one",
        resolve: rowbelow,
    },
];

pub const BUILTIN_FUNCTIONS: &[Builtin] = &[
    Builtin {
        name: "cellabove",
        description: "The cell in the given column, one row above the current row",
        resolve: cellabove,
    },
    Builtin {
        name: "celladjacent",
        description: "The cell in the given column on the current row",
        resolve: celladjacent,
    },
    Builtin {
        name: "cellbelow",
        description: "The cell in the given column, one row below the current row",
        resolve: cellbelow,
    },
];

/// Look up a builtin variable by its (lower-case) id.
pub fn variable(id: &str) -> Option<RuntimeValue> {
    BUILTIN_VARIABLES
        .iter()
        .find(|b| b.name == id)
        .map(Builtin::runtime_value)
}

/// Look up a builtin function by its (lower-case) id.
pub fn function(id: &str) -> Option<RuntimeValue> {
    BUILTIN_FUNCTIONS
        .iter()
        .find(|b| b.name == id)
        .map(Builtin::runtime_value)
}

fn cellnum(position: &Position, _arguments: &[Entity]) -> Result<Entity> {
    Ok(Entity::Number((position.cell_index + 1) as f64))
}

fn cellref(position: &Position, _arguments: &[Entity]) -> Result<Entity> {
    Ok(Entity::cell_reference(CellRef::new(
        position.cell_index,
        position.row_index,
    )))
}

fn rownum(position: &Position, _arguments: &[Entity]) -> Result<Entity> {
    Ok(Entity::Number((position.row_index + 1) as f64))
}

fn rowref(position: &Position, _arguments: &[Entity]) -> Result<Entity> {
    Ok(Entity::cell_reference(CellRef::row_only(position.row_index)))
}

// Saturates on the first row rather than referencing a row that cannot exist.
fn rowabove(position: &Position, _arguments: &[Entity]) -> Result<Entity> {
    Ok(Entity::cell_reference(CellRef::row_only(
        position.row_index.saturating_sub(1),
    )))
}

fn rowbelow(position: &Position, _arguments: &[Entity]) -> Result<Entity> {
    Ok(Entity::cell_reference(CellRef::row_only(position.row_index + 1)))
}

fn cellabove(position: &Position, arguments: &[Entity]) -> Result<Entity> {
    let target = column_argument("cellabove", arguments)?;
    let row = position
        .row_index
        .checked_sub(1)
        .ok_or_else(|| EngineError::InvalidArgument {
            id: "cellabove".to_string(),
            message: "there is no row above the first row".to_string(),
        })?;
    Ok(Entity::CellReference(CellReference::new(target.with_row(row))))
}

fn celladjacent(position: &Position, arguments: &[Entity]) -> Result<Entity> {
    let target = column_argument("celladjacent", arguments)?;
    Ok(Entity::CellReference(CellReference::new(
        target.with_row(position.row_index),
    )))
}

fn cellbelow(position: &Position, arguments: &[Entity]) -> Result<Entity> {
    let target = column_argument("cellbelow", arguments)?;
    Ok(Entity::CellReference(CellReference::new(
        target.with_row(position.row_index + 1),
    )))
}

/// The single argument of a relative-cell builtin, as a reference with a column.
fn column_argument(id: &str, arguments: &[Entity]) -> Result<CellRef> {
    let [argument] = arguments else {
        return Err(EngineError::ArgumentCount {
            id: id.to_string(),
            expected: 1,
            given: arguments.len(),
        });
    };

    let cell_ref = match argument {
        Entity::CellReference(reference) => Some(reference.cell_ref.clone()),
        Entity::Reference(name) => CellRef::from_str(name),
        _ => None,
    };

    match cell_ref {
        Some(cell_ref) if cell_ref.col.is_some() && !cell_ref.is_range() => Ok(CellRef {
            upper_col: None,
            upper_row: None,
            ..cell_ref
        }),
        _ => Err(EngineError::InvalidArgument {
            id: id.to_string(),
            message: format!(
                "expected a cell or column reference, got `{}`",
                argument.evaluate(&Position::default())
            ),
        }),
    }
}
