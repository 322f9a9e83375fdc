use csvpp_engine::engine::{EngineError, Entity, Position, parse_formula};

use crate::modifier::Modifier;

/// One spreadsheet cell.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    /// Column index, 0-based.
    pub index: usize,
    /// Final row index, 0-based. Only meaningful once rows are expanded.
    pub row_index: usize,
    /// 1-based line in the source file the cell came from.
    pub line_number: usize,
    /// The cell text with modifiers removed.
    pub value: String,
    pub modifier: Modifier,
    /// Formula tree for cells starting with `=`; None for literal text.
    pub ast: Option<Entity>,
}

impl Cell {
    pub fn parse(
        value: String,
        modifier: Modifier,
        index: usize,
        row_index: usize,
        line_number: usize,
    ) -> Result<Cell, EngineError> {
        let ast = if value.trim_start().starts_with('=') {
            Some(parse_formula(&value)?)
        } else {
            None
        };
        Ok(Cell {
            index,
            row_index,
            line_number,
            value,
            modifier,
            ast,
        })
    }

    pub fn position(&self) -> Position {
        Position::new(self.row_index, self.index, self.line_number)
    }

    pub fn is_formula(&self) -> bool {
        self.ast.is_some()
    }

    /// The text to write for this cell: `=formula` or the literal value.
    pub fn evaluate(&self) -> String {
        match &self.ast {
            Some(ast) => format!("={}", ast.evaluate(&self.position())),
            None => self.value.clone(),
        }
    }
}
