//! Binding `[[var=]]` modifiers and resolving cell formulas.

use log::{debug, trace};

use csvpp_engine::engine::{CellRef, Scope, resolve};

use super::{Phase, Template};
use crate::error::{CompileError, Result};

impl Template {
    /// Write every `[[var=]]` (cell) and `![[var=]]` (row) binding into
    /// `scope`. Inside an expand only the first copy binds, scoped to the
    /// expand's rows.
    pub fn bind_variables(&mut self, scope: &mut Scope) -> Result<()> {
        self.require_phase(Phase::Expanded, "bind variables of")?;

        for row in &self.rows {
            let expand = row.modifier.expand;
            if expand.is_some_and(|e| e.starts_at != Some(row.index)) {
                continue;
            }
            let expand_scope = expand.and_then(|e| e.scope());

            if let Some(id) = &row.modifier.var {
                debug!("binding {} to row {}", id, row.index + 1);
                scope.bind_cell_variable(id, CellRef::row_only(row.index), expand_scope);
            }
            for cell in &row.cells {
                if let Some(id) = &cell.modifier.var {
                    let cell_ref = CellRef::new(cell.index, cell.row_index);
                    debug!("binding {} to {}", id, cell_ref);
                    scope.bind_cell_variable(id, cell_ref, expand_scope);
                }
            }
        }

        self.phase = Phase::Bound;
        Ok(())
    }

    /// Resolve every formula against `scope` at its cell's final position.
    pub fn resolve_cells(&mut self, scope: &Scope) -> Result<()> {
        self.require_phase(Phase::Bound, "resolve")?;

        for row in &mut self.rows {
            for cell in &mut row.cells {
                let Some(ast) = &cell.ast else {
                    continue;
                };
                let position = cell.position();
                let resolved = resolve(ast, &position, scope).map_err(|source| CompileError::Cell {
                    filename: self.filename.clone(),
                    line: cell.line_number,
                    row: cell.row_index,
                    cell: cell.index,
                    source,
                })?;
                trace!("{}: {}", CellRef::new(cell.index, cell.row_index), resolved.evaluate(&position));
                cell.ast = Some(resolved);
            }
        }

        self.phase = Phase::Resolved;
        Ok(())
    }
}
