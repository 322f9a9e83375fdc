//! The spreadsheet section: rows of cells and the phases they go through.
//!
//! A template moves strictly forward through [`Phase`]s:
//! parsed, then expanded (final row indices assigned), then bound
//! (`[[var=]]` entries written to the scope), then resolved (every formula
//! fully substituted). Each step refuses to run out of order.

mod cell;
mod expand;
mod resolve;

pub use cell::Cell;
pub use expand::SPREADSHEET_INFINITY;

use std::path::{Path, PathBuf};

use crate::error::{CompileError, Result};
use crate::modifier::{Modifier, ModifierError, parse_cell};
use crate::options::Options;
use crate::source::SourceCode;
use crate::storage::{parse_csv_line, split_csv_records};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Parsed,
    Expanded,
    Bound,
    Resolved,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    /// Final row index, 0-based.
    pub index: usize,
    pub line_number: usize,
    /// The row's own `![[...]]` modifier.
    pub modifier: Modifier,
    pub cells: Vec<Cell>,
}

impl Row {
    fn parse(
        filename: &Path,
        line: &str,
        index: usize,
        line_number: usize,
        column_offset: usize,
    ) -> Result<Row> {
        let mut row = Row {
            index,
            line_number,
            modifier: Modifier::default(),
            cells: Vec::new(),
        };
        let mut defaults = Modifier::default();

        for (i, field) in parse_csv_line(line).into_iter().enumerate() {
            let cell_index = column_offset + i;
            let modifier_error = |e: ModifierError| CompileError::Modifier {
                filename: filename.to_path_buf(),
                line: line_number,
                row: index,
                cell: cell_index,
                message: e.to_string(),
            };

            let parsed = parse_cell(&field, &defaults, i == 0).map_err(modifier_error)?;
            if let Some(row_modifier) = parsed.row_modifier {
                defaults = row_modifier.cell_defaults();
                row.modifier = row_modifier;
            }

            let cell = Cell::parse(parsed.value, parsed.modifier, cell_index, index, line_number)
                .map_err(|source| CompileError::Cell {
                    filename: filename.to_path_buf(),
                    line: line_number,
                    row: index,
                    cell: cell_index,
                    source,
                })?;
            row.cells.push(cell);
        }
        Ok(row)
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
        for cell in &mut self.cells {
            cell.row_index = index;
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Template {
    pub filename: PathBuf,
    rows: Vec<Row>,
    phase: Phase,
    row_offset: usize,
}

impl Template {
    /// Parse the spreadsheet section. Rows start at `options.offset`; trailing
    /// blank lines are not rows. A quoted field may span lines; its row keeps
    /// the line it starts on.
    pub fn parse(source: &SourceCode, options: &Options) -> Result<Template> {
        let records = split_csv_records(&source.csv_section);
        let used = records
            .iter()
            .rposition(|(_, record)| !record.trim().is_empty())
            .map_or(0, |last| last + 1);

        let rows = records[..used]
            .iter()
            .enumerate()
            .map(|(i, (line, record))| {
                Row::parse(
                    &source.filename,
                    record,
                    options.row_offset() + i,
                    source.csv_line(*line),
                    options.column_offset(),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Template {
            filename: source.filename.clone(),
            rows,
            phase: Phase::Parsed,
            row_offset: options.row_offset(),
        })
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Every cell, row by row.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.rows.iter().flat_map(|row| row.cells.iter())
    }

    /// A one-line description for verbose output.
    pub fn summary(&self) -> String {
        let formulas = self.cells().filter(|c| c.is_formula()).count();
        let mut expands: Vec<String> = Vec::new();
        for row in &self.rows {
            if let Some(scope) = row.modifier.expand.and_then(|e| e.scope()) {
                if scope.starts_at == row.index {
                    expands.push(scope.to_string());
                }
            }
        }

        let mut summary = format!(
            "{}: {} rows, {} cells, {} formulas",
            self.filename.display(),
            self.rows.len(),
            self.cells().count(),
            formulas
        );
        if !expands.is_empty() {
            summary.push_str(&format!(", expanded rows {}", expands.join(", ")));
        }
        summary
    }

    fn require_phase(&self, expected: Phase, action: &str) -> Result<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(CompileError::Compiler(format!(
                "cannot {} a template that is {:?}, expected {:?}",
                action, self.phase, expected
            )))
        }
    }
}
