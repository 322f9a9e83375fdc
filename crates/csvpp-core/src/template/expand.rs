//! Row expansion.
//!
//! A row marked `expand=N` becomes N consecutive copies of itself; a bare
//! `expand` fills the sheet down to [`SPREADSHEET_INFINITY`] rows. Every
//! copy records the final row range of its expand so that `[[var=]]`
//! bindings made inside it can be limited to that range.

use log::debug;

use super::{Phase, Row, Template};
use crate::error::{CompileError, Result};
use crate::modifier::Expand;

/// Row count an unbounded expand fills the sheet up to.
pub const SPREADSHEET_INFINITY: usize = 1000;

impl Template {
    /// At most one row may expand without a bound.
    pub fn validate_infinite_expands(&self) -> Result<()> {
        let mut unbounded = self
            .rows
            .iter()
            .filter(|row| row.modifier.expand.is_some_and(|e| e.is_unbounded()));

        if let (Some(first), Some(second)) = (unbounded.next(), unbounded.next()) {
            return Err(CompileError::Modifier {
                filename: self.filename.clone(),
                line: second.line_number,
                row: second.index,
                cell: 0,
                message: format!(
                    "only one row may use an unbounded expand, but line {} already does",
                    first.line_number
                ),
            });
        }
        Ok(())
    }

    /// Replace every expanding row with its copies and renumber all rows.
    pub fn expand_rows(&mut self) -> Result<()> {
        self.require_phase(Phase::Parsed, "expand")?;
        self.validate_infinite_expands()?;

        let fixed_rows: usize = self
            .rows
            .iter()
            .map(|row| match row.modifier.expand {
                Some(Expand { amount: None, .. }) => 0,
                Some(Expand { amount: Some(n), .. }) => n,
                None => 1,
            })
            .sum();
        let unbounded_amount = SPREADSHEET_INFINITY
            .saturating_sub(self.row_offset + fixed_rows)
            .max(1);

        let mut next_index = self.row_offset;
        let mut rows = Vec::with_capacity(fixed_rows + 1);
        for row in std::mem::take(&mut self.rows) {
            let Some(expand) = row.modifier.expand else {
                rows.push(renumbered(row, next_index));
                next_index += 1;
                continue;
            };

            let amount = expand.amount.unwrap_or(unbounded_amount);
            let placed = Expand {
                amount: expand.amount,
                starts_at: Some(next_index),
                ends_at: Some(next_index + amount - 1),
            };
            debug!(
                "expanding line {} into {} rows starting at row {}",
                row.line_number,
                amount,
                next_index + 1
            );

            for copy in 0..amount {
                let mut clone = row.clone();
                clone.modifier.expand = Some(placed);
                rows.push(renumbered(clone, next_index + copy));
            }
            next_index += amount;
        }

        self.rows = rows;
        self.phase = Phase::Expanded;
        Ok(())
    }
}

fn renumbered(mut row: Row, index: usize) -> Row {
    row.set_index(index);
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::source::SourceCode;
    use csvpp_engine::engine::{ErrorKind, ExpandScope};

    fn parse(csv: &str) -> Template {
        Template::parse(&SourceCode::new("t.csvpp", csv), &Options::default()).unwrap()
    }

    #[test]
    fn test_bounded_expand() {
        let mut template = parse("header\n![[expand=3]]=$$rownum\nfooter");
        template.expand_rows().unwrap();

        let indices: Vec<usize> = template.rows().iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(template.rows()[4].cells[0].value, "footer");

        for row in &template.rows()[1..4] {
            assert_eq!(row.cells[0].row_index, row.index);
            assert_eq!(row.line_number, 2);
            assert_eq!(
                row.modifier.expand.and_then(|e| e.scope()),
                Some(ExpandScope { starts_at: 1, ends_at: Some(3) })
            );
        }
    }

    #[test]
    fn test_unbounded_expand_fills_the_sheet() {
        let mut template = parse("a\n![[expand]]b\nc\nd");
        template.expand_rows().unwrap();
        assert_eq!(template.rows().len(), SPREADSHEET_INFINITY);
        assert_eq!(template.rows().last().map(|r| r.index), Some(SPREADSHEET_INFINITY - 1));

        let scope = template.rows()[1].modifier.expand.and_then(|e| e.scope());
        assert_eq!(scope, Some(ExpandScope { starts_at: 1, ends_at: None }));
    }

    #[test]
    fn test_unbounded_expand_gets_at_least_one_row() {
        let options = Options {
            offset: (SPREADSHEET_INFINITY + 5, 0),
            ..Options::default()
        };
        let mut template =
            Template::parse(&SourceCode::new("t.csvpp", "![[expand]]x"), &options).unwrap();
        template.expand_rows().unwrap();
        assert_eq!(template.rows().len(), 1);
    }

    #[test]
    fn test_two_unbounded_expands_are_rejected() {
        let mut template = parse("![[expand]]a\nb\n![[e]]c");
        let err = template.validate_infinite_expands().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Modifier);
        match &err {
            CompileError::Modifier { line, .. } => assert_eq!(*line, 3),
            other => panic!("expected modifier error, got {other:?}"),
        }
        assert!(template.expand_rows().is_err());
        assert_eq!(template.phase(), Phase::Parsed);
    }

    #[test]
    fn test_oversized_expand_is_a_modifier_error() {
        let source = SourceCode::new("t.csvpp", "a\n![[expand=18446744073709551615]]b");
        let err = Template::parse(&source, &Options::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Modifier);
        match err {
            CompileError::Modifier { line, row, .. } => assert_eq!((line, row), (2, 1)),
            other => panic!("expected modifier error, got {other:?}"),
        }
    }

    #[test]
    fn test_expanding_twice_is_a_compiler_error() {
        let mut template = parse("![[expand=2]]a");
        template.expand_rows().unwrap();
        let err = template.expand_rows().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Compiler);
    }
}
