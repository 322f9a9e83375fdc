//! A1 reference parsing and formatting.
//!
//! Provides bidirectional conversion between spreadsheet-style references
//! (e.g. `A1`, `A1:D10`, `Sheet1!B2`, `'Quoted Sheet'!B2:C3`, `A`, `$A$1`) and
//! zero-indexed column/row coordinates. `$` markers are kept so that a
//! reference formats back the way it was written.
//!
//! Columns use bijective base-26: `A` = 0, `Z` = 25, `AA` = 26. There is no
//! letter for "zero", which is what spreadsheets do and not plain base-26.
//!
//! # Examples
//!
//! ```ignore
//! let cell = CellRef::from_str("B3").unwrap();
//! assert_eq!(cell.col, Some(1));  // 0-indexed
//! assert_eq!(cell.row, Some(2));
//! assert_eq!(cell.to_string(), "B3");
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use super::error::EngineError;

/// A reference to a cell, a whole column/row, or a range (0-indexed).
#[derive(Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CellRef {
    pub sheet_name: Option<String>,
    pub col: Option<usize>,
    pub row: Option<usize>,
    pub upper_col: Option<usize>,
    pub upper_row: Option<usize>,
    #[serde(default)]
    pub absolute: Absolute,
}

/// Which axes carry a `$` marker.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Absolute {
    pub col: bool,
    pub row: bool,
    pub upper_col: bool,
    pub upper_row: bool,
}

fn a1_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:(?<sheet>'(?:[^']|'')+'|[A-Za-z0-9_.]+)!)?(?:(?<lca>\$)?(?<lc>[A-Za-z]+))?(?:(?<lra>\$)?(?<lr>[0-9]+))?(?::(?:(?<uca>\$)?(?<uc>[A-Za-z]+))?(?:(?<ura>\$)?(?<ur>[0-9]+))?)?$",
        )
        .expect("A1 reference regex must compile")
    })
}

impl CellRef {
    pub fn new(col: usize, row: usize) -> CellRef {
        CellRef {
            col: Some(col),
            row: Some(row),
            ..CellRef::default()
        }
    }

    /// A whole-row reference such as `5`.
    pub fn row_only(row: usize) -> CellRef {
        CellRef {
            row: Some(row),
            ..CellRef::default()
        }
    }

    /// A whole-column reference such as `C`.
    pub fn col_only(col: usize) -> CellRef {
        CellRef {
            col: Some(col),
            ..CellRef::default()
        }
    }

    /// Parse a reference from A1 notation. Returns None if the input is invalid.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(name: &str) -> Option<CellRef> {
        Self::parse_a1(name)
    }

    fn parse_a1(name: &str) -> Option<CellRef> {
        let caps = a1_re().captures(name.trim())?;

        let sheet_name = caps.name("sheet").map(|m| unquote_sheet_name(m.as_str()));
        let col = caps.name("lc").map(|m| Self::letters_to_col(m.as_str()));
        let row = caps.name("lr").map(|m| parse_row(m.as_str()));
        if col.is_none() && row.is_none() {
            return None;
        }

        let has_upper = name.contains(':');
        let upper_col = caps.name("uc").map(|m| Self::letters_to_col(m.as_str()));
        let upper_row = caps.name("ur").map(|m| parse_row(m.as_str()));
        if has_upper && upper_col.is_none() && upper_row.is_none() {
            return None;
        }

        Some(CellRef {
            sheet_name,
            col: transpose(col)?,
            row: transpose(row)?,
            upper_col: transpose(upper_col)?,
            upper_row: transpose(upper_row)?,
            absolute: Absolute {
                col: caps.name("lca").is_some(),
                row: caps.name("lra").is_some(),
                upper_col: caps.name("uca").is_some(),
                upper_row: caps.name("ura").is_some(),
            },
        })
    }

    /// Convert column index to spreadsheet-style letters (0 -> A, 25 -> Z, 26 -> AA).
    pub fn col_to_letters(col: usize) -> String {
        let mut result = String::new();
        let mut n = col as u128 + 1;
        while n > 0 {
            n -= 1;
            result.insert(0, (b'A' + (n % 26) as u8) as char);
            n /= 26;
        }
        result
    }

    /// Convert spreadsheet-style letters to a column index (A -> 0, AA -> 26).
    /// Returns None for empty input, non-letters, or overflow.
    pub fn letters_to_col(letters: &str) -> Option<usize> {
        if letters.is_empty() {
            return None;
        }
        let mut col_acc = 0usize;
        for c in letters.to_ascii_uppercase().bytes() {
            if !c.is_ascii_uppercase() {
                return None;
            }
            let digit = (c - b'A') as usize + 1;
            col_acc = col_acc.checked_mul(26)?.checked_add(digit)?;
        }
        col_acc.checked_sub(1)
    }

    /// True for a single cell (both axes known, no upper bound).
    pub fn is_cell(&self) -> bool {
        self.col.is_some() && self.row.is_some() && !self.is_range()
    }

    pub fn is_range(&self) -> bool {
        self.upper_col.is_some() || self.upper_row.is_some()
    }

    /// The same reference moved to `row`, keeping column and sheet.
    pub fn with_row(&self, row: usize) -> CellRef {
        CellRef {
            row: Some(row),
            ..self.clone()
        }
    }
}

fn parse_row(digits: &str) -> Option<usize> {
    digits.parse::<usize>().ok()?.checked_sub(1)
}

// Distinguishes "axis absent" (Ok(None)) from "axis present but invalid".
fn transpose(axis: Option<Option<usize>>) -> Option<Option<usize>> {
    match axis {
        None => Some(None),
        Some(Some(v)) => Some(Some(v)),
        Some(None) => None,
    }
}

fn unquote_sheet_name(raw: &str) -> String {
    match raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => raw.to_string(),
    }
}

fn format_sheet_name(name: &str) -> String {
    if name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

fn write_axis(
    f: &mut fmt::Formatter<'_>,
    col: Option<usize>,
    row: Option<usize>,
    (col_absolute, row_absolute): (bool, bool),
) -> fmt::Result {
    let marker = |absolute: bool| if absolute { "$" } else { "" };
    if let Some(col) = col {
        write!(f, "{}{}", marker(col_absolute), CellRef::col_to_letters(col))?;
    }
    if let Some(row) = row {
        write!(f, "{}{}", marker(row_absolute), row + 1)?;
    }
    Ok(())
}

impl std::str::FromStr for CellRef {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_a1(s).ok_or_else(|| EngineError::InvalidCellReference(s.to_string()))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet_name {
            write!(f, "{}!", format_sheet_name(sheet))?;
        }
        let absolute = self.absolute;
        write_axis(f, self.col, self.row, (absolute.col, absolute.row))?;
        if self.is_range() {
            write!(f, ":")?;
            write_axis(
                f,
                self.upper_col,
                self.upper_row,
                (absolute.upper_col, absolute.upper_row),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Absolute, CellRef};
    use proptest::prelude::*;

    #[test]
    fn test_parse_single_letter_columns() {
        let a1 = CellRef::from_str("A1").unwrap();
        assert_eq!(a1, CellRef::new(0, 0));

        let z1 = CellRef::from_str("Z1").unwrap();
        assert_eq!(z1.col, Some(25));
    }

    #[test]
    fn test_parse_multi_letter_columns() {
        assert_eq!(CellRef::from_str("AA1").unwrap().col, Some(26));
        assert_eq!(CellRef::from_str("AZ1").unwrap().col, Some(51));
        assert_eq!(CellRef::from_str("BA1").unwrap().col, Some(52));
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(CellRef::from_str("aA10").unwrap(), CellRef::new(26, 9));
    }

    #[test]
    fn test_parse_range() {
        let r = CellRef::from_str("A1:D10").unwrap();
        assert_eq!(r.col, Some(0));
        assert_eq!(r.row, Some(0));
        assert_eq!(r.upper_col, Some(3));
        assert_eq!(r.upper_row, Some(9));
        assert!(r.is_range());
        assert_eq!(r.to_string(), "A1:D10");
    }

    #[test]
    fn test_parse_whole_column() {
        let c = CellRef::from_str("C").unwrap();
        assert_eq!(c, CellRef::col_only(2));
        assert_eq!(c.to_string(), "C");
        assert_eq!(CellRef::from_str("A:B").unwrap().to_string(), "A:B");
    }

    #[test]
    fn test_parse_sheet_names() {
        let r = CellRef::from_str("Sheet1!B2").unwrap();
        assert_eq!(r.sheet_name.as_deref(), Some("Sheet1"));
        assert_eq!(r.col, Some(1));
        assert_eq!(r.row, Some(1));

        let q = CellRef::from_str("'Quoted Sheet'!B2:C3").unwrap();
        assert_eq!(q.sheet_name.as_deref(), Some("Quoted Sheet"));
        assert_eq!(q.to_string(), "'Quoted Sheet'!B2:C3");

        let escaped = CellRef::from_str("'Bob''s'!A1").unwrap();
        assert_eq!(escaped.sheet_name.as_deref(), Some("Bob's"));
        assert_eq!(escaped.to_string(), "'Bob''s'!A1");
    }

    #[test]
    fn test_parse_absolute_markers() {
        let fixed = CellRef::from_str("$A$1").unwrap();
        assert_eq!((fixed.col, fixed.row), (Some(0), Some(0)));
        assert!(fixed.absolute.col && fixed.absolute.row);
        assert_eq!(fixed.to_string(), "$A$1");

        let mixed = CellRef::from_str("$b2").unwrap();
        assert_eq!(
            mixed.absolute,
            Absolute { col: true, ..Absolute::default() }
        );
        assert_eq!(mixed.to_string(), "$B2");

        let range = CellRef::from_str("A$1:$A$3").unwrap();
        assert_eq!(range.upper_row, Some(2));
        assert_eq!(range.to_string(), "A$1:$A$3");
        assert_eq!(CellRef::from_str("Sheet1!$C:$C").unwrap().to_string(), "Sheet1!$C:$C");

        assert_eq!(CellRef::from_str("$A$1").unwrap().with_row(4).to_string(), "$A$5");
    }

    #[test]
    fn test_parse_invalid_inputs() {
        assert!(CellRef::from_str("").is_none());
        assert!(CellRef::from_str("A0").is_none());
        assert!(CellRef::from_str("1A").is_none());
        assert!(CellRef::from_str("A 1").is_none());
        assert!(CellRef::from_str("A1:").is_none());
        assert!(CellRef::from_str("Sheet1!").is_none());
        assert!(CellRef::from_str("$").is_none());
        assert!(CellRef::from_str("$$A1").is_none());
        assert!(CellRef::from_str("A1$").is_none());
    }

    #[test]
    fn test_parse_a1_overflow_returns_none() {
        let huge = format!("{}1", "Z".repeat(40));
        assert!(CellRef::from_str(&huge).is_none());
    }

    #[test]
    fn test_col_to_letters_bijective() {
        assert_eq!(CellRef::col_to_letters(0), "A");
        assert_eq!(CellRef::col_to_letters(25), "Z");
        assert_eq!(CellRef::col_to_letters(26), "AA");
        assert_eq!(CellRef::col_to_letters(701), "ZZ");
        assert_eq!(CellRef::col_to_letters(702), "AAA");
        assert_eq!(CellRef::letters_to_col("ZZ"), Some(701));
        assert_eq!(CellRef::letters_to_col(""), None);
    }

    #[test]
    fn test_row_only_renders_row_axis() {
        assert_eq!(CellRef::row_only(4).to_string(), "5");
        assert_eq!(CellRef::new(2, 4).with_row(0).to_string(), "C1");
    }

    proptest! {
        #[test]
        fn prop_format_then_parse_round_trips(col in 0usize..20_000, row in 0usize..1_000_000) {
            let cell = CellRef::new(col, row);
            let parsed = CellRef::from_str(&cell.to_string()).unwrap();
            prop_assert_eq!(parsed, cell);
        }

        #[test]
        fn prop_parse_then_format_normalizes(
            col_marker in "\\$?",
            letters in "[a-zA-Z]{1,3}",
            row_marker in "\\$?",
            row in 1usize..100_000,
        ) {
            let text = format!("{}{}{}{}", col_marker, letters, row_marker, row);
            let parsed = CellRef::from_str(&text).unwrap();
            prop_assert_eq!(parsed.absolute.col, !col_marker.is_empty());
            prop_assert_eq!(parsed.absolute.row, !row_marker.is_empty());
            prop_assert_eq!(parsed.to_string(), text.to_ascii_uppercase());
        }

        #[test]
        fn prop_absolute_ranges_round_trip(
            col in 0usize..5_000,
            row in 0usize..100_000,
            flags in proptest::array::uniform4(any::<bool>()),
        ) {
            let range = CellRef {
                upper_col: Some(col + 1),
                upper_row: Some(row + 1),
                absolute: Absolute {
                    col: flags[0],
                    row: flags[1],
                    upper_col: flags[2],
                    upper_row: flags[3],
                },
                ..CellRef::new(col, row)
            };
            let parsed = CellRef::from_str(&range.to_string()).unwrap();
            prop_assert_eq!(parsed, range);
        }
    }
}
