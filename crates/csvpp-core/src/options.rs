//! Compilation options supplied by the command line or a config file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{CompileError, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Options {
    /// Injected as string variables, replacing code-section definitions of
    /// the same name.
    pub key_values: BTreeMap<String, String>,
    /// Leading (rows, columns) left empty before the template's first cell.
    pub offset: (usize, usize),
    pub backup: bool,
    pub verbose: bool,
    pub create_if_not_exists: bool,
    pub output: Option<PathBuf>,
}

impl Options {
    pub fn row_offset(&self) -> usize {
        self.offset.0
    }

    pub fn column_offset(&self) -> usize {
        self.offset.1
    }
}

/// Parse `a=1,b=2` into a map. Keys are trimmed and must be non-empty;
/// values are taken verbatim after the first `=`.
pub fn parse_key_values(input: &str) -> Result<BTreeMap<String, String>> {
    let mut key_values = BTreeMap::new();
    for pair in input.split(',').filter(|p| !p.trim().is_empty()) {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(CompileError::Options(format!(
                "expected key=value, got `{}`",
                pair.trim()
            )));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(CompileError::Options(format!("missing key in `{}`", pair.trim())));
        }
        key_values.insert(key.to_string(), value.to_string());
    }
    Ok(key_values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_values() {
        let kv = parse_key_values("a=1, b = two,c=x=y").unwrap();
        assert_eq!(kv.get("a").map(String::as_str), Some("1"));
        assert_eq!(kv.get("b").map(String::as_str), Some(" two"));
        assert_eq!(kv.get("c").map(String::as_str), Some("x=y"));
    }

    #[test]
    fn test_parse_key_values_empty() {
        assert!(parse_key_values("").unwrap().is_empty());
        assert!(parse_key_values(" , ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_key_values_errors() {
        assert!(matches!(parse_key_values("a"), Err(CompileError::Options(_))));
        assert!(matches!(parse_key_values("=1"), Err(CompileError::Options(_))));
    }
}
