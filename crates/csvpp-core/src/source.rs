//! Splitting a source file into its code section and spreadsheet section.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// The line separating the code section from the spreadsheet section.
pub const CODE_SECTION_SEPARATOR: &str = "---";

/// A csv++ source file split into its two sections.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceCode {
    pub filename: PathBuf,
    /// Text before the separator, or None if the file has no separator.
    pub code_section: Option<String>,
    pub csv_section: String,
    /// 1-based line number of the first line of `csv_section`.
    pub csv_start_line: usize,
}

impl SourceCode {
    pub fn new(filename: impl Into<PathBuf>, input: &str) -> Self {
        let filename = filename.into();
        let mut offset = 0usize;
        for (line_index, line) in input.split_inclusive('\n').enumerate() {
            if line.trim_end_matches(['\n', '\r']) == CODE_SECTION_SEPARATOR {
                return SourceCode {
                    filename,
                    code_section: Some(input[..offset].to_string()),
                    csv_section: input[offset + line.len()..].to_string(),
                    csv_start_line: line_index + 2,
                };
            }
            offset += line.len();
        }

        SourceCode {
            filename,
            code_section: None,
            csv_section: input.to_string(),
            csv_start_line: 1,
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let input = std::fs::read_to_string(path)?;
        Ok(SourceCode::new(path, &input))
    }

    /// The 1-based source line of a 0-based line within the CSV section.
    pub fn csv_line(&self, index: usize) -> usize {
        self.csv_start_line + index
    }
}
