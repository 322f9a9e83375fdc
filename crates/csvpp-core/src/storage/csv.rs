//! CSV import/export functionality

use chrono::{DateTime, Local};
use log::info;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{CompileError, Result};
use crate::options::Options;
use crate::template::{Phase, Template};

/// Split CSV text into records, each paired with the 0-based line it starts
/// on. A newline inside a quoted field belongs to the field. As in
/// [`parse_csv_line`], a quote only opens a field at its start.
pub fn split_csv_records(text: &str) -> Vec<(usize, String)> {
    let mut records = Vec::new();
    let mut current = String::new();
    let mut line = 0usize;
    let mut start_line = 0usize;
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '\n' {
                line += 1;
            } else if c == '"' {
                if chars.peek() == Some(&'"') {
                    current.push(c);
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            current.push(c);
            continue;
        }

        match c {
            '\n' => {
                if current.ends_with('\r') {
                    current.pop();
                }
                records.push((start_line, std::mem::take(&mut current)));
                line += 1;
                start_line = line;
                at_field_start = true;
                continue;
            }
            '"' if at_field_start => {
                in_quotes = true;
                at_field_start = false;
            }
            ',' => at_field_start = true,
            c if c.is_whitespace() => {}
            _ => at_field_start = false,
        }
        current.push(c);
    }

    if !current.is_empty() {
        if current.ends_with('\r') {
            current.pop();
        }
        records.push((start_line, current));
    }
    records
}

/// Parse a single CSV line, handling quoted fields
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut field_was_quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                // Check for escaped quote
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else {
            match c {
                '"' if current.trim().is_empty() => {
                    in_quotes = true;
                    field_was_quoted = true;
                    current.clear();
                }
                ',' => {
                    fields.push(finish_field(&current, field_was_quoted));
                    current = String::new();
                    field_was_quoted = false;
                }
                _ => current.push(c),
            }
        }
    }
    fields.push(finish_field(&current, field_was_quoted));
    fields
}

fn finish_field(field: &str, quoted: bool) -> String {
    if quoted {
        field.to_string()
    } else {
        field.trim().to_string()
    }
}

/// Escape a field for CSV output. Formulas are written as-is.
fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Write a compiled template as CSV, leaving `options.offset` rows and
/// columns empty before it.
pub fn write_csv<W: Write>(out: &mut W, template: &Template, options: &Options) -> Result<()> {
    if template.phase() != Phase::Resolved {
        return Err(CompileError::Compiler(format!(
            "cannot write a template that is still {:?}",
            template.phase()
        )));
    }

    for _ in 0..options.row_offset() {
        writeln!(out)?;
    }

    let padding = ",".repeat(options.column_offset());
    for row in template.rows() {
        let fields: Vec<String> = row
            .cells
            .iter()
            .map(|cell| escape_csv_field(&cell.evaluate()))
            .collect();
        writeln!(out, "{}{}", padding, fields.join(","))?;
    }
    Ok(())
}

/// Render a compiled template to a CSV string.
pub fn render_csv(template: &Template, options: &Options) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, template, options)?;
    String::from_utf8(buffer).map_err(|e| CompileError::Compiler(e.to_string()))
}

/// Write a compiled template to `path`.
///
/// With `options.backup` an existing file is first copied aside (see
/// [`backup_path`]). With `options.create_if_not_exists` missing parent
/// directories are created; otherwise they are an error.
pub fn write_csv_file(path: &Path, template: &Template, options: &Options) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            if !options.create_if_not_exists {
                return Err(CompileError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("directory {} does not exist", parent.display()),
                )));
            }
            std::fs::create_dir_all(parent)?;
        }
    }

    if options.backup && path.exists() {
        let backup = backup_path(path, Local::now());
        std::fs::copy(path, &backup)?;
        info!("backed up {} to {}", path.display(), backup.display());
    }

    let content = render_csv(template, options)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// `dir/name.csv` becomes `dir/name-YYYYMMDDHHMMSS.csv`.
pub fn backup_path(path: &Path, now: DateTime<Local>) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stamped = format!("{}-{}", stem, now.format("%Y%m%d%H%M%S"));
    let mut backup = path.with_file_name(stamped);
    if let Some(ext) = path.extension() {
        backup.set_extension(ext);
    }
    backup
}
