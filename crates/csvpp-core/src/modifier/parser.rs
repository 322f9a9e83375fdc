//! Modifier grammar.
//!
//! ```text
//! cell      --> ("![[" pairs "]]")? ("[[" pairs "]]")? text
//! pairs     --> pair ("/" pair)*
//! pair      --> KEY ("=" value)?
//! value     --> "'" (any but "'" | "''")* "'" | (any but "/" or "]]")*
//! ```

use super::{Modifier, ModifierError};

/// One cell's text split into its modifiers and its value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedCell {
    /// Present if the cell opened with `![[...]]`.
    pub row_modifier: Option<Modifier>,
    /// The cell's own settings layered over the row defaults.
    pub modifier: Modifier,
    pub value: String,
}

/// Parse a cell's leading modifiers. `row_defaults` are the defaults the
/// row's modifier (if any) hands to its cells; a row modifier found here
/// replaces them.
pub fn parse_cell(input: &str, row_defaults: &Modifier, first_cell: bool) -> Result<ParsedCell, ModifierError> {
    let mut rest = input.trim_start();
    let mut row_modifier = None;

    if let Some(body) = rest.strip_prefix("![[") {
        if !first_cell {
            return Err(ModifierError::RowModifierNotFirst);
        }
        let mut modifier = Modifier::default();
        rest = parse_pairs(body, &mut modifier, true)?.trim_start();
        row_modifier = Some(modifier);
    }

    let mut modifier = match &row_modifier {
        Some(row) => row.cell_defaults(),
        None => row_defaults.clone(),
    };
    if let Some(body) = rest.strip_prefix("[[") {
        rest = parse_pairs(body, &mut modifier, false)?;
    }

    Ok(ParsedCell {
        row_modifier,
        modifier,
        value: rest.to_string(),
    })
}

/// Apply pairs up to the closing `]]`, returning the text after it.
fn parse_pairs<'a>(input: &'a str, modifier: &mut Modifier, row: bool) -> Result<&'a str, ModifierError> {
    let mut rest = input;
    loop {
        rest = rest.trim_start();
        let key_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if key_len == 0 {
            return Err(if rest.is_empty() {
                ModifierError::Unterminated
            } else {
                ModifierError::Syntax(format!("expected a modifier name at `{}`", rest))
            });
        }
        let key = &rest[..key_len];
        rest = rest[key_len..].trim_start();

        let value = match rest.strip_prefix('=') {
            Some(after) => {
                let (value, after) = parse_value(after.trim_start())?;
                rest = after;
                Some(value)
            }
            None => None,
        };
        modifier.set(key, value.as_deref(), row)?;

        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix("]]") {
            return Ok(after);
        }
        match rest.strip_prefix('/') {
            Some(after) => rest = after,
            None if rest.is_empty() => return Err(ModifierError::Unterminated),
            None => {
                return Err(ModifierError::Syntax(format!(
                    "expected `/` or `]]` at `{}`",
                    rest
                )));
            }
        }
    }
}

fn parse_value(input: &str) -> Result<(String, &str), ModifierError> {
    if let Some(quoted) = input.strip_prefix('\'') {
        let mut value = String::new();
        let mut chars = quoted.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c != '\'' {
                value.push(c);
                continue;
            }
            if matches!(chars.peek(), Some((_, '\''))) {
                value.push('\'');
                chars.next();
                continue;
            }
            return Ok((value, &quoted[i + 1..]));
        }
        return Err(ModifierError::Unterminated);
    }

    let end = [input.find('/'), input.find("]]")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(input.len());
    Ok((input[..end].trim_end().to_string(), &input[end..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::{Expand, HorizontalAlign, TextFormat};

    fn parse(input: &str) -> Result<ParsedCell, ModifierError> {
        parse_cell(input, &Modifier::default(), true)
    }

    #[test]
    fn test_plain_cell() {
        let cell = parse("=SUM(A1:A3)").unwrap();
        assert_eq!(cell.row_modifier, None);
        assert!(cell.modifier.is_empty());
        assert_eq!(cell.value, "=SUM(A1:A3)");
    }

    #[test]
    fn test_cell_modifier() {
        let cell = parse("[[format=bold/halign=center/var=total]]=A1*2").unwrap();
        assert!(cell.modifier.formats.contains(&TextFormat::Bold));
        assert_eq!(cell.modifier.horizontal_align, Some(HorizontalAlign::Center));
        assert_eq!(cell.modifier.var.as_deref(), Some("total"));
        assert_eq!(cell.value, "=A1*2");
    }

    #[test]
    fn test_row_and_cell_modifiers() {
        let cell = parse("![[expand=3/format=italic]][[format=bold]]price").unwrap();
        let row = cell.row_modifier.unwrap();
        assert_eq!(row.expand, Some(Expand::new(Some(3))));
        assert!(cell.modifier.formats.contains(&TextFormat::Italic));
        assert!(cell.modifier.formats.contains(&TextFormat::Bold));
        assert_eq!(cell.modifier.expand, None);
        assert_eq!(cell.value, "price");
    }

    #[test]
    fn test_flags_without_values() {
        let cell = parse("![[expand/freeze]]x").unwrap();
        let row = cell.row_modifier.unwrap();
        assert!(row.freeze);
        assert!(row.expand.is_some_and(|e| e.is_unbounded()));
    }

    #[test]
    fn test_quoted_values() {
        let cell = parse("[[note='a/b ]] and ''quoted''']]text").unwrap();
        assert_eq!(cell.modifier.note.as_deref(), Some("a/b ]] and 'quoted'"));
        assert_eq!(cell.value, "text");
    }

    #[test]
    fn test_row_defaults_are_inherited() {
        let mut defaults = Modifier::default();
        defaults.set("color", Some("#fff"), false).unwrap();
        let cell = parse_cell("[[fc=#000]]x", &defaults, false).unwrap();
        assert!(cell.modifier.color.is_some());
        assert!(cell.modifier.font_color.is_some());
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse("[[format=bold"), Err(ModifierError::Unterminated));
        assert_eq!(parse("[[note='open]]"), Err(ModifierError::Unterminated));
        assert!(matches!(parse("[[=3]]"), Err(ModifierError::Syntax(_))));
        assert!(matches!(parse("[[format=bold;halign=left]]"), Err(ModifierError::InvalidValue { .. })));
        assert_eq!(
            parse_cell("![[freeze]]x", &Modifier::default(), false),
            Err(ModifierError::RowModifierNotFirst)
        );
        assert_eq!(parse("[[expand=2]]x"), Err(ModifierError::RowOnly("expand".into())));
    }
}
