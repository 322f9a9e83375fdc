//! Regex-driven tokenizer.
//!
//! Each grammar owns an ordered list of `(pattern, kind)` rules. At every
//! position whitespace is skipped, then the first rule whose pattern matches
//! wins. Rules with no kind (comments) are consumed and dropped. Input no
//! rule matches is a syntax error naming the offending text.

use regex::Regex;
use std::sync::OnceLock;

use super::error::{EngineError, Result};
use super::token::{Token, TokenKind};

/// Which grammar the token stream is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Grammar {
    CodeSection,
    CellFormula,
}

type Rule = (Option<TokenKind>, &'static str);

// Only references that cannot be a plain identifier: sheet-qualified,
// ranges, or carrying a `$` marker. Each axis is `$?COL($?ROW)?` or `$?ROW`.
const CELL_REF: &str = concat!(
    r"(?:'(?:[^']|'')+'|[A-Za-z0-9_]+)!(?:\$?[A-Za-z]+(?:\$?[0-9]+)?|\$?[0-9]+)(?::(?:\$?[A-Za-z]+(?:\$?[0-9]+)?|\$?[0-9]+))?",
    r"|(?:\$?[A-Za-z]+(?:\$?[0-9]+)?|\$?[0-9]+):(?:\$?[A-Za-z]+(?:\$?[0-9]+)?|\$?[0-9]+)",
    r"|\$[A-Za-z]+\$?[0-9]+|[A-Za-z]+\$[0-9]+",
);

const CODE_SECTION_RULES: &[Rule] = &[
    (None, r"#[^\n]*"),
    (Some(TokenKind::Date), r"[0-9]{4}-[0-9]{2}-[0-9]{2}\b"),
    (Some(TokenKind::CellRef), CELL_REF),
    (Some(TokenKind::Number), r"[0-9]+(?:\.[0-9]+)?|\.[0-9]+"),
    (Some(TokenKind::String), r#""(?:[^"]|"")*""#),
    (Some(TokenKind::Boolean), r"(?i:true|false)\b"),
    (Some(TokenKind::Def), r"def\b"),
    (Some(TokenKind::Assign), r":="),
    (Some(TokenKind::Variable), r"\$\$[A-Za-z_][A-Za-z0-9_]*"),
    (Some(TokenKind::Identifier), r"[A-Za-z_][A-Za-z0-9_.]*"),
    (Some(TokenKind::LParen), r"\("),
    (Some(TokenKind::RParen), r"\)"),
    (Some(TokenKind::Comma), r","),
    (Some(TokenKind::Operator), r"<=|>=|<>|[-+*/&^=<>]"),
];

const CELL_FORMULA_RULES: &[Rule] = &[
    (Some(TokenKind::CellRef), CELL_REF),
    (Some(TokenKind::Number), r"[0-9]+(?:\.[0-9]+)?|\.[0-9]+"),
    (Some(TokenKind::String), r#""(?:[^"]|"")*""#),
    (Some(TokenKind::Boolean), r"(?i:true|false)\b"),
    (Some(TokenKind::Variable), r"\$\$[A-Za-z_][A-Za-z0-9_]*"),
    (Some(TokenKind::Identifier), r"[A-Za-z_][A-Za-z0-9_.]*"),
    (Some(TokenKind::LParen), r"\("),
    (Some(TokenKind::RParen), r"\)"),
    (Some(TokenKind::Comma), r","),
    (Some(TokenKind::Operator), r"<=|>=|<>|[-+*/&^=<>]"),
];

fn compile_rules(rules: &[Rule]) -> Vec<(Option<TokenKind>, Regex)> {
    rules
        .iter()
        .map(|(kind, pattern)| {
            let re = Regex::new(&format!("^(?:{})", pattern))
                .expect("tokenizer rule regex must compile");
            (*kind, re)
        })
        .collect()
}

fn rules_for(grammar: Grammar) -> &'static [(Option<TokenKind>, Regex)] {
    static CODE: OnceLock<Vec<(Option<TokenKind>, Regex)>> = OnceLock::new();
    static FORMULA: OnceLock<Vec<(Option<TokenKind>, Regex)>> = OnceLock::new();
    match grammar {
        Grammar::CodeSection => CODE.get_or_init(|| compile_rules(CODE_SECTION_RULES)),
        Grammar::CellFormula => FORMULA.get_or_init(|| compile_rules(CELL_FORMULA_RULES)),
    }
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s+").expect("whitespace regex must compile"))
}

/// Tokenize `input` for `grammar`. The stream always ends with an `Eof` token.
pub fn tokenize(input: &str, grammar: Grammar) -> Result<Vec<Token>> {
    let rules = rules_for(grammar);
    let mut tokens = Vec::new();
    let mut pos = 0usize;

    'scan: while pos < input.len() {
        let rest = &input[pos..];
        if let Some(m) = whitespace_re().find(rest) {
            pos += m.end();
            continue;
        }

        for (kind, re) in rules {
            if let Some(m) = re.find(rest) {
                if m.end() == 0 {
                    continue;
                }
                if let Some(kind) = kind {
                    tokens.push(Token::new(*kind, m.as_str(), pos));
                }
                pos += m.end();
                continue 'scan;
            }
        }

        return Err(EngineError::syntax(
            format!("unrecognized input `{}`", rest.chars().next().unwrap_or_default()),
            input,
            pos,
        ));
    }

    tokens.push(Token::new(TokenKind::Eof, "", input.len()));
    Ok(tokens)
}

/// 1-based line number of a byte offset within `input`.
pub fn line_of(input: &str, offset: usize) -> usize {
    let end = offset.min(input.len());
    input.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
}
