//! Token definitions shared by the code-section and cell-formula grammars.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Number,
    /// A double-quoted string, quotes included in the text.
    String,
    Boolean,
    /// `YYYY-MM-DD`, code section only.
    Date,
    /// A reference that can only be a cell: has a sheet name, a `:` range
    /// or a `$` marker.
    CellRef,
    /// `$$name`
    Variable,
    Identifier,
    /// `def`, code section only.
    Def,
    /// `:=`, code section only.
    Assign,
    Operator,
    LParen,
    RParen,
    Comma,
    Eof,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset of the token in the tokenized input.
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: &str, offset: usize) -> Self {
        Token {
            kind,
            text: text.to_string(),
            offset,
        }
    }

    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end of input"),
            _ => write!(f, "`{}`", self.text),
        }
    }
}
