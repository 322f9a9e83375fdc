//! Error types for the csv++ engine.

use thiserror::Error;

/// Broad category of a compile failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Tokenizer or grammar rejected the input.
    Syntax,
    /// Undefined variable/function or malformed formula reference.
    Formula,
    /// Invalid or out-of-scope modifier value.
    Modifier,
    /// Internal phase-ordering invariant violated.
    Compiler,
}

/// Errors raised while tokenizing, parsing or resolving references.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Syntax error: {message} (at `{input}`)")]
    Syntax {
        message: String,
        /// The unconsumed input starting at the failure.
        input: String,
        /// Byte offset of the failure within the parsed text.
        offset: usize,
    },

    #[error("Undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("Undefined variables: {}", .0.join(", "))]
    UndefinedVariables(Vec<String>),

    #[error("Undefined function: {0}")]
    UndefinedFunction(String),

    #[error("Function {id} expects {expected} argument(s) but was called with {given}")]
    ArgumentCount {
        id: String,
        expected: usize,
        given: usize,
    },

    #[error("Invalid argument to {id}: {message}")]
    InvalidArgument { id: String, message: String },

    #[error("Invalid cell reference: {0}")]
    InvalidCellReference(String),

    #[error("Cyclic variable dependency: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    #[error("Variable {id} is only in scope for rows {range}, but was referenced from row {row}")]
    OutOfScope {
        id: String,
        range: String,
        row: usize,
    },

    #[error("Reference resolution did not converge: {}", .0.join(", "))]
    DidNotConverge(Vec<String>),
}

impl EngineError {
    pub(crate) fn syntax(message: impl Into<String>, input: &str, offset: usize) -> Self {
        EngineError::Syntax {
            message: message.into(),
            input: input.get(offset..).unwrap_or_default().to_string(),
            offset,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Syntax { .. } => ErrorKind::Syntax,
            EngineError::OutOfScope { .. } => ErrorKind::Modifier,
            EngineError::UndefinedVariable(_)
            | EngineError::UndefinedVariables(_)
            | EngineError::UndefinedFunction(_)
            | EngineError::ArgumentCount { .. }
            | EngineError::InvalidArgument { .. }
            | EngineError::InvalidCellReference(_)
            | EngineError::CyclicDependency(_)
            | EngineError::DidNotConverge(_) => ErrorKind::Formula,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
